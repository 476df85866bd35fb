//! Response decoder module
//!
//! Pulumi Cloud answers with JSON only. The decoder parses a body and selects
//! record nodes with the resource's records path (`$.members[*]`, `$[*]`, ...).

mod decoders;
mod types;

pub use decoders::{lookup, JsonDecoder};
pub use types::RecordDecoder;
