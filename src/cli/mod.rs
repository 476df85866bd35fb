//! CLI module
//!
//! Command-line interface for running the tap.
//!
//! # Commands
//!
//! - `discover` - List available streams
//! - `read` - Extract records (and state) as JSON lines on stdout

mod commands;
mod runner;

pub use commands::{parse_stream_list, Cli, Commands, OutputFormat};
pub use runner::{JsonLinesSink, Runner};
