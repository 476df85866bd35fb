//! Pagination module
//!
//! Supports: continuation token, bounded time cursor, single request
//!
//! # Overview
//!
//! A paginator contributes query parameters for each request and decides from
//! each successful response whether another page exists. Zero-record pages
//! are handled by the stream engine, which stops on them for every strategy.

mod strategies;
mod types;

pub use strategies::{build_paginator, BoundedCursorPaginator, NoPaginator, TokenPaginator};
pub use types::{NextPage, PageToken, PaginationState, Paginator};
