//! postline: a content listing engine for a social feed.
//!
//! Posts are queried through filtered, sorted, offset-paginated listings;
//! category and popular-tag aggregates are memoized and dropped whenever a
//! post is created or liked.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
