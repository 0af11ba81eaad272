//! Application layer: use cases orchestrating domain rules and persistence ports.

pub mod error;
pub mod identity;
pub mod listing;
pub mod media;
pub mod pagination;
pub mod posts;
pub mod repos;
