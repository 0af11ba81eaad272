//! API handlers grouped by resource.

mod aggregates;
mod health;
mod posts;

pub use aggregates::*;
pub use health::*;
pub use posts::*;

/// Decoded query string as ordered pairs. Deserializing into pairs never
/// fails on repeated or unexpected keys, so listing input is never rejected.
pub type QueryPairs = Vec<(String, String)>;

/// First value given for `key`.
pub fn first_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.as_str())
}
