//! Aggregate view cache.
//!
//! Memoizes the two views computed from the full post set, the distinct
//! category list and the ranked popular-tag list, and drops them whenever a
//! post is created or liked.
//!
//! - [`AggregateStore`] holds the memoized entries behind a mutex and tracks a
//!   generation number that moves on every invalidation.
//! - [`AggregateViews`] computes on miss and fills the store.
//! - [`CacheTrigger`] is what write paths call after committing.
//!
//! ```toml
//! [cache]
//! enabled = true
//! popular_tags_capacity = 128
//! ```

mod config;
mod events;
mod lock;
mod store;
mod trigger;
mod views;

pub use config::CacheConfig;
pub use events::EventKind;
pub use store::{AggregateStore, Generation, Lookup};
pub use trigger::CacheTrigger;
pub use views::AggregateViews;

pub(crate) const METRIC_CACHE_HIT: &str = "postline_aggregate_cache_hit_total";
pub(crate) const METRIC_CACHE_MISS: &str = "postline_aggregate_cache_miss_total";
pub(crate) const METRIC_CACHE_INVALIDATIONS: &str = "postline_aggregate_cache_invalidations_total";
pub(crate) const METRIC_CACHE_STALE_DISCARD: &str = "postline_aggregate_cache_stale_discard_total";
