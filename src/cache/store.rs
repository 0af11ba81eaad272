//! Memoized aggregate entries.
//!
//! Every clear moves the generation forward. A fill carries the generation
//! observed at the miss that started the computation and is dropped when the
//! generation has moved since, so a computation that overlapped an
//! invalidation can never be served to later readers.

use std::sync::Mutex;

use lru::LruCache;
use metrics::counter;

use crate::domain::tags::TagCount;

use super::config::CacheConfig;
use super::lock::mutex_lock;
use super::{METRIC_CACHE_HIT, METRIC_CACHE_MISS, METRIC_CACHE_STALE_DISCARD};

const SOURCE: &str = "cache::store";
const VIEW_CATEGORIES: &str = "categories";
const VIEW_POPULAR_TAGS: &str = "popular_tags";

/// Cache epoch observed by a reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Generation(u64);

impl Generation {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Outcome of a cache read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Hit(T),
    /// Not memoized; fill with the carried generation once computed.
    Miss(Generation),
}

struct AggregateState {
    generation: u64,
    categories: Option<Vec<String>>,
    popular_tags: LruCache<u32, Vec<TagCount>>,
}

pub struct AggregateStore {
    state: Mutex<AggregateState>,
}

impl AggregateStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            state: Mutex::new(AggregateState {
                generation: 0,
                categories: None,
                popular_tags: LruCache::new(config.popular_tags_capacity_non_zero()),
            }),
        }
    }

    pub fn categories(&self) -> Lookup<Vec<String>> {
        let state = mutex_lock(&self.state, SOURCE, "categories");
        match state.categories.as_ref() {
            Some(categories) => {
                counter!(METRIC_CACHE_HIT, "view" => VIEW_CATEGORIES).increment(1);
                Lookup::Hit(categories.clone())
            }
            None => {
                counter!(METRIC_CACHE_MISS, "view" => VIEW_CATEGORIES).increment(1);
                Lookup::Miss(Generation(state.generation))
            }
        }
    }

    /// Memoize categories computed after a miss. Returns false when the fill was stale.
    pub fn fill_categories(&self, observed: Generation, categories: Vec<String>) -> bool {
        let mut state = mutex_lock(&self.state, SOURCE, "fill_categories");
        if state.generation != observed.0 {
            counter!(METRIC_CACHE_STALE_DISCARD, "view" => VIEW_CATEGORIES).increment(1);
            return false;
        }
        state.categories = Some(categories);
        true
    }

    pub fn popular_tags(&self, limit: u32) -> Lookup<Vec<TagCount>> {
        let mut state = mutex_lock(&self.state, SOURCE, "popular_tags");
        let generation = state.generation;
        match state.popular_tags.get(&limit) {
            Some(tags) => {
                counter!(METRIC_CACHE_HIT, "view" => VIEW_POPULAR_TAGS).increment(1);
                Lookup::Hit(tags.clone())
            }
            None => {
                counter!(METRIC_CACHE_MISS, "view" => VIEW_POPULAR_TAGS).increment(1);
                Lookup::Miss(Generation(generation))
            }
        }
    }

    /// Memoize popular tags computed after a miss. Returns false when the fill was stale.
    pub fn fill_popular_tags(&self, observed: Generation, limit: u32, tags: Vec<TagCount>) -> bool {
        let mut state = mutex_lock(&self.state, SOURCE, "fill_popular_tags");
        if state.generation != observed.0 {
            counter!(METRIC_CACHE_STALE_DISCARD, "view" => VIEW_POPULAR_TAGS).increment(1);
            return false;
        }
        state.popular_tags.put(limit, tags);
        true
    }

    /// Drop every memoized entry and start a new generation.
    pub fn clear(&self) -> Generation {
        let mut state = mutex_lock(&self.state, SOURCE, "clear");
        state.generation = state.generation.wrapping_add(1);
        state.categories = None;
        state.popular_tags.clear();
        Generation(state.generation)
    }

    pub fn generation(&self) -> Generation {
        Generation(mutex_lock(&self.state, SOURCE, "generation").generation)
    }

    /// Number of memoized entries across both views.
    pub fn len(&self) -> usize {
        let state = mutex_lock(&self.state, SOURCE, "len");
        usize::from(state.categories.is_some()) + state.popular_tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
