//! Cache trigger service.
//!
//! Write paths call into this after their store commit and before they build
//! a response.

use std::sync::Arc;

use metrics::counter;
use tracing::debug;

use super::METRIC_CACHE_INVALIDATIONS;
use super::config::CacheConfig;
use super::events::EventKind;
use super::store::AggregateStore;

pub struct CacheTrigger {
    config: CacheConfig,
    store: Arc<AggregateStore>,
}

impl CacheTrigger {
    pub fn new(config: CacheConfig, store: Arc<AggregateStore>) -> Self {
        Self { config, store }
    }

    /// Clear every memoized aggregate. Safe to call on an empty cache.
    pub fn trigger(&self, kind: EventKind) {
        if !self.config.is_enabled() {
            debug!(
                event_kind = kind.label(),
                "Cache trigger skipped: cache disabled"
            );
            return;
        }

        let generation = self.store.clear();
        counter!(METRIC_CACHE_INVALIDATIONS, "event" => kind.label()).increment(1);
        debug!(
            event_kind = kind.label(),
            post_id = kind.post_id(),
            generation = generation.value(),
            "Aggregate cache invalidated"
        );
    }

    pub fn post_created(&self, post_id: i64) {
        self.trigger(EventKind::PostCreated { post_id });
    }

    pub fn post_liked(&self, post_id: i64) {
        self.trigger(EventKind::PostLiked { post_id });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Lookup;

    fn populated_store() -> Arc<AggregateStore> {
        let store = Arc::new(AggregateStore::new(&CacheConfig::default()));
        let generation = store.generation();
        store.fill_categories(generation, vec!["general".into()]);
        store.fill_popular_tags(generation, 50, vec![]);
        store
    }

    #[test]
    fn trigger_clears_all_entries() {
        let store = populated_store();
        let trigger = CacheTrigger::new(CacheConfig::default(), store.clone());

        trigger.post_created(1);

        assert!(store.is_empty());
        assert!(matches!(store.categories(), Lookup::Miss(_)));
    }

    #[test]
    fn repeated_triggers_are_harmless() {
        let store = populated_store();
        let trigger = CacheTrigger::new(CacheConfig::default(), store.clone());

        trigger.post_liked(1);
        trigger.post_liked(1);

        assert!(store.is_empty());
    }

    #[test]
    fn disabled_cache_skips_clear() {
        let store = populated_store();
        let config = CacheConfig {
            enabled: false,
            ..Default::default()
        };
        let trigger = CacheTrigger::new(config, store.clone());
        let before = store.generation();

        trigger.post_created(1);

        assert_eq!(store.generation(), before);
    }
}
