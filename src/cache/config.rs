//! Cache configuration.

use std::num::NonZeroUsize;

const DEFAULT_POPULAR_TAGS_CAPACITY: usize = 128;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// When false every aggregate request recomputes from the store.
    pub enabled: bool,
    /// Maximum number of distinct popular-tag limits memoized at once.
    pub popular_tags_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            popular_tags_capacity: DEFAULT_POPULAR_TAGS_CAPACITY,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            popular_tags_capacity: settings.popular_tags_capacity.get(),
        }
    }
}

impl CacheConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Popular-tag capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn popular_tags_capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.popular_tags_capacity).unwrap_or(NonZeroUsize::MIN)
    }
}
