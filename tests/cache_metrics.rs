use std::collections::HashSet;

use metrics_util::debugging::DebuggingRecorder;
use postline::cache::{AggregateStore, CacheConfig, CacheTrigger, Lookup};
use std::sync::Arc;

#[test]
fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let config = CacheConfig::default();
    let store = Arc::new(AggregateStore::new(&config));
    let trigger = CacheTrigger::new(config, store.clone());

    // miss, fill, hit
    let Lookup::Miss(generation) = store.categories() else {
        panic!("empty store should miss");
    };
    assert!(store.fill_categories(generation, vec!["general".into()]));
    assert!(matches!(store.categories(), Lookup::Hit(_)));

    // a fill that overlapped an invalidation
    let Lookup::Miss(observed) = store.popular_tags(10) else {
        panic!("empty store should miss");
    };
    trigger.post_created(1);
    assert!(!store.fill_popular_tags(observed, 10, Vec::new()));
    trigger.post_liked(1);

    let snapshot = snapshotter.snapshot().into_vec();
    let names: HashSet<String> = snapshot
        .iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "postline_aggregate_cache_hit_total",
        "postline_aggregate_cache_miss_total",
        "postline_aggregate_cache_invalidations_total",
        "postline_aggregate_cache_stale_discard_total",
    ];
    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }

    let invalidation_events: HashSet<String> = snapshot
        .iter()
        .filter(|(key, _, _, _)| key.key().name() == "postline_aggregate_cache_invalidations_total")
        .flat_map(|(key, _, _, _)| {
            key.key()
                .labels()
                .filter(|label| label.key() == "event")
                .map(|label| label.value().to_string())
                .collect::<Vec<_>>()
        })
        .collect();
    assert_eq!(invalidation_events.len(), 2, "{invalidation_events:?}");
}
