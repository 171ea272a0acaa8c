//! End-to-end scenarios for the aggregation engine
//!
//! Each test drives `AggregationEngine::process_message` with raw payloads,
//! a controllable clock, a counting lookup and a recording publisher.

#[cfg(test)]
mod pipeline_scenario_tests {
    use aisflow::persistence::{JsonStateStore, StateStore};
    use aisflow::pipeline::{
        AggregationEngine, FallbackName, LookupError, NameLookup, PipelineConfig, ProcessOutcome,
        PublishError, Publisher, SensorUpdate, ThrottleRule,
    };
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::path::Path;
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    const T0: i64 = 1_700_000_000;
    const MIN: i64 = 60;

    #[derive(Default)]
    struct RecordingPublisher {
        updates: Mutex<Vec<SensorUpdate>>,
    }

    impl RecordingPublisher {
        fn updates(&self) -> Vec<SensorUpdate> {
            self.updates.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Publisher for RecordingPublisher {
        async fn publish(&self, update: &SensorUpdate) -> Result<(), PublishError> {
            self.updates.lock().unwrap().push(update.clone());
            Ok(())
        }
    }

    /// Lookup answering from a fixed table; unknown ids fail like a network error
    struct TableLookup {
        names: Vec<(&'static str, &'static str)>,
        calls: AtomicUsize,
    }

    impl TableLookup {
        fn new(names: Vec<(&'static str, &'static str)>) -> Arc<Self> {
            Arc::new(Self {
                names,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl NameLookup for TableLookup {
        async fn lookup(&self, identifier: &str) -> Result<Option<String>, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.names
                .iter()
                .find(|(id, _)| *id == identifier)
                .map(|(_, name)| Some(name.to_string()))
                .ok_or_else(|| LookupError::Api("INVALID MMSI".to_string()))
        }
    }

    struct Harness {
        engine: AggregationEngine,
        clock: Arc<AtomicI64>,
        publisher: Arc<RecordingPublisher>,
        lookup: Arc<TableLookup>,
    }

    impl Harness {
        fn new(config: PipelineConfig, state_path: &Path, lookup: Arc<TableLookup>) -> Self {
            let clock = Arc::new(AtomicI64::new(T0));
            let clock_fn = clock.clone();
            let publisher = Arc::new(RecordingPublisher::default());
            let engine = AggregationEngine::new_with_timestamp_fn(
                config,
                Box::new(JsonStateStore::new(state_path)),
                Some(lookup.clone() as Arc<dyn NameLookup>),
                publisher.clone(),
                Box::new(move || clock_fn.load(Ordering::SeqCst)),
            );
            Self {
                engine,
                clock,
                publisher,
                lookup,
            }
        }

        fn set_time(&self, t: i64) {
            self.clock.store(t, Ordering::SeqCst);
        }

        async fn send(&mut self, topic: &str, payload: &str) -> ProcessOutcome {
            self.engine.process_message(topic, payload.as_bytes()).await
        }
    }

    fn config(topics: &[&str]) -> PipelineConfig {
        PipelineConfig {
            topics: topics.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    fn recorded(outcome: ProcessOutcome) -> SensorUpdate {
        match outcome {
            ProcessOutcome::Recorded(update) => update,
            other => panic!("expected a recorded sighting, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_window_eviction_scenario() {
        let dir = tempdir().unwrap();
        let mut h = Harness::new(config(&["T"]), &dir.path().join("s.json"), TableLookup::new(vec![]));

        h.send("T", r#"{"mmsi":"A","name":"ALPHA"}"#).await;
        h.set_time(T0 + 10 * MIN);
        h.send("T", r#"{"mmsi":"A","name":"ALPHA"}"#).await;
        h.set_time(T0 + 61 * MIN);
        let update = recorded(h.send("T", r#"{"mmsi":"B","name":"BRAVO"}"#).await);

        // (A, t0) has aged out, (A, t0+10m) has not
        assert_eq!(update.distinct_count, 2);
        assert_eq!(h.engine.windows().get_window("T").unwrap().len(), 2);

        h.set_time(T0 + 71 * MIN);
        let update = recorded(h.send("T", r#"{"mmsi":"B","name":"BRAVO"}"#).await);

        assert_eq!(update.distinct_count, 1);
        assert_eq!(h.engine.windows().get_window("T").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_lookup_then_cache_scenario() {
        let dir = tempdir().unwrap();
        let lookup = TableLookup::new(vec![("111", "POLARIS")]);
        let mut h = Harness::new(config(&["ais"]), &dir.path().join("s.json"), lookup);

        let first = recorded(h.send("ais", r#"{"mmsi":111,"type":1}"#).await);
        assert_eq!(first.name, "POLARIS");
        assert_eq!(h.engine.cached_name("111"), Some("POLARIS"));

        // Well past the cooldown, still no second call
        h.set_time(T0 + 10 * MIN);
        let second = recorded(h.send("ais", r#"{"mmsi":111,"type":1}"#).await);
        assert_eq!(second.name, "POLARIS");
        assert_eq!(h.lookup.calls(), 1);
    }

    #[tokio::test]
    async fn test_throttle_scenario() {
        let dir = tempdir().unwrap();
        let mut cfg = config(&["ais"]);
        cfg.throttle_rules = ThrottleRule::parse_list("111:5:30").unwrap();
        let mut h = Harness::new(cfg, &dir.path().join("s.json"), TableLookup::new(vec![]));

        let msg = r#"{"mmsi":111,"type":5,"shipname":"POLARIS"}"#;
        assert!(matches!(h.send("ais", msg).await, ProcessOutcome::Recorded(_)));
        h.set_time(T0 + 10);
        assert!(matches!(h.send("ais", msg).await, ProcessOutcome::Throttled));
        h.set_time(T0 + 31);
        assert!(matches!(h.send("ais", msg).await, ProcessOutcome::Recorded(_)));

        assert_eq!(h.publisher.updates().len(), 2);
        assert_eq!(h.engine.windows().get_window("ais").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_ignore_filter_scenario() {
        let dir = tempdir().unwrap();
        let mut cfg = config(&["ais"]);
        cfg.ignore_types = HashSet::from([24]);
        let lookup = TableLookup::new(vec![("111", "POLARIS")]);
        let mut h = Harness::new(cfg, &dir.path().join("s.json"), lookup);

        let outcome = h.send("ais", r#"{"mmsi":111,"type":24}"#).await;

        assert!(matches!(outcome, ProcessOutcome::Ignored { message_type: 24 }));
        assert_eq!(h.lookup.calls(), 0);
        assert!(h.engine.windows().get_window("ais").is_none());
        assert!(h.publisher.updates().is_empty());
        assert!(!dir.path().join("s.json").exists());
    }

    #[tokio::test]
    async fn test_fallback_never_poisons_cache_scenario() {
        let dir = tempdir().unwrap();
        let mut h = Harness::new(config(&["ais"]), &dir.path().join("s.json"), TableLookup::new(vec![]));

        let update = recorded(h.send("ais", r#"{"mmsi":222}"#).await);

        assert_eq!(update.name, "Unknown");
        assert_eq!(h.engine.cached_name("222"), None);
        assert_eq!(h.lookup.calls(), 1);
    }

    #[tokio::test]
    async fn test_cached_name_survives_later_fallbacks() {
        let dir = tempdir().unwrap();
        let mut cfg = config(&["ais"]);
        cfg.fallback = FallbackName::Identifier;
        let mut h = Harness::new(cfg, &dir.path().join("s.json"), TableLookup::new(vec![]));

        recorded(h.send("ais", r#"{"mmsi":111,"shipname":"POLARIS"}"#).await);
        h.set_time(T0 + 5 * MIN);
        let fallback = recorded(h.send("ais", r#"{"mmsi":333}"#).await);
        let cached = recorded(h.send("ais", r#"{"mmsi":111}"#).await);

        assert_eq!(fallback.name, "333");
        assert_eq!(cached.name, "POLARIS");
        assert_eq!(h.engine.cached_name("111"), Some("POLARIS"));
        assert_eq!(h.engine.cached_name("333"), None);
    }

    #[tokio::test]
    async fn test_lookup_at_most_once_per_cooldown() {
        let dir = tempdir().unwrap();
        let mut cfg = config(&["ais"]);
        cfg.lookup_cooldown_secs = 60;
        let mut h = Harness::new(cfg, &dir.path().join("s.json"), TableLookup::new(vec![]));

        // 100 unnamed vessels, one per second
        for i in 0..100 {
            h.set_time(T0 + i);
            h.send("ais", &format!(r#"{{"mmsi":{}}}"#, 1000 + i)).await;
        }

        // Calls at T0 and T0+60 only
        assert_eq!(h.lookup.calls(), 2);
    }

    #[tokio::test]
    async fn test_persist_reload_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mmsi_data.json");

        {
            let mut h = Harness::new(config(&["ais"]), &path, TableLookup::new(vec![]));
            h.send("ais", r#"{"mmsi":111,"shipname":"POLARIS"}"#).await;
            h.set_time(T0 + MIN);
            h.send("ais", r#"{"mmsi":222,"name":"NORDIC STAR"}"#).await;
            h.set_time(T0 + 2 * MIN);
            h.send("ais", r#"{"mmsi":111}"#).await;
        }

        let stored = JsonStateStore::new(&path).load().unwrap();
        assert_eq!(stored.windows["ais"].len(), 3);
        assert_eq!(stored.name_cache.len(), 2);

        let lookup = TableLookup::new(vec![]);
        let mut h = Harness::new(config(&["ais"]), &path, lookup);
        h.set_time(T0 + 3 * MIN);
        assert_eq!(h.engine.distinct_count("ais"), 2);

        let polaris = recorded(h.send("ais", r#"{"mmsi":111}"#).await);
        let nordic = recorded(h.send("ais", r#"{"mmsi":222}"#).await);

        assert_eq!(polaris.name, "POLARIS");
        assert_eq!(nordic.name, "NORDIC STAR");
        assert_eq!(nordic.distinct_count, 2);
        assert_eq!(h.lookup.calls(), 0);
    }

    #[tokio::test]
    async fn test_malformed_state_file_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mmsi_data.json");
        std::fs::write(&path, "{\"windows\": [").unwrap();

        let mut h = Harness::new(config(&["ais"]), &path, TableLookup::new(vec![]));
        let update = recorded(h.send("ais", r#"{"mmsi":111}"#).await);

        assert_eq!(update.distinct_count, 1);
        // The next save replaces the corrupt file
        assert_eq!(JsonStateStore::new(&path).load().unwrap().windows["ais"].len(), 1);
    }
}
