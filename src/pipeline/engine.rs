//! Aggregation Engine - single owner of all mutable pipeline state
//!
//! ## Flow per message
//!
//! ```text
//! raw payload
//!     ↓  topic check
//! Sighting::from_payload()
//!     ↓  ignore-type filter
//! ThrottlePolicy::admit()
//!     ↓
//! NameResolver::resolve()      (cache, rate-limited lookup, fallback)
//!     ↓
//! WindowAggregator::record()   (append, evict, distinct count)
//!     ↓
//! StateStore::save()
//!     ↓
//! Publisher::publish()
//! ```
//!
//! Messages are processed strictly one at a time. The engine is moved into a
//! single ingestion task, so windows, name cache, throttle state and the
//! lookup token never need a lock.

use super::config::PipelineConfig;
use super::lookup::NameLookup;
use super::names::{NameResolver, NameSource};
use super::normalizer::IngestError;
use super::publisher::Publisher;
use super::throttle::{ThrottleDecision, ThrottlePolicy};
use super::types::{SensorUpdate, Sighting};
use super::windows::WindowAggregator;
use crate::persistence::{PersistedState, PersistenceError, StateStore};
use std::collections::HashSet;
use std::sync::Arc;

/// Result of processing one inbound message
#[derive(Debug)]
pub enum ProcessOutcome {
    /// Topic is not in the configured topic list
    UnknownTopic,
    Rejected(IngestError),
    Ignored { message_type: i64 },
    Throttled,
    Recorded(SensorUpdate),
}

pub struct AggregationEngine {
    topics: HashSet<String>,
    ignore_types: HashSet<i64>,
    throttle: ThrottlePolicy,
    resolver: NameResolver,
    windows: WindowAggregator,
    store: Box<dyn StateStore>,
    publisher: Arc<dyn Publisher>,

    /// Timestamp function (for testing with mock time)
    now_fn: Box<dyn Fn() -> i64 + Send + Sync>,
}

impl AggregationEngine {
    /// Create an engine using wall-clock Unix time
    ///
    /// Previously persisted windows and names are loaded from `store`. An
    /// unreadable store is logged and the engine starts empty.
    pub fn new(
        config: PipelineConfig,
        store: Box<dyn StateStore>,
        lookup: Option<Arc<dyn NameLookup>>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self::new_with_timestamp_fn(
            config,
            store,
            lookup,
            publisher,
            Box::new(|| chrono::Utc::now().timestamp()),
        )
    }

    /// Create an engine with a custom timestamp function
    pub fn new_with_timestamp_fn(
        config: PipelineConfig,
        store: Box<dyn StateStore>,
        lookup: Option<Arc<dyn NameLookup>>,
        publisher: Arc<dyn Publisher>,
        now_fn: Box<dyn Fn() -> i64 + Send + Sync>,
    ) -> Self {
        let persisted = match store.load() {
            Ok(state) => state,
            Err(e) => {
                log::error!("Failed to load persisted state, starting empty: {}", e);
                PersistedState::default()
            }
        };
        let (windows, name_cache) = persisted.into_windows();

        Self {
            topics: config.topics.into_iter().collect(),
            ignore_types: config.ignore_types,
            throttle: ThrottlePolicy::new(config.throttle_rules),
            resolver: NameResolver::new(
                name_cache,
                lookup,
                config.lookup_cooldown_secs,
                config.fallback,
            ),
            windows: WindowAggregator::from_windows(windows),
            store,
            publisher,
            now_fn,
        }
    }

    /// Run one raw message through the full pipeline
    ///
    /// Never fails: every error is logged and reflected in the outcome.
    pub async fn process_message(&mut self, topic: &str, payload: &[u8]) -> ProcessOutcome {
        if !self.topics.contains(topic) {
            log::warn!("Received message on unconfigured topic: {}", topic);
            return ProcessOutcome::UnknownTopic;
        }

        let now = (self.now_fn)();

        let sighting = match Sighting::from_payload(payload, now) {
            Ok(sighting) => sighting,
            Err(e) => {
                log::warn!("Dropping message on {}: {}", topic, e);
                return ProcessOutcome::Rejected(e);
            }
        };

        if let Some(message_type) = sighting.message_type {
            if self.ignore_types.contains(&message_type) {
                log::debug!(
                    "Ignoring type {} message from MMSI {} on {}",
                    message_type,
                    sighting.identifier,
                    topic
                );
                return ProcessOutcome::Ignored { message_type };
            }
        }

        if self.throttle.admit(&sighting.identifier, sighting.message_type, now)
            == ThrottleDecision::Deny
        {
            log::debug!(
                "Throttled type {:?} message from MMSI {} on {}",
                sighting.message_type,
                sighting.identifier,
                topic
            );
            return ProcessOutcome::Throttled;
        }

        log::info!(
            "Received type {:?} message: {:?} ({}) on topic {}",
            sighting.message_type,
            sighting.inline_name,
            sighting.identifier,
            topic
        );

        let resolved = self.resolver.resolve(&sighting, now).await;
        if resolved.source == NameSource::Fallback {
            log::debug!("MMSI {} published under fallback name", sighting.identifier);
        }

        let distinct_count = self.windows.record(topic, &sighting.identifier, now);

        if let Err(e) = self.persist() {
            log::error!("Failed to save state: {}", e);
        }

        let update = SensorUpdate {
            topic: topic.to_string(),
            name: resolved.name,
            identifier: sighting.identifier,
            distinct_count,
        };

        if let Err(e) = self.publisher.publish(&update).await {
            log::error!("Failed to publish update for {}: {}", topic, e);
        }

        ProcessOutcome::Recorded(update)
    }

    /// Copy of the durable part of the engine state
    pub fn snapshot(&self) -> PersistedState {
        PersistedState {
            windows: self
                .windows
                .windows()
                .iter()
                .map(|(topic, window)| (topic.clone(), window.entries().to_vec()))
                .collect(),
            name_cache: self.resolver.cache().clone(),
        }
    }

    pub fn persist(&self) -> Result<(), PersistenceError> {
        self.store.save(&self.snapshot())
    }

    /// Distinct vessels currently held for a topic, without evicting
    pub fn distinct_count(&self, topic: &str) -> usize {
        self.windows
            .get_window(topic)
            .map(|w| w.distinct_count())
            .unwrap_or(0)
    }

    pub fn cached_name(&self, identifier: &str) -> Option<&str> {
        self.resolver.cache().get(identifier).map(String::as_str)
    }

    pub fn throttle(&self) -> &ThrottlePolicy {
        &self.throttle
    }

    pub fn windows(&self) -> &WindowAggregator {
        &self.windows
    }
}
