//! Per-topic rolling windows of vessel sightings
//!
//! Each topic keeps every `(identifier, timestamp)` pair seen in the trailing
//! hour. Eviction only happens when the topic receives a new sighting, so an
//! idle topic keeps its stale entries until the next one arrives.

use super::types::WindowEntry;
use std::collections::{HashMap, HashSet};

/// Fixed retention of a topic window (60 minutes)
pub const WINDOW_DURATION_SECS: i64 = 60 * 60;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicWindow {
    entries: Vec<WindowEntry>,
}

impl TopicWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<WindowEntry>) -> Self {
        Self { entries }
    }

    pub fn add_sighting(&mut self, identifier: &str, timestamp: i64) {
        self.entries.push(WindowEntry::new(identifier, timestamp));
    }

    /// Drop every entry at or before the cutoff
    ///
    /// Full scan: entries reloaded from disk are not guaranteed to be sorted.
    pub fn evict_before(&mut self, cutoff_timestamp: i64) {
        self.entries.retain(|e| e.timestamp > cutoff_timestamp);
    }

    pub fn distinct_count(&self) -> usize {
        self.entries
            .iter()
            .map(|e| e.identifier.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn entries(&self) -> &[WindowEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct WindowAggregator {
    windows: HashMap<String, TopicWindow>,
}

impl WindowAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_windows(windows: HashMap<String, TopicWindow>) -> Self {
        Self { windows }
    }

    /// Append a sighting, evict expired entries and return the distinct count
    pub fn record(&mut self, topic: &str, identifier: &str, now: i64) -> usize {
        let window = self.windows.entry(topic.to_string()).or_default();

        window.add_sighting(identifier, now);
        window.evict_before(now - WINDOW_DURATION_SECS);

        window.distinct_count()
    }

    pub fn get_window(&self, topic: &str) -> Option<&TopicWindow> {
        self.windows.get(topic)
    }

    pub fn windows(&self) -> &HashMap<String, TopicWindow> {
        &self.windows
    }

    pub fn get_active_topics(&self) -> Vec<String> {
        self.windows.keys().cloned().collect()
    }
}
