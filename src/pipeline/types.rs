//! Core data types shared across the pipeline
//!
//! All timestamps are Unix seconds.

use serde::{Deserialize, Serialize};

/// A single vessel observation, normalized from an inbound message
///
/// Built by the normalizer, consumed by the engine and dropped once the
/// message has been processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sighting {
    pub identifier: String,
    pub inline_name: Option<String>,
    pub message_type: Option<i64>,
    pub observed_at: i64,
}

/// One `(identifier, timestamp)` pair held in a topic window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowEntry {
    pub identifier: String,
    pub timestamp: i64,
}

impl WindowEntry {
    pub fn new(identifier: impl Into<String>, timestamp: i64) -> Self {
        Self {
            identifier: identifier.into(),
            timestamp,
        }
    }
}

/// Aggregate emitted to the publisher after a sighting is recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorUpdate {
    pub topic: String,
    pub name: String,
    pub identifier: String,
    pub distinct_count: usize,
}

/// Raw message as delivered by the transport
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub received_at: i64,
}
