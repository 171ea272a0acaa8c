//! # Vessel aggregation pipeline
//!
//! Turns raw AIS messages into per-topic "distinct vessels in the last hour"
//! sensor states:
//!
//! 1. `normalizer` parses the payload into a `Sighting`
//! 2. ignored message types are dropped
//! 3. `throttle` suppresses sightings seen too recently for their rule
//! 4. `names` resolves a display name (inline, cache, lookup, fallback)
//! 5. `windows` records the sighting and counts distinct vessels
//! 6. the engine persists state and hands the result to the `publisher`
//!
//! `engine::AggregationEngine` owns all mutable state; `ingestion` drives it
//! from a channel, one message at a time.

pub mod config;
pub mod engine;
pub mod ingestion;
pub mod lookup;
pub mod names;
pub mod normalizer;
pub mod publisher;
pub mod throttle;
pub mod types;
pub mod windows;

#[cfg(test)]
mod test_http;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use engine::{AggregationEngine, ProcessOutcome};
pub use lookup::{HttpNameLookup, LookupError, NameLookup};
pub use names::{FallbackName, NameResolver, NameSource, RateLimitToken};
pub use normalizer::IngestError;
pub use publisher::{HomeAssistantPublisher, PublishError, Publisher};
pub use throttle::{ThrottleDecision, ThrottlePolicy, ThrottleRule};
pub use types::{InboundMessage, SensorUpdate, Sighting, WindowEntry};
pub use windows::{TopicWindow, WindowAggregator, WINDOW_DURATION_SECS};
