//! Downstream delivery of per-topic vessel counts
//!
//! The production publisher pushes sensor states to Home Assistant's REST
//! API, one `sensor.*` entity per topic.

use super::types::SensorUpdate;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug)]
pub enum PublishError {
    Http(reqwest::Error),
    Status(u16),
}

impl From<reqwest::Error> for PublishError {
    fn from(err: reqwest::Error) -> Self {
        PublishError::Http(err)
    }
}

impl std::fmt::Display for PublishError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PublishError::Http(e) => write!(f, "HTTP error: {}", e),
            PublishError::Status(code) => write!(f, "Sink returned status {}", code),
        }
    }
}

impl std::error::Error for PublishError {}

#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, update: &SensorUpdate) -> Result<(), PublishError>;
}

#[derive(Debug, Serialize)]
struct SensorAttributes<'a> {
    name: &'a str,
    mmsi: &'a str,
    #[serde(rename = "vesselsInLastHour")]
    vessels_in_last_hour: usize,
}

#[derive(Debug, Serialize)]
struct SensorState<'a> {
    state: &'static str,
    attributes: SensorAttributes<'a>,
}

impl<'a> SensorState<'a> {
    fn from_update(update: &'a SensorUpdate) -> Self {
        Self {
            state: "active",
            attributes: SensorAttributes {
                name: &update.name,
                mmsi: &update.identifier,
                vessels_in_last_hour: update.distinct_count,
            },
        }
    }
}

/// Entity id for a topic, e.g. `ais/harbour` -> `sensor.ais_harbour`
pub fn sensor_entity_id(topic: &str) -> String {
    format!("sensor.{}", topic.replace('/', "_"))
}

pub struct HomeAssistantPublisher {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HomeAssistantPublisher {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, PublishError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    pub fn sensor_url(&self, topic: &str) -> String {
        format!("{}/api/states/{}", self.base_url, sensor_entity_id(topic))
    }
}

#[async_trait]
impl Publisher for HomeAssistantPublisher {
    async fn publish(&self, update: &SensorUpdate) -> Result<(), PublishError> {
        let url = self.sensor_url(&update.topic);
        let payload = SensorState::from_update(update);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PublishError::Status(response.status().as_u16()));
        }

        log::info!(
            "Posted to Home Assistant: {} name='{}' mmsi={} vessels={}",
            url,
            update.name,
            update.identifier,
            update.distinct_count
        );
        Ok(())
    }
}
