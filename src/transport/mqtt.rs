//! MQTT subscriber feeding the ingestion channel
//!
//! rumqttc reconnects on the next `poll` after a connection error; this loop
//! only adds backoff between attempts and re-subscribes after every ConnAck,
//! since the broker may have dropped the session.

use super::backoff::ExponentialBackoff;
use crate::config::RuntimeConfig;
use crate::pipeline::types::InboundMessage;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS, SubscribeFilter};
use std::time::Duration;
use tokio::sync::mpsc;

pub struct MqttSource {
    client: AsyncClient,
    eventloop: EventLoop,
    topics: Vec<String>,
}

impl MqttSource {
    pub fn new(config: &RuntimeConfig, topics: Vec<String>) -> Self {
        let mut options = MqttOptions::new(
            config.mqtt_client_id.clone(),
            config.mqtt_server.clone(),
            config.mqtt_port,
        );
        options.set_keep_alive(Duration::from_secs(60));
        if let Some((username, password)) = &config.mqtt_credentials {
            options.set_credentials(username.clone(), password.clone());
        }

        let (client, eventloop) = AsyncClient::new(options, 64);

        Self {
            client,
            eventloop,
            topics,
        }
    }

    fn subscribe_all(&self) {
        let filters = self
            .topics
            .iter()
            .map(|t| SubscribeFilter::new(t.clone(), QoS::AtMostOnce));

        match self.client.try_subscribe_many(filters) {
            Ok(()) => {
                for topic in &self.topics {
                    log::info!("📡 Subscribed to MQTT topic: {}", topic);
                }
            }
            Err(e) => log::error!("❌ Failed to subscribe: {}", e),
        }
    }

    /// Poll the broker until the ingestion side hangs up
    pub async fn run(mut self, tx: mpsc::Sender<InboundMessage>) {
        let mut backoff = ExponentialBackoff::new(1, 60);

        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    log::info!("✅ Connected to MQTT broker");
                    backoff.reset();
                    self.subscribe_all();
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let message = InboundMessage {
                        topic: publish.topic.clone(),
                        payload: publish.payload.to_vec(),
                        received_at: chrono::Utc::now().timestamp(),
                    };
                    if tx.send(message).await.is_err() {
                        log::warn!("⚠️  Ingestion channel closed, stopping MQTT loop");
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    log::error!("❌ MQTT connection error: {}", e);
                    backoff.sleep().await;
                }
            }
        }

        if let Err(e) = self.client.try_disconnect() {
            log::debug!("MQTT disconnect failed: {}", e);
        }
    }
}
