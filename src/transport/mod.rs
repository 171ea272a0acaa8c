//! Inbound transport: MQTT subscription with reconnect backoff

pub mod backoff;
pub mod mqtt;

pub use backoff::ExponentialBackoff;
pub use mqtt::MqttSource;
