//! aisflow runtime
//!
//! Subscribes to AIS topics over MQTT, counts distinct vessels per topic over
//! the last hour and pushes the result to Home Assistant.
//!
//! Usage:
//!   cargo run --release --bin aisflow
//!
//! Environment variables:
//!   MQTT_SERVER, MQTT_TOPICS, HA_SERVER_URL, HA_TOKEN - required
//!   DATA_FILE_PATH - state file (default: /data/mmsi_data.json)
//!   IGNORE_TYPES, THROTTLE_RULES - message filtering
//!   LOOKUP_URL, LOOKUP_API_KEY, LOOKUP_COOLDOWN_SECS - external name lookup
//!   AUDIT_DB_PATH, AUDIT_RETENTION_HOURS - raw message audit log

use aisflow::{
    audit::AuditLog,
    config::RuntimeConfig,
    persistence::JsonStateStore,
    pipeline::{
        ingestion::start_pipeline_ingestion, AggregationEngine, HomeAssistantPublisher,
        HttpNameLookup, InboundMessage, NameLookup, PipelineConfig, Publisher,
    },
    transport::MqttSource,
};
use dotenv::dotenv;
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize environment and logging
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stdout)
        .init();

    info!("🚀 Starting aisflow");

    let config = RuntimeConfig::from_env()?;
    let pipeline_config = PipelineConfig::from_env()?;

    info!("📊 Configuration:");
    info!("   ├─ MQTT broker: {}:{}", config.mqtt_server, config.mqtt_port);
    info!("   ├─ Topics: {:?}", pipeline_config.topics);
    info!("   ├─ Ignored types: {:?}", pipeline_config.ignore_types);
    info!("   ├─ Throttle rules: {}", pipeline_config.throttle_rules.len());
    info!("   ├─ Name lookup: {}", if config.lookup.is_some() { "enabled" } else { "disabled" });
    info!("   └─ State file: {}", config.data_file_path);

    let lookup: Option<Arc<dyn NameLookup>> = match &config.lookup {
        Some(lookup) => Some(Arc::new(HttpNameLookup::new(
            &lookup.url_template,
            &lookup.api_key,
            lookup.timeout,
        )?)),
        None => None,
    };

    let publisher: Arc<dyn Publisher> = Arc::new(HomeAssistantPublisher::new(
        &config.ha_server_url,
        &config.ha_token,
        Duration::from_secs(10),
    )?);

    let audit = match &config.audit {
        Some(audit) => match AuditLog::new(&audit.db_path, audit.retention_secs) {
            Ok(log) => Some(log),
            Err(e) => {
                warn!("⚠️  Audit log disabled, failed to open {}: {}", audit.db_path, e);
                None
            }
        },
        None => None,
    };

    let topics = pipeline_config.topics.clone();
    let engine = AggregationEngine::new(
        pipeline_config,
        Box::new(JsonStateStore::new(&config.data_file_path)),
        lookup,
        publisher,
    );
    info!("✅ AggregationEngine created");

    let (tx, rx) = mpsc::channel::<InboundMessage>(config.channel_buffer);

    let ingestion_handle = tokio::spawn(start_pipeline_ingestion(rx, engine, audit));

    info!("🔌 Connecting to MQTT broker: {}:{}", config.mqtt_server, config.mqtt_port);
    let source = MqttSource::new(&config, topics);
    let transport_handle = tokio::spawn(source.run(tx));

    info!("🔄 Press CTRL+C to shutdown gracefully");

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("⚠️  Received CTRL+C, shutting down..."),
        Err(err) => error!("❌ Failed to listen for CTRL+C: {}", err),
    }

    // Stopping the transport drops the sender, which lets ingestion drain and save
    transport_handle.abort();
    let _ = transport_handle.await;

    match tokio::time::timeout(Duration::from_secs(30), ingestion_handle).await {
        Ok(Ok(_engine)) => info!("✅ State saved"),
        Ok(Err(e)) => error!("❌ Ingestion task failed: {}", e),
        Err(_) => error!("❌ Timed out waiting for ingestion to drain"),
    }

    info!("✅ aisflow stopped");
    Ok(())
}
