//! Pipeline ingestion - channel consumer driving the aggregation engine
//!
//! The engine is owned by this loop, so messages are processed one at a time
//! and in arrival order. The audit log, when enabled, sees every raw message
//! before the engine does and is pruned on its own timer.

use super::engine::{AggregationEngine, ProcessOutcome};
use super::types::InboundMessage;
use crate::audit::AuditLog;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};

const AUDIT_PRUNE_INTERVAL: Duration = Duration::from_secs(300);
const THROUGHPUT_LOG_INTERVAL: Duration = Duration::from_secs(60);

/// Start pipeline ingestion from the inbound message channel
///
/// Runs until every sender is dropped, then saves state and hands the engine
/// back to the caller.
pub async fn start_pipeline_ingestion(
    mut rx: mpsc::Receiver<InboundMessage>,
    mut engine: AggregationEngine,
    audit: Option<AuditLog>,
) -> AggregationEngine {
    log::info!("🚀 Starting pipeline ingestion");
    log::info!("   ├─ Audit log: {}", if audit.is_some() { "enabled" } else { "disabled" });
    log::info!("   └─ Waiting for messages...");

    if let Some(audit) = &audit {
        if let Err(e) = audit.prune(chrono::Utc::now().timestamp()) {
            log::error!("❌ Failed to prune audit log: {}", e);
        }
    }

    let mut prune_timer = interval_at(Instant::now() + AUDIT_PRUNE_INTERVAL, AUDIT_PRUNE_INTERVAL);
    prune_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut message_count = 0u64;
    let mut recorded_count = 0u64;
    let mut last_log_time = std::time::Instant::now();

    loop {
        tokio::select! {
            message = rx.recv() => {
                // Channel closed (transport shutdown)
                let Some(message) = message else {
                    log::warn!("⚠️  Inbound channel closed, stopping ingestion");
                    break;
                };

                if let Some(audit) = &audit {
                    if let Err(e) = audit.record(&message.topic, &message.payload, message.received_at) {
                        log::error!("❌ Failed to write audit row: {}", e);
                    }
                }

                let outcome = engine.process_message(&message.topic, &message.payload).await;
                message_count += 1;
                if matches!(outcome, ProcessOutcome::Recorded(_)) {
                    recorded_count += 1;
                }

                if last_log_time.elapsed() >= THROUGHPUT_LOG_INTERVAL {
                    let per_sec = message_count as f64 / last_log_time.elapsed().as_secs_f64();
                    log::info!(
                        "📊 Ingestion rate: {:.1} msg/sec ({} recorded of {})",
                        per_sec,
                        recorded_count,
                        message_count
                    );
                    last_log_time = std::time::Instant::now();
                    message_count = 0;
                    recorded_count = 0;
                }
            }

            _ = prune_timer.tick(), if audit.is_some() => {
                if let Some(audit) = &audit {
                    if let Err(e) = audit.prune(chrono::Utc::now().timestamp()) {
                        log::error!("❌ Failed to prune audit log: {}", e);
                    }
                }
            }
        }
    }

    if let Err(e) = engine.persist() {
        log::error!("❌ Failed final state save: {}", e);
    }

    log::info!("✅ Pipeline ingestion stopped");
    engine
}
