//! Background processor — drains pending staged messages through the
//! pipeline on a timer.
//!
//! Each tick it:
//! 1. Loads pending messages from the DB
//! 2. Runs each through `Responder::process`
//! 3. Marks them `processed` (or `failed`), forwarding failures to the
//!    failure sink

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::pipeline::responder::Responder;
use crate::report::FailureReporter;
use crate::store::{Database, MessageStatus};

/// Spawn the processor loop.
///
/// Returns a `JoinHandle` and shutdown flag. Set the flag to stop.
pub fn spawn_processor(
    db: Arc<dyn Database>,
    responder: Arc<Responder>,
    reporter: Arc<FailureReporter>,
    interval_secs: u64,
) -> (JoinHandle<()>, Arc<AtomicBool>) {
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = Arc::clone(&shutdown);

    let handle = tokio::spawn(async move {
        info!("Processor started — draining every {interval_secs}s");

        let mut tick = tokio::time::interval(Duration::from_secs(interval_secs));

        loop {
            tick.tick().await;

            if shutdown.load(Ordering::Relaxed) {
                info!("Processor shutting down");
                return;
            }

            drain_pending(&db, &responder, &reporter).await;
        }
    });

    (handle, shutdown_flag)
}

/// Run one drain cycle over all pending staged messages.
///
/// Failures on individual messages are isolated — one bad message never
/// blocks the rest of the batch.
pub async fn drain_pending(
    db: &Arc<dyn Database>,
    responder: &Arc<Responder>,
    reporter: &Arc<FailureReporter>,
) {
    let pending = match db.get_pending_messages().await {
        Ok(msgs) => msgs,
        Err(e) => {
            error!("Failed to fetch pending messages: {e}");
            return;
        }
    };

    if pending.is_empty() {
        return;
    }

    info!("Processing {} pending message(s)", pending.len());

    for stored in &pending {
        match responder.process(stored).await {
            Ok(outcome) => {
                debug!(
                    id = %stored.id,
                    intent = outcome.intent.as_str(),
                    escalated = outcome.escalated,
                    fallback = outcome.fallback_used,
                    "Message processed"
                );

                // Reply went out even if the record update failed — never
                // leave the message pending, that would re-send.
                if let Some(ref record_error) = outcome.record_error {
                    reporter
                        .report("record_update", &stored.id, record_error)
                        .await;
                }

                if let Err(e) = db
                    .update_message_status(&stored.id, MessageStatus::Processed)
                    .await
                {
                    warn!(id = %stored.id, error = %e, "Failed to update message status");
                    reporter.report("status_update", &stored.id, &e.to_string()).await;
                }
            }
            Err(e) => {
                error!(id = %stored.id, error = %e, "Pipeline pass failed");
                reporter.report("pipeline", &stored.id, &e.to_string()).await;

                if let Err(e2) = db
                    .update_message_status(&stored.id, MessageStatus::Failed)
                    .await
                {
                    warn!(id = %stored.id, error = %e2, "Failed to mark message failed");
                }
            }
        }
    }
}
