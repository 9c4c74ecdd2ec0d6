//! Standalone IMAP poller — fetches unseen emails and stages them in the DB.
//!
//! This does not run the pipeline. It only:
//! 1. Fetches unseen emails via IMAP
//! 2. Persists new ones to the `messages` table (status = "pending")
//! 3. Marks them `\Seen` in IMAP
//!
//! The processor timer loop picks up pending messages from the DB and runs
//! them through the pipeline.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::MailConfig;
use crate::mail::imap;
use crate::mail::types::is_sender_allowed;
use crate::store::Database;

/// Spawn a background task that polls IMAP and stages new emails.
///
/// Returns a `JoinHandle` and a shutdown flag. Set the flag to stop polling.
pub fn spawn_mail_poller(
    config: MailConfig,
    db: Arc<dyn Database>,
) -> (JoinHandle<()>, Arc<AtomicBool>) {
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = Arc::clone(&shutdown);

    let handle = tokio::spawn(async move {
        info!(
            "Mail poller started — polling every {}s on {}",
            config.poll_interval_secs, config.imap_host
        );

        let mut tick = tokio::time::interval(Duration::from_secs(config.poll_interval_secs));

        loop {
            tick.tick().await;

            if shutdown.load(Ordering::Relaxed) {
                info!("Mail poller shutting down");
                return;
            }

            poll_once(&config, &db).await;
        }
    });

    (handle, shutdown_flag)
}

/// Run a single poll cycle: fetch unseen → stage → mark `\Seen`.
async fn poll_once(config: &MailConfig, db: &Arc<dyn Database>) {
    let cfg = config.clone();
    let fetch_result = tokio::task::spawn_blocking(move || imap::fetch_unseen_imap(&cfg)).await;

    let messages = match fetch_result {
        Ok(Ok(msgs)) => msgs,
        Ok(Err(e)) => {
            error!("Mail poll failed: {e}");
            return;
        }
        Err(e) => {
            error!("Mail poll task panicked: {e}");
            return;
        }
    };

    if messages.is_empty() {
        return;
    }

    debug!("Fetched {} unseen emails", messages.len());

    let mut uids_to_mark: Vec<String> = Vec::new();
    let from_addr = &config.from_address;

    for mail in &messages {
        // Self-loop prevention
        if mail.sender.eq_ignore_ascii_case(from_addr) {
            debug!(sender = %mail.sender, "Skipping self-sent email");
            uids_to_mark.push(mail.uid.clone());
            continue;
        }

        // Allowlist check
        if !is_sender_allowed(&config.allowed_senders, &mail.sender) {
            warn!("Blocked email from {}", mail.sender);
            uids_to_mark.push(mail.uid.clone());
            continue;
        }

        // Dedup: skip if already staged
        if db
            .get_message_by_external_id(&mail.message_id)
            .await
            .ok()
            .flatten()
            .is_some()
        {
            uids_to_mark.push(mail.uid.clone());
            continue;
        }

        let received_at = chrono::DateTime::from_timestamp(mail.timestamp as i64, 0)
            .unwrap_or_else(chrono::Utc::now);

        match db
            .insert_message(
                &mail.message_id,
                &mail.sender,
                mail.sender_name.as_deref(),
                Some(&mail.subject),
                &mail.body,
                mail.thread_id.as_deref(),
                received_at,
            )
            .await
        {
            Ok(id) => {
                debug!(id = %id, message_id = %mail.message_id, "Email staged");
            }
            Err(e) => {
                error!("Failed to stage email: {e}");
            }
        }

        uids_to_mark.push(mail.uid.clone());
    }

    // Mark all handled emails as `\Seen`
    if !uids_to_mark.is_empty() {
        let cfg = config.clone();
        let uids = uids_to_mark;
        match tokio::task::spawn_blocking(move || imap::mark_seen_imap(&cfg, &uids)).await {
            Ok(Err(e)) => warn!("Failed to mark emails as seen: {e}"),
            Err(e) => warn!("Mark-seen task panicked: {e}"),
            Ok(Ok(())) => {}
        }
    }
}
