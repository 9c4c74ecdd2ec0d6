use std::sync::Arc;
use std::sync::atomic::Ordering;

use replydesk::config::{MailConfig, ResponderConfig};
use replydesk::llm::{LlmBackend, LlmConfig, create_provider};
use replydesk::mail::{SmtpMailer, spawn_mail_poller};
use replydesk::pipeline::{Responder, spawn_processor};
use replydesk::report::FailureReporter;
use replydesk::store::{Database, LibSqlBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize tracing — daily rolling log file
    let log_dir = std::env::var("REPLYDESK_LOG_DIR").unwrap_or_else(|_| "./logs".to_string());
    let file_appender = tracing_appender::rolling::daily(&log_dir, "replydesk.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(false)
        .init();

    // Read API key from environment
    let (backend, api_key) = if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
        (LlmBackend::Anthropic, key)
    } else if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        (LlmBackend::OpenAi, key)
    } else {
        eprintln!("Error: no API key set");
        eprintln!("  export ANTHROPIC_API_KEY=sk-ant-...  (or OPENAI_API_KEY)");
        std::process::exit(1);
    };

    let model = std::env::var("REPLYDESK_MODEL")
        .unwrap_or_else(|_| "claude-sonnet-4-20250514".to_string());

    eprintln!("📬 Replydesk v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", model);

    let llm_config = LlmConfig {
        backend,
        api_key: secrecy::SecretString::from(api_key),
        model,
    };
    let llm = create_provider(&llm_config)?;

    // ── Database ─────────────────────────────────────────────────────────
    let db_path =
        std::env::var("REPLYDESK_DB_PATH").unwrap_or_else(|_| "./data/replydesk.db".to_string());

    let db_path_ref = std::path::Path::new(&db_path);
    let db: Arc<dyn Database> = Arc::new(
        LibSqlBackend::new_local(db_path_ref)
            .await
            .unwrap_or_else(|e| {
                eprintln!("Error: Failed to open database at {}: {}", db_path, e);
                std::process::exit(1);
            }),
    );

    eprintln!("   Database: {}", db_path);

    // ── Mailbox ──────────────────────────────────────────────────────────
    let Some(mail_config) = MailConfig::from_env() else {
        eprintln!("Error: EMAIL_IMAP_HOST not set — nothing to poll");
        eprintln!("  export EMAIL_IMAP_HOST=imap.example.com");
        std::process::exit(1);
    };

    let senders = &mail_config.allowed_senders;
    eprintln!(
        "   Mailbox: IMAP {}, SMTP {}, allowed: {}",
        mail_config.imap_host,
        mail_config.smtp_host,
        if senders.is_empty() {
            "everyone".to_string()
        } else {
            senders.join(", ")
        }
    );

    // ── Responder ────────────────────────────────────────────────────────
    let responder_config = ResponderConfig::from_env();
    match responder_config.operator_address {
        Some(ref operator) => eprintln!("   Escalations: {}", operator),
        None => eprintln!("   Escalations: disabled (no operator address)"),
    }

    let reporter = Arc::new(FailureReporter::new(
        responder_config.failure_sink_url.clone(),
    ));
    let transport = Arc::new(SmtpMailer::new(mail_config.clone()));
    let responder = Arc::new(Responder::new(
        Arc::clone(&db),
        llm,
        transport,
        responder_config.clone(),
    ));

    // ── Background tasks ─────────────────────────────────────────────────
    let (poller_handle, poller_shutdown) = spawn_mail_poller(mail_config, Arc::clone(&db));
    let (processor_handle, processor_shutdown) = spawn_processor(
        Arc::clone(&db),
        responder,
        reporter,
        responder_config.process_interval_secs,
    );

    eprintln!(
        "   Running (poll + process loops up). Ctrl-C to stop.\n"
    );

    tokio::signal::ctrl_c().await?;
    eprintln!("Shutting down...");

    poller_shutdown.store(true, Ordering::Relaxed);
    processor_shutdown.store(true, Ordering::Relaxed);
    poller_handle.abort();
    processor_handle.abort();

    Ok(())
}
