//! Raw IMAP over TLS — fetch unseen messages, mark them `\Seen`.
//!
//! Blocking I/O throughout; callers run these in `spawn_blocking`.

use std::io::Write as IoWrite;
use std::net::TcpStream;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use mail_parser::MessageParser;
use secrecy::ExposeSecret;
use uuid::Uuid;

use crate::config::MailConfig;
use crate::error::MailError;
use crate::mail::types::{
    FetchedMail, extract_sender, extract_sender_name, extract_text, extract_thread_id,
    strip_quoted_text,
};

type TlsStream = rustls::StreamOwned<rustls::ClientConnection, TcpStream>;

/// Fetch unseen emails. Does NOT mark them seen — callers confirm
/// staging first and then call [`mark_seen_imap`].
pub fn fetch_unseen_imap(config: &MailConfig) -> Result<Vec<FetchedMail>, MailError> {
    let mut tls = connect(config)?;

    // Read greeting
    let _greeting = read_line(&mut tls)?;

    login(&mut tls, config)?;

    let _select = send_cmd(&mut tls, "A2", "SELECT \"INBOX\"")?;

    let search_resp = send_cmd(&mut tls, "A3", "SEARCH UNSEEN")?;
    let mut uids: Vec<String> = Vec::new();
    for line in &search_resp {
        if line.starts_with("* SEARCH") {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() > 2 {
                uids.extend(parts[2..].iter().map(|s| s.to_string()));
            }
        }
    }

    let mut results = Vec::new();
    let mut tag_counter = 4_u32;

    for uid in &uids {
        let fetch_tag = format!("A{tag_counter}");
        tag_counter += 1;
        let fetch_resp = send_cmd(&mut tls, &fetch_tag, &format!("FETCH {uid} RFC822"))?;

        let raw: String = fetch_resp
            .iter()
            .skip(1)
            .take(fetch_resp.len().saturating_sub(2))
            .cloned()
            .collect();

        if let Some(parsed) = MessageParser::default().parse(raw.as_bytes()) {
            let sender = extract_sender(&parsed);
            let sender_name = extract_sender_name(&parsed);
            let subject = parsed.subject().unwrap_or("(no subject)").to_string();
            let body = strip_quoted_text(&extract_text(&parsed));
            let thread_id = extract_thread_id(&parsed);
            let message_id = parsed
                .message_id()
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("gen-{}", Uuid::new_v4()));

            #[allow(clippy::cast_sign_loss)]
            let timestamp = parsed
                .date()
                .map(|d| {
                    let naive = chrono::NaiveDate::from_ymd_opt(
                        d.year as i32,
                        u32::from(d.month),
                        u32::from(d.day),
                    )
                    .and_then(|date| {
                        date.and_hms_opt(
                            u32::from(d.hour),
                            u32::from(d.minute),
                            u32::from(d.second),
                        )
                    });
                    naive.map_or(0, |n| n.and_utc().timestamp() as u64)
                })
                .unwrap_or_else(|| {
                    SystemTime::now()
                        .duration_since(UNIX_EPOCH)
                        .map(|d| d.as_secs())
                        .unwrap_or(0)
                });

            results.push(FetchedMail {
                uid: uid.clone(),
                message_id,
                sender,
                sender_name,
                subject,
                body,
                thread_id,
                timestamp,
            });
        }
    }

    logout(&mut tls, tag_counter);
    Ok(results)
}

/// Mark the given IMAP sequence numbers as `\Seen`.
pub fn mark_seen_imap(config: &MailConfig, uids: &[String]) -> Result<(), MailError> {
    if uids.is_empty() {
        return Ok(());
    }

    let mut tls = connect(config)?;
    let _greeting = read_line(&mut tls)?;
    login(&mut tls, config)?;
    let _select = send_cmd(&mut tls, "A2", "SELECT \"INBOX\"")?;

    let mut tag_counter = 3_u32;
    for uid in uids {
        let tag = format!("A{tag_counter}");
        tag_counter += 1;
        let _ = send_cmd(&mut tls, &tag, &format!("STORE {uid} +FLAGS (\\Seen)"));
    }

    logout(&mut tls, tag_counter);
    Ok(())
}

// ── Connection plumbing ─────────────────────────────────────────────

fn connect(config: &MailConfig) -> Result<TlsStream, MailError> {
    let tcp = TcpStream::connect((&*config.imap_host, config.imap_port)).map_err(|e| {
        MailError::ImapConnect {
            host: config.imap_host.clone(),
            reason: e.to_string(),
        }
    })?;
    tcp.set_read_timeout(Some(Duration::from_secs(30)))
        .map_err(|e| MailError::ImapConnect {
            host: config.imap_host.clone(),
            reason: e.to_string(),
        })?;

    let mut root_store = rustls::RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let tls_config = Arc::new(
        rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth(),
    );
    let server_name: rustls::pki_types::ServerName<'_> =
        rustls::pki_types::ServerName::try_from(config.imap_host.clone()).map_err(|e| {
            MailError::ImapConnect {
                host: config.imap_host.clone(),
                reason: e.to_string(),
            }
        })?;
    let conn = rustls::ClientConnection::new(tls_config, server_name).map_err(|e| {
        MailError::ImapConnect {
            host: config.imap_host.clone(),
            reason: e.to_string(),
        }
    })?;

    Ok(rustls::StreamOwned::new(conn, tcp))
}

fn login(tls: &mut TlsStream, config: &MailConfig) -> Result<(), MailError> {
    let login_resp = send_cmd(
        tls,
        "A1",
        &format!(
            "LOGIN \"{}\" \"{}\"",
            config.username,
            config.password.expose_secret()
        ),
    )?;
    if !login_resp.last().is_some_and(|l| l.contains("OK")) {
        return Err(MailError::ImapAuth {
            username: config.username.clone(),
        });
    }
    Ok(())
}

fn logout(tls: &mut TlsStream, tag_counter: u32) {
    let logout_tag = format!("A{tag_counter}");
    let _ = send_cmd(tls, &logout_tag, "LOGOUT");
}

fn read_line(tls: &mut TlsStream) -> Result<String, MailError> {
    let mut buf = Vec::new();
    loop {
        let mut byte = [0u8; 1];
        match std::io::Read::read(tls, &mut byte) {
            Ok(0) => return Err(MailError::ImapProtocol("connection closed".into())),
            Ok(_) => {
                buf.push(byte[0]);
                if buf.ends_with(b"\r\n") {
                    return Ok(String::from_utf8_lossy(&buf).to_string());
                }
            }
            Err(e) => return Err(MailError::ImapProtocol(e.to_string())),
        }
    }
}

fn send_cmd(tls: &mut TlsStream, tag: &str, cmd: &str) -> Result<Vec<String>, MailError> {
    let full = format!("{tag} {cmd}\r\n");
    IoWrite::write_all(tls, full.as_bytes()).map_err(|e| MailError::ImapProtocol(e.to_string()))?;
    IoWrite::flush(tls).map_err(|e| MailError::ImapProtocol(e.to_string()))?;
    let mut lines = Vec::new();
    loop {
        let line = read_line(tls)?;
        let done = line.starts_with(tag);
        lines.push(line);
        if done {
            break;
        }
    }
    Ok(lines)
}
