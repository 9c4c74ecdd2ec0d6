//! libSQL backend — async `Database` trait implementation.
//!
//! Supports local file and in-memory databases. `libsql::Connection` is
//! `Send + Sync` and safe for concurrent async use, so a single connection
//! is reused for all operations.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::model::{Customer, Direction, Interaction, Stage};
use crate::store::traits::{Database, MessageStatus, StoredMessage};
use crate::triage::Intent;

/// libSQL database backend.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Connection(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Connection(format!("Failed to open database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Connection(format!("Failed to create connection: {e}")))?;

        migrations::run_migrations(&conn).await?;
        info!(path = %path.display(), "Database opened");

        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Connection(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Connection(format!("Failed to create connection: {e}")))?;

        migrations::run_migrations(&conn).await?;

        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn parse_optional_datetime(s: &Option<String>) -> Option<DateTime<Utc>> {
    s.as_ref().map(|s| parse_datetime(s))
}

fn msg_status_to_str(status: MessageStatus) -> &'static str {
    match status {
        MessageStatus::Pending => "pending",
        MessageStatus::Processed => "processed",
        MessageStatus::Failed => "failed",
    }
}

fn str_to_msg_status(s: &str) -> MessageStatus {
    match s {
        "processed" => MessageStatus::Processed,
        "failed" => MessageStatus::Failed,
        _ => MessageStatus::Pending,
    }
}

/// Column order: 0:id, 1:email, 2:display_name, 3:company, 4:stage,
/// 5:first_contact, 6:last_contact, 7:interaction_count,
/// 8:sentiment_score, 9:conversion_probability, 10:notes
fn row_to_customer(row: &libsql::Row) -> Result<Customer, DatabaseError> {
    let id_str: String = row.get(0).map_err(query_err)?;
    let email: String = row.get(1).map_err(query_err)?;
    let display_name: Option<String> = row.get(2).map_err(query_err)?;
    let company: Option<String> = row.get(3).map_err(query_err)?;
    let stage_str: String = row.get(4).map_err(query_err)?;
    let first_str: String = row.get(5).map_err(query_err)?;
    let last_str: String = row.get(6).map_err(query_err)?;
    let interaction_count: i64 = row.get(7).map_err(query_err)?;
    let sentiment_score: f64 = row.get(8).map_err(query_err)?;
    let conversion_probability: f64 = row.get(9).map_err(query_err)?;
    let notes: Option<String> = row.get(10).map_err(query_err)?;

    Ok(Customer {
        id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::nil()),
        email,
        display_name,
        company,
        stage: Stage::parse(&stage_str),
        first_contact: parse_datetime(&first_str),
        last_contact: parse_datetime(&last_str),
        interaction_count: interaction_count.max(0) as u32,
        sentiment_score: sentiment_score as f32,
        conversion_probability: conversion_probability as f32,
        notes,
    })
}

/// Column order: 0:id, 1:customer_id, 2:direction, 3:subject, 4:body,
/// 5:intent, 6:confidence, 7:created_at
fn row_to_interaction(row: &libsql::Row) -> Result<Interaction, DatabaseError> {
    let id_str: String = row.get(0).map_err(query_err)?;
    let customer_str: String = row.get(1).map_err(query_err)?;
    let direction_str: String = row.get(2).map_err(query_err)?;
    let subject: String = row.get(3).map_err(query_err)?;
    let body: String = row.get(4).map_err(query_err)?;
    let intent_str: String = row.get(5).map_err(query_err)?;
    let confidence: Option<f64> = row.get(6).map_err(query_err)?;
    let created_str: String = row.get(7).map_err(query_err)?;

    Ok(Interaction {
        id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::nil()),
        customer_id: Uuid::parse_str(&customer_str).unwrap_or_else(|_| Uuid::nil()),
        direction: Direction::parse(&direction_str),
        subject,
        body,
        intent: Intent::parse(&intent_str),
        confidence: confidence.map(|c| c as f32),
        created_at: parse_datetime(&created_str),
    })
}

/// Column order: 0:id, 1:external_id, 2:sender, 3:sender_name, 4:subject,
/// 5:content, 6:thread_id, 7:received_at, 8:status, 9:processed_at,
/// 10:created_at, 11:updated_at
fn row_to_message(row: &libsql::Row) -> Result<StoredMessage, DatabaseError> {
    let status_str: String = row.get(8).map_err(query_err)?;
    let received_str: String = row.get(7).map_err(query_err)?;
    let processed_str: Option<String> = row.get(9).map_err(query_err)?;
    let created_str: String = row.get(10).map_err(query_err)?;
    let updated_str: String = row.get(11).map_err(query_err)?;

    Ok(StoredMessage {
        id: row.get(0).map_err(query_err)?,
        external_id: row.get(1).map_err(query_err)?,
        sender: row.get(2).map_err(query_err)?,
        sender_name: row.get(3).map_err(query_err)?,
        subject: row.get(4).map_err(query_err)?,
        content: row.get(5).map_err(query_err)?,
        thread_id: row.get(6).map_err(query_err)?,
        received_at: parse_datetime(&received_str),
        status: str_to_msg_status(&status_str),
        processed_at: parse_optional_datetime(&processed_str),
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    })
}

fn query_err(e: libsql::Error) -> DatabaseError {
    DatabaseError::Query(e.to_string())
}

const CUSTOMER_COLUMNS: &str = "id, email, display_name, company, stage, first_contact, \
     last_contact, interaction_count, sentiment_score, conversion_probability, notes";

const MESSAGE_COLUMNS: &str = "id, external_id, sender, sender_name, subject, content, \
     thread_id, received_at, status, processed_at, created_at, updated_at";

// ── Database trait implementation ───────────────────────────────────

#[async_trait]
impl Database for LibSqlBackend {
    async fn get_customer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Customer>, DatabaseError> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE email = ?1");
        let mut rows = self
            .conn()
            .query(&sql, params![email.to_lowercase()])
            .await
            .map_err(query_err)?;

        match rows.next().await.map_err(query_err)? {
            Some(row) => Ok(Some(row_to_customer(&row)?)),
            None => Ok(None),
        }
    }

    async fn insert_customer(&self, customer: &Customer) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO customers (id, email, display_name, company, stage,
                    first_contact, last_contact, interaction_count,
                    sentiment_score, conversion_probability, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    customer.id.to_string(),
                    customer.email.clone(),
                    customer.display_name.clone(),
                    customer.company.clone(),
                    customer.stage.as_str(),
                    customer.first_contact.to_rfc3339(),
                    customer.last_contact.to_rfc3339(),
                    customer.interaction_count as i64,
                    customer.sentiment_score as f64,
                    customer.conversion_probability as f64,
                    customer.notes.clone(),
                ],
            )
            .await
            .map_err(|e| {
                let msg = e.to_string();
                if msg.contains("UNIQUE") {
                    DatabaseError::Constraint(format!("duplicate customer email: {msg}"))
                } else {
                    DatabaseError::Query(msg)
                }
            })?;

        debug!(id = %customer.id, email = %customer.email, "Customer inserted");
        Ok(())
    }

    async fn update_customer(&self, customer: &Customer) -> Result<(), DatabaseError> {
        let affected = self
            .conn()
            .execute(
                "UPDATE customers SET display_name = ?2, company = ?3, stage = ?4,
                    last_contact = ?5, interaction_count = ?6,
                    sentiment_score = ?7, conversion_probability = ?8, notes = ?9
                 WHERE id = ?1",
                params![
                    customer.id.to_string(),
                    customer.display_name.clone(),
                    customer.company.clone(),
                    customer.stage.as_str(),
                    customer.last_contact.to_rfc3339(),
                    customer.interaction_count as i64,
                    customer.sentiment_score as f64,
                    customer.conversion_probability as f64,
                    customer.notes.clone(),
                ],
            )
            .await
            .map_err(query_err)?;

        if affected == 0 {
            return Err(DatabaseError::NotFound {
                entity: "customer".into(),
                id: customer.id.to_string(),
            });
        }
        Ok(())
    }

    async fn insert_interaction(&self, interaction: &Interaction) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO interactions (id, customer_id, direction, subject,
                    body, intent, confidence, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    interaction.id.to_string(),
                    interaction.customer_id.to_string(),
                    interaction.direction.as_str(),
                    interaction.subject.clone(),
                    interaction.body.clone(),
                    interaction.intent.as_str(),
                    interaction.confidence.map(|c| c as f64),
                    interaction.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(query_err)?;

        debug!(
            id = %interaction.id,
            customer = %interaction.customer_id,
            direction = interaction.direction.as_str(),
            "Interaction recorded"
        );
        Ok(())
    }

    async fn list_interactions(
        &self,
        customer_id: Uuid,
        limit: usize,
    ) -> Result<Vec<Interaction>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, customer_id, direction, subject, body, intent,
                        confidence, created_at
                 FROM interactions WHERE customer_id = ?1
                 ORDER BY created_at DESC LIMIT ?2",
                params![customer_id.to_string(), limit as i64],
            )
            .await
            .map_err(query_err)?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(query_err)? {
            out.push(row_to_interaction(&row)?);
        }
        Ok(out)
    }

    async fn insert_message(
        &self,
        external_id: &str,
        sender: &str,
        sender_name: Option<&str>,
        subject: Option<&str>,
        content: &str,
        thread_id: Option<&str>,
        received_at: DateTime<Utc>,
    ) -> Result<String, DatabaseError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        self.conn()
            .execute(
                "INSERT INTO messages (id, external_id, sender, sender_name, subject,
                    content, thread_id, received_at, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'pending', ?9, ?9)",
                params![
                    id.clone(),
                    external_id,
                    sender,
                    sender_name,
                    subject,
                    content,
                    thread_id,
                    received_at.to_rfc3339(),
                    now,
                ],
            )
            .await
            .map_err(|e| {
                let msg = e.to_string();
                if msg.contains("UNIQUE") {
                    DatabaseError::Constraint(format!("duplicate external_id: {msg}"))
                } else {
                    DatabaseError::Query(msg)
                }
            })?;

        debug!(id = %id, external_id, "Message staged");
        Ok(id)
    }

    async fn get_message_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<StoredMessage>, DatabaseError> {
        let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE external_id = ?1");
        let mut rows = self
            .conn()
            .query(&sql, params![external_id])
            .await
            .map_err(query_err)?;

        match rows.next().await.map_err(query_err)? {
            Some(row) => Ok(Some(row_to_message(&row)?)),
            None => Ok(None),
        }
    }

    async fn get_pending_messages(&self) -> Result<Vec<StoredMessage>, DatabaseError> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE status = 'pending'
             ORDER BY received_at ASC"
        );
        let mut rows = self.conn().query(&sql, ()).await.map_err(query_err)?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(query_err)? {
            out.push(row_to_message(&row)?);
        }
        Ok(out)
    }

    async fn update_message_status(
        &self,
        id: &str,
        status: MessageStatus,
    ) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        let processed_at = if status == MessageStatus::Processed {
            Some(now.clone())
        } else {
            None
        };

        self.conn()
            .execute(
                "UPDATE messages SET status = ?1, processed_at = ?2, updated_at = ?3
                 WHERE id = ?4",
                params![msg_status_to_str(status), processed_at, now, id],
            )
            .await
            .map_err(query_err)?;

        debug!(id, status = msg_status_to_str(status), "Message status updated");
        Ok(())
    }
}

// ── Tests ───────────────────────────────────────────────────────────
