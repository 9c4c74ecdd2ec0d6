//! Unified `Database` trait — single async interface for all persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::store::model::{Customer, Interaction};

/// Status of a staged inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStatus {
    /// Awaiting a pipeline pass.
    Pending,
    /// Pipeline pass completed and a reply went out.
    Processed,
    /// Pipeline pass failed; kept for inspection.
    Failed,
}

/// A staged inbound message, persisted between poll and pipeline pass.
#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub id: String,
    /// Channel-native Message-ID header, used for dedup.
    pub external_id: String,
    pub sender: String,
    pub sender_name: Option<String>,
    pub subject: Option<String>,
    pub content: String,
    /// Thread-correlation value (References/In-Reply-To, or subject fallback).
    pub thread_id: Option<String>,
    pub received_at: DateTime<Utc>,
    pub status: MessageStatus,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Backend-agnostic database trait covering customers, interactions,
/// and staged messages.
#[async_trait]
pub trait Database: Send + Sync {
    // ── Customers ───────────────────────────────────────────────────

    /// Look up a customer by email address (case-insensitive).
    /// Returns zero or one record.
    async fn get_customer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Customer>, DatabaseError>;

    /// Insert a new customer record.
    async fn insert_customer(&self, customer: &Customer) -> Result<(), DatabaseError>;

    /// Update an existing customer by id. Errors with `NotFound` if absent.
    async fn update_customer(&self, customer: &Customer) -> Result<(), DatabaseError>;

    // ── Interactions ────────────────────────────────────────────────

    /// Append an interaction record. The referenced customer must exist.
    async fn insert_interaction(&self, interaction: &Interaction) -> Result<(), DatabaseError>;

    /// List a customer's interactions, most recent first.
    async fn list_interactions(
        &self,
        customer_id: Uuid,
        limit: usize,
    ) -> Result<Vec<Interaction>, DatabaseError>;

    // ── Staged messages ─────────────────────────────────────────────

    /// Stage a new inbound message. Returns the generated UUID string.
    #[allow(clippy::too_many_arguments)]
    async fn insert_message(
        &self,
        external_id: &str,
        sender: &str,
        sender_name: Option<&str>,
        subject: Option<&str>,
        content: &str,
        thread_id: Option<&str>,
        received_at: DateTime<Utc>,
    ) -> Result<String, DatabaseError>;

    /// Look up a staged message by its Message-ID header.
    async fn get_message_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<StoredMessage>, DatabaseError>;

    /// Get all pending staged messages, oldest first.
    async fn get_pending_messages(&self) -> Result<Vec<StoredMessage>, DatabaseError>;

    /// Update a staged message's status.
    async fn update_message_status(
        &self,
        id: &str,
        status: MessageStatus,
    ) -> Result<(), DatabaseError>;
}
