//! Persistence layer — libSQL-backed storage for customers, interactions,
//! and staged inbound messages.

pub mod libsql_backend;
pub mod migrations;
pub mod model;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use model::{Customer, Direction, Interaction, Stage};
pub use traits::{Database, MessageStatus, StoredMessage};
