//! The message processing pipeline — normalize, resolve, complete, format,
//! send, record.

pub mod context;
pub mod format;
pub mod processor;
pub mod responder;
pub mod types;

pub use processor::{drain_pending, spawn_processor};
pub use responder::Responder;
pub use types::{NormalizedMessage, PassOutcome};
