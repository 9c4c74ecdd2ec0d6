//! Mailbox I/O — IMAP polling for inbound, SMTP via lettre for outbound.

pub mod imap;
pub mod poller;
pub mod smtp;
pub mod types;

pub use poller::spawn_mail_poller;
pub use smtp::{MailTransport, SmtpMailer};
pub use types::FetchedMail;
