//! # ReportBot Core
//!
//! Shared building blocks for the report receiver:
//! - `types`: report kinds, submission keys, incoming chat messages
//! - `traits`: the `Notifier` and `FileTransport` seams
//! - `config`: YAML registry of participants, admins, work items and report types
//! - `store`: lock-guarded registry with explicit read/update operations

pub mod config;
pub mod error;
pub mod slug;
pub mod store;
pub mod traits;
pub mod types;

pub use config::{Admin, Registry, ReminderConfig, ReportType, Student};
pub use error::{ReportBotError, Result};
pub use store::RegistryStore;
pub use traits::{FileTransport, Notifier};
pub use types::{IncomingDocument, IncomingMessage, ReportKind, SubmissionKey};
