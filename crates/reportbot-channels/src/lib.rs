//! # ReportBot Channels
//! Chat transport implementations.
//!
//! Telegram is the only channel: it delivers reminders (`Notifier`) and
//! fetches uploaded reports (`FileTransport`).

pub mod telegram;

pub use telegram::{TelegramChannel, TelegramConfig};
