//! Transport seams consumed by the tracker.
//! The Telegram channel implements both; tests plug in recording fakes.

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

/// Outbound message delivery. Best effort: callers log failures and move on.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send `text` to `chat_id`. `formatted` enables Markdown rendering.
    async fn send(&self, chat_id: i64, text: &str, formatted: bool) -> Result<()>;

    /// Re-share an already uploaded document with a caption.
    async fn share_document(&self, chat_id: i64, file_id: &str, caption: &str) -> Result<()>;
}

/// Fetching files that users attached to their messages.
#[async_trait]
pub trait FileTransport: Send + Sync {
    /// Turn a transport file handle into a downloadable URL.
    async fn resolve_download_url(&self, file_id: &str) -> Result<String>;

    /// Download `url` into `destination`, replacing any existing file.
    async fn download(&self, url: &str, destination: &Path) -> Result<()>;
}
