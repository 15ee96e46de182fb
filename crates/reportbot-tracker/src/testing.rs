//! In-memory transport fakes for unit tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reportbot_core::error::{ReportBotError, Result};
use reportbot_core::traits::{FileTransport, Notifier};

/// Records every message; optionally fails every delivery.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(i64, String, bool)>>,
    shared: Mutex<Vec<(i64, String, String)>>,
    attempts: AtomicUsize,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub fn messages(&self) -> Vec<(i64, String, bool)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn shared(&self) -> Vec<(i64, String, String)> {
        self.shared.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, chat_id: i64, text: &str, formatted: bool) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ReportBotError::Channel("chat unreachable".into()));
        }
        self.messages
            .lock()
            .unwrap()
            .push((chat_id, text.to_string(), formatted));
        Ok(())
    }

    async fn share_document(&self, chat_id: i64, file_id: &str, caption: &str) -> Result<()> {
        self.shared
            .lock()
            .unwrap()
            .push((chat_id, file_id.to_string(), caption.to_string()));
        Ok(())
    }
}

/// Serves file contents from memory, keyed by file id. Each download writes
/// half the content, yields, then writes the rest.
#[derive(Default)]
pub struct FakeTransport {
    files: Mutex<HashMap<String, Vec<u8>>>,
    fail_download: bool,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn broken() -> Arc<Self> {
        Arc::new(Self {
            fail_download: true,
            ..Self::default()
        })
    }

    pub fn put(&self, file_id: &str, content: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(file_id.to_string(), content.to_vec());
    }
}

#[async_trait]
impl FileTransport for FakeTransport {
    async fn resolve_download_url(&self, file_id: &str) -> Result<String> {
        if self.files.lock().unwrap().contains_key(file_id) {
            Ok(format!("mem://{file_id}"))
        } else {
            Err(ReportBotError::Channel(format!("unknown file {file_id}")))
        }
    }

    async fn download(&self, url: &str, destination: &Path) -> Result<()> {
        let file_id = url.trim_start_matches("mem://");
        let content = self
            .files
            .lock()
            .unwrap()
            .get(file_id)
            .cloned()
            .ok_or_else(|| ReportBotError::Storage(format!("unknown url {url}")))?;
        std::fs::write(destination, &content[..content.len() / 2])?;
        // Let other transfers run while this one is half written.
        tokio::task::yield_now().await;
        if self.fail_download {
            return Err(ReportBotError::Storage("connection reset".into()));
        }
        std::fs::write(destination, content)?;
        Ok(())
    }
}
