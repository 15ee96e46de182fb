//! Telegram Bot channel — long polling, message sending and file download via Bot API.

use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use reportbot_core::error::{ReportBotError, Result};
use reportbot_core::traits::{FileTransport, Notifier};
use reportbot_core::types::{IncomingDocument, IncomingMessage};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

/// Telegram channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_poll_interval() -> u64 {
    1
}
fn default_api_base() -> String {
    "https://api.telegram.org".into()
}

impl TelegramConfig {
    pub fn new(bot_token: &str, poll_interval: u64) -> Self {
        Self {
            bot_token: bot_token.to_string(),
            poll_interval,
            api_base: default_api_base(),
        }
    }
}

/// Telegram Bot channel. Shared behind an `Arc` by the poller and every handler.
pub struct TelegramChannel {
    config: TelegramConfig,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.config.api_base, self.config.bot_token, method
        )
    }

    /// Direct download URL of an uploaded file.
    pub fn file_url(&self, file_path: &str) -> String {
        format!(
            "{}/file/bot{}/{}",
            self.config.api_base, self.config.bot_token, file_path
        )
    }

    /// POST a Bot API method and unwrap its `result`.
    async fn call<T: DeserializeOwned>(&self, method: &str, body: serde_json::Value) -> Result<T> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(&body)
            .send()
            .await
            .map_err(|e| ReportBotError::Channel(format!("Telegram {method} failed: {e}")))?;

        let body: TelegramApiResponse<T> = response
            .json()
            .await
            .map_err(|e| ReportBotError::Channel(format!("Invalid Telegram {method} response: {e}")))?;
        body.into_result(method)
    }

    /// Get bot info.
    pub async fn get_me(&self) -> Result<TelegramUser> {
        self.call("getMe", serde_json::json!({})).await
    }

    /// Get updates after `offset` using long polling.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<TelegramUpdate>> {
        self.call(
            "getUpdates",
            serde_json::json!({
                "offset": offset,
                "timeout": 30,
                "allowed_updates": ["message"],
            }),
        )
        .await
    }

    /// Send a text message, optionally as Markdown and as a reply.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        markdown: bool,
        reply_to: Option<i64>,
    ) -> Result<()> {
        let mut body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        if markdown {
            body["parse_mode"] = "Markdown".into();
        }
        if let Some(message_id) = reply_to {
            body["reply_to_message_id"] = message_id.into();
        }
        self.call::<serde_json::Value>("sendMessage", body).await?;
        Ok(())
    }

    /// Re-send an already uploaded document by its file id.
    pub async fn send_document(&self, chat_id: i64, file_id: &str, caption: &str) -> Result<()> {
        self.call::<serde_json::Value>(
            "sendDocument",
            serde_json::json!({
                "chat_id": chat_id,
                "document": file_id,
                "caption": caption,
            }),
        )
        .await?;
        Ok(())
    }

    /// Send a picture by URL.
    pub async fn send_photo(&self, chat_id: i64, url: &str) -> Result<()> {
        self.call::<serde_json::Value>(
            "sendPhoto",
            serde_json::json!({
                "chat_id": chat_id,
                "photo": url,
            }),
        )
        .await?;
        Ok(())
    }

    /// Look up the storage path of an uploaded file.
    pub async fn get_file(&self, file_id: &str) -> Result<TelegramFile> {
        self.call("getFile", serde_json::json!({ "file_id": file_id }))
            .await
    }

    /// Stream `url` into `destination`, truncating any existing file.
    pub async fn download_to(&self, url: &str, destination: &Path) -> Result<()> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ReportBotError::Storage(format!("Download failed: {e}")))?;
        if !response.status().is_success() {
            return Err(ReportBotError::Storage(format!(
                "Download failed with status {}",
                response.status()
            )));
        }

        let mut file = tokio::fs::File::create(destination).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ReportBotError::Storage(format!("Download interrupted: {e}")))?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(())
    }

    /// Start the polling loop and return a stream of incoming messages.
    pub fn start_polling(self: Arc<Self>) -> TelegramPollingStream {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            tracing::info!("Telegram polling loop started");
            let mut offset = 0;

            loop {
                match self.get_updates(offset).await {
                    Ok(updates) => {
                        for update in updates {
                            offset = offset.max(update.update_id + 1);
                            let Some(msg) = update.to_incoming() else {
                                continue;
                            };
                            if tx.send(msg).is_err() {
                                tracing::info!("Telegram polling stopped (receiver dropped)");
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!("Telegram polling error: {e}");
                        tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;
                    }
                }

                tokio::time::sleep(tokio::time::Duration::from_secs(self.config.poll_interval))
                    .await;
            }
        });

        TelegramPollingStream { rx }
    }
}

/// Stream of incoming Telegram messages from polling.
pub struct TelegramPollingStream {
    rx: tokio::sync::mpsc::UnboundedReceiver<IncomingMessage>,
}

impl Stream for TelegramPollingStream {
    type Item = IncomingMessage;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

#[async_trait]
impl Notifier for TelegramChannel {
    async fn send(&self, chat_id: i64, text: &str, formatted: bool) -> Result<()> {
        self.send_message(chat_id, text, formatted, None).await
    }

    async fn share_document(&self, chat_id: i64, file_id: &str, caption: &str) -> Result<()> {
        self.send_document(chat_id, file_id, caption).await
    }
}

#[async_trait]
impl FileTransport for TelegramChannel {
    async fn resolve_download_url(&self, file_id: &str) -> Result<String> {
        let file = self.get_file(file_id).await?;
        let path = file
            .file_path
            .ok_or_else(|| ReportBotError::Channel(format!("No file path for {file_id}")))?;
        Ok(self.file_url(&path))
    }

    async fn download(&self, url: &str, destination: &Path) -> Result<()> {
        self.download_to(url, destination).await
    }
}

// --- Telegram API Types ---

#[derive(Debug, Deserialize)]
pub struct TelegramApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

impl<T> TelegramApiResponse<T> {
    fn into_result(self, method: &str) -> Result<T> {
        if !self.ok {
            return Err(ReportBotError::Channel(format!(
                "Telegram API error in {method}: {}",
                self.description.unwrap_or_default()
            )));
        }
        self.result
            .ok_or_else(|| ReportBotError::Channel(format!("Empty Telegram {method} result")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub from: Option<TelegramUser>,
    pub chat: TelegramChat,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub document: Option<TelegramDocument>,
    pub date: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramDocument {
    pub file_id: String,
    pub file_name: Option<String>,
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramFile {
    pub file_id: String,
    pub file_size: Option<u64>,
    pub file_path: Option<String>,
}

impl TelegramUpdate {
    /// Convert to a ReportBot IncomingMessage. Bot senders are skipped.
    pub fn to_incoming(&self) -> Option<IncomingMessage> {
        let msg = self.message.as_ref()?;
        let from = msg.from.as_ref()?;
        if from.is_bot {
            return None;
        }

        Some(IncomingMessage {
            chat_id: msg.chat.id,
            message_id: msg.message_id,
            username: from.username.clone().unwrap_or_default(),
            text: msg.text.clone(),
            caption: msg.caption.clone(),
            document: msg.document.as_ref().map(|d| IncomingDocument {
                file_id: d.file_id.clone(),
                file_name: d.file_name.clone().unwrap_or_default(),
                file_size: d.file_size.unwrap_or(0),
            }),
        })
    }
}
