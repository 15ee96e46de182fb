//! Routes incoming chat messages to the help, stat, admin and intake handlers.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use reportbot_channels::TelegramChannel;
use reportbot_core::config::Student;
use reportbot_core::error::Result;
use reportbot_core::store::RegistryStore;
use reportbot_core::traits::Notifier;
use reportbot_core::types::IncomingMessage;
use reportbot_tracker::text::help_text;
use reportbot_tracker::{stats, DocumentIntake};

/// Shown to senders that are not registered participants.
const FORBIDDEN_PICTURE: &str = "https://http.cat/403";

/// Replies tied to a specific incoming message.
#[async_trait]
pub trait ChatReplies: Notifier {
    async fn reply(&self, chat_id: i64, message_id: i64, text: &str, markdown: bool) -> Result<()>;

    async fn send_picture(&self, chat_id: i64, url: &str) -> Result<()>;
}

#[async_trait]
impl ChatReplies for TelegramChannel {
    async fn reply(&self, chat_id: i64, message_id: i64, text: &str, markdown: bool) -> Result<()> {
        self.send_message(chat_id, text, markdown, Some(message_id)).await
    }

    async fn send_picture(&self, chat_id: i64, url: &str) -> Result<()> {
        self.send_photo(chat_id, url).await
    }
}

pub struct Dispatcher<C> {
    channel: Arc<C>,
    registry: Arc<RegistryStore>,
    intake: Arc<DocumentIntake>,
}

impl<C: ChatReplies + 'static> Dispatcher<C> {
    pub fn new(channel: Arc<C>, registry: Arc<RegistryStore>, intake: Arc<DocumentIntake>) -> Self {
        Self {
            channel,
            registry,
            intake,
        }
    }

    /// Handle every message of `messages` on its own task until the stream ends.
    pub async fn run<S>(self: Arc<Self>, mut messages: S)
    where
        S: Stream<Item = IncomingMessage> + Unpin,
    {
        while let Some(msg) = messages.next().await {
            let this = self.clone();
            tokio::spawn(async move { this.handle(msg).await });
        }
        tracing::info!("Message stream closed");
    }

    pub async fn handle(&self, msg: IncomingMessage) {
        tracing::info!("💬 Receive message from [{}]", msg.username);

        if self.registry.admin(&msg.username).await.is_some() {
            if let Err(e) = self.registry.bind_admin_chat(&msg.username, msg.chat_id).await {
                tracing::error!("❌ Failed to persist admin chat binding: {e}");
            }
        }

        let Some(student) = self.registry.student(&msg.username).await else {
            tracing::warn!("Unauthorized message from [{}]", msg.username);
            self.unauthorized(&msg).await;
            return;
        };

        match msg.command() {
            Some("help") => self.help(&msg).await,
            Some("stat") => self.stat(&student, &msg).await,
            _ => self.receive_document(&student, &msg).await,
        }
    }

    async fn unauthorized(&self, msg: &IncomingMessage) {
        if let Err(e) = self.channel.send_picture(msg.chat_id, FORBIDDEN_PICTURE).await {
            tracing::warn!("⚠️ Failed to answer unauthorized sender: {e}");
        }
    }

    async fn help(&self, msg: &IncomingMessage) {
        let text = help_text(
            &self.registry.work_items().await,
            &self.registry.report_kinds().await,
        );
        self.send(msg.chat_id, &text).await;
    }

    async fn stat(&self, student: &Student, msg: &IncomingMessage) {
        tracing::info!("📊 Collect statistic for {}", student.user_name);
        let works = self.registry.work_items().await;
        let kinds = self.registry.report_kinds().await;

        let text = match stats::collect(student, &works, &kinds) {
            Ok(progress) => stats::render(student, &progress),
            Err(e) => {
                tracing::error!("❌ Statistic for {} failed: {e}", student.user_name);
                "Internal error: wait some time and retry".to_string()
            }
        };
        self.send(msg.chat_id, &text).await;
    }

    async fn receive_document(&self, student: &Student, msg: &IncomingMessage) {
        let text = match &msg.document {
            None => {
                tracing::info!("No attached documents");
                let formats = self
                    .registry
                    .report_kinds()
                    .await
                    .iter()
                    .map(|k| k.extension.clone())
                    .collect::<Vec<_>>()
                    .join("/");
                format!("Please, pin report in {formats} format.")
            }
            Some(document) => {
                let declared = msg.caption.as_deref().unwrap_or_default();
                self.intake
                    .receive(student, msg.chat_id, declared, document)
                    .await
                    .reply_text()
            }
        };

        if let Err(e) = self.channel.reply(msg.chat_id, msg.message_id, &text, false).await {
            tracing::warn!("⚠️ Failed to reply to {}: {e}", student.user_name);
        }
    }

    async fn send(&self, chat_id: i64, text: &str) {
        if let Err(e) = self.channel.send(chat_id, text, true).await {
            tracing::warn!("⚠️ Failed to send message to {chat_id}: {e}");
        }
    }
}
