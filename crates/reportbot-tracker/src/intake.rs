//! Document intake: validate an uploaded report, store it under its
//! canonical name and start watching the submission.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use reportbot_core::config::Student;
use reportbot_core::error::{ReportBotError, Result};
use reportbot_core::store::RegistryStore;
use reportbot_core::traits::{FileTransport, Notifier};
use reportbot_core::types::{IncomingDocument, SubmissionKey};
use reportbot_scheduler::RetryPolicy;

use crate::watcher::WatcherRegistry;

/// Result of one intake attempt. Every path through [`DocumentIntake::receive`]
/// ends in exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeOutcome {
    /// Stored at `path`; a watcher is running for the submission.
    Accepted { path: PathBuf },
    /// The caption does not name a registered work item.
    UnknownWorkItem { declared: String },
    /// The extension does not match any report kind.
    UnsupportedFormat { extension: String },
    /// Larger than the kind's limit.
    FileTooLarge { extension: String, limit_mb: u64 },
    /// Download or write failed; the sender may retry.
    StorageError { reason: String },
}

impl IntakeOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// Reply shown to the sender.
    pub fn reply_text(&self) -> String {
        match self {
            Self::Accepted { .. } => "Saved".into(),
            Self::UnknownWorkItem { .. } => {
                "Unknown work title. Please, enter the correct work name.".into()
            }
            Self::UnsupportedFormat { extension } => {
                format!("Please, pin report in valid format. Now [{}].", dotted(extension))
            }
            Self::FileTooLarge {
                extension,
                limit_mb,
            } => format!(
                "{} file size must be less than {}Mb.",
                dotted(extension),
                limit_mb
            ),
            Self::StorageError { .. } => "Internal error: wait some time and resend file".into(),
        }
    }
}

fn dotted(extension: &str) -> String {
    if extension.is_empty() {
        String::new()
    } else {
        format!(".{extension}")
    }
}

/// Receives documents and hands accepted submissions to the watchers.
pub struct DocumentIntake {
    registry: Arc<RegistryStore>,
    transport: Arc<dyn FileTransport>,
    notifier: Arc<dyn Notifier>,
    watchers: Arc<WatcherRegistry>,
    policy: RetryPolicy,
}

impl DocumentIntake {
    pub fn new(
        registry: Arc<RegistryStore>,
        transport: Arc<dyn FileTransport>,
        notifier: Arc<dyn Notifier>,
        watchers: Arc<WatcherRegistry>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            registry,
            transport,
            notifier,
            watchers,
            policy,
        }
    }

    pub fn watchers(&self) -> &Arc<WatcherRegistry> {
        &self.watchers
    }

    /// Validate and store `document` for `student`'s `declared_work_item`.
    /// Reminders about the submission go to `chat_id`.
    pub async fn receive(
        &self,
        student: &Student,
        chat_id: i64,
        declared_work_item: &str,
        document: &IncomingDocument,
    ) -> IntakeOutcome {
        tracing::info!("📥 Start document receive from {}", student.user_name);

        let Some(work_item) = self.registry.work_item(declared_work_item).await else {
            let declared = declared_work_item.trim();
            tracing::info!("Unknown work title '{}' from {}", declared, student.user_name);
            return IntakeOutcome::UnknownWorkItem {
                declared: declared.to_string(),
            };
        };

        let extension = document.extension().unwrap_or_default();
        let Some(kind) = self.registry.report_kind(&extension).await else {
            tracing::info!("Unsupported format [{}] from {}", extension, student.user_name);
            return IntakeOutcome::UnsupportedFormat { extension };
        };

        if document.file_size > kind.max_size_bytes {
            tracing::info!(
                "Large file from {}: {} bytes > {} bytes",
                student.user_name,
                document.file_size,
                kind.max_size_bytes
            );
            return IntakeOutcome::FileTooLarge {
                extension,
                limit_mb: kind.max_size_mb(),
            };
        }

        let key = SubmissionKey::new(&student.user_name, &work_item, &student.work_dir);
        let path = key.artifact_path(&kind);
        if let Err(e) = self.store(&document.file_id, &path).await {
            tracing::error!("❌ During download and save report {}: {e}", path.display());
            return IntakeOutcome::StorageError {
                reason: e.to_string(),
            };
        }
        tracing::info!("💾 Saved {} for {}", path.display(), key);

        if kind.notify {
            tokio::spawn(notify_group_admin(
                self.registry.clone(),
                self.notifier.clone(),
                student.clone(),
                key.work_item.clone(),
                document.file_id.clone(),
            ));
        }
        let kinds = self.registry.report_kinds().await;
        self.watchers
            .start(key, kinds, chat_id, self.notifier.clone(), self.policy);

        IntakeOutcome::Accepted { path }
    }

    /// Download into a uniquely named `.part` sibling of `path`, then move it
    /// over `path`. Overlapping uploads of one kind each land whole and the
    /// last rename wins; a failed transfer leaves nothing behind.
    async fn store(&self, file_id: &str, path: &Path) -> Result<()> {
        let url = self.transport.resolve_download_url(file_id).await?;
        let dir = path.parent().ok_or_else(|| {
            ReportBotError::Storage(format!("No parent directory for {}", path.display()))
        })?;

        let partial = tempfile::Builder::new()
            .prefix("report.")
            .suffix(".part")
            .tempfile_in(dir)?;
        self.transport.download(&url, partial.path()).await?;

        partial.persist(path).map_err(|e| {
            ReportBotError::Storage(format!("Failed to move {}: {}", e.file.path().display(), e.error))
        })?;
        Ok(())
    }
}

/// Share a received document with the admin of the student's group.
async fn notify_group_admin(
    registry: Arc<RegistryStore>,
    notifier: Arc<dyn Notifier>,
    student: Student,
    work_item: String,
    file_id: String,
) {
    tracing::info!("📨 Notify report from {} to group admin", student.user_name);
    let Some(admin) = registry.admin_for_group(&student.group_name).await else {
        tracing::info!("Group {} admin not found", student.group_name);
        return;
    };
    if !admin.is_linked() {
        tracing::info!("Admin {} not linked", admin.user);
        return;
    }

    let caption = format!("[{}] {} {}", work_item, student.first_name, student.last_name);
    if let Err(e) = notifier.share_document(admin.chat_id, &file_id, &caption).await {
        tracing::warn!("⚠️ Failed to notify admin {}: {e}", admin.user);
    }
}
