//! Submission watchers remind a participant about missing reports until the
//! submission is complete or the reminder budget runs out.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use reportbot_core::error::ReportBotError;
use reportbot_core::traits::Notifier;
use reportbot_core::types::{ReportKind, SubmissionKey};
use reportbot_scheduler::{schedule, RetryHandle, RetryPolicy};

use crate::completion::evaluate;
use crate::text::reminder_text;

/// Start a watcher for `key` that reminds `chat_id`.
///
/// Each attempt re-evaluates the directory. A complete submission ends the
/// job silently; an incomplete one sends the status line and keeps going; a
/// directory read failure is handed to the scheduler as a retryable error.
/// Failed deliveries are logged and do not affect the schedule.
pub fn watch(
    key: SubmissionKey,
    kinds: Vec<ReportKind>,
    chat_id: i64,
    notifier: Arc<dyn Notifier>,
    policy: RetryPolicy,
) -> RetryHandle {
    tracing::info!("👀 Run notify scheduler for submission {}", key);

    let label = key.to_string();
    let key = Arc::new(key);
    let kinds: Arc<[ReportKind]> = kinds.into();

    schedule(label, policy, move |attempt| {
        let key = key.clone();
        let kinds = kinds.clone();
        let notifier = notifier.clone();
        async move {
            let status = evaluate(&key, &kinds)?;
            if status.all_present() {
                tracing::info!("🎉 Submission {} complete", key);
                return Ok(true);
            }
            if attempt.token.is_cancelled() {
                return Ok(false);
            }

            let text = reminder_text(&key.work_item, &status);
            if let Err(e) = notifier.send(chat_id, &text, true).await {
                tracing::warn!("⚠️ Reminder for {} not delivered: {e}", key);
            } else {
                tracing::debug!(
                    "📣 Reminder {}/{} sent for {}",
                    attempt.number,
                    attempt.max_attempts,
                    key
                );
            }
            Ok::<_, ReportBotError>(false)
        }
    })
}

/// At most one active watcher per submission.
///
/// Starting a watcher for a key that already has one cancels the old job, so
/// repeated uploads never stack reminders. Finished jobs are pruned lazily.
#[derive(Default)]
pub struct WatcherRegistry {
    active: Mutex<HashMap<SubmissionKey, RetryHandle>>,
}

impl WatcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the watcher for `key` (if any) and start a fresh one.
    pub fn start(
        &self,
        key: SubmissionKey,
        kinds: Vec<ReportKind>,
        chat_id: i64,
        notifier: Arc<dyn Notifier>,
        policy: RetryPolicy,
    ) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        active.retain(|_, handle| !handle.is_finished());
        if let Some(previous) = active.remove(&key) {
            tracing::info!("♻️ Superseding running watcher for {}", key);
            previous.cancel();
        }
        let handle = watch(key.clone(), kinds, chat_id, notifier, policy);
        active.insert(key, handle);
    }

    /// Cancel the watcher for `key`. Returns whether one was running.
    pub fn cancel(&self, key: &SubmissionKey) -> bool {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        match active.remove(key) {
            Some(handle) => {
                let running = !handle.is_finished();
                handle.cancel();
                running
            }
            None => false,
        }
    }

    /// Number of watchers still running.
    pub fn active_count(&self) -> usize {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        active.retain(|_, handle| !handle.is_finished());
        active.len()
    }

    /// Cancel every watcher, e.g. on shutdown.
    pub fn cancel_all(&self) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, handle) in active.drain() {
            handle.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingNotifier;
    use reportbot_scheduler::RetryOutcome;
    use std::path::Path;
    use std::time::Duration;

    const UNIT: Duration = Duration::from_secs(30);
    const MB: u64 = 1024 * 1024;

    fn kinds() -> Vec<ReportKind> {
        vec![
            ReportKind::new(".pdf", 10 * MB, false),
            ReportKind::new(".docx", 10 * MB, false),
        ]
    }

    fn key(root: &Path) -> SubmissionKey {
        let key = SubmissionKey::new("alice", "lab1", root);
        std::fs::create_dir_all(key.dir()).unwrap();
        key
    }

    #[tokio::test(start_paused = true)]
    async fn test_reminds_until_budget_exhausted() {
        let tmp = tempfile::tempdir().unwrap();
        let key = key(tmp.path());
        std::fs::write(key.dir().join("report.pdf"), b"pdf").unwrap();
        let notifier = RecordingNotifier::new();

        let handle = watch(key, kinds(), 42, notifier.clone(), RetryPolicy::new(UNIT, 5));
        assert_eq!(
            handle.join().await.unwrap(),
            RetryOutcome::Exhausted { attempts: 5 }
        );

        let sent = notifier.messages();
        assert_eq!(sent.len(), 5);
        for (chat_id, text, formatted) in &sent {
            assert_eq!(*chat_id, 42);
            assert!(*formatted);
            assert!(text.contains("pdf: ✅ | docx: ❌"), "{text}");
            assert!(text.contains("*[lab1]*"));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_silently_once_complete() {
        let tmp = tempfile::tempdir().unwrap();
        let key = key(tmp.path());
        let dir = key.dir();
        std::fs::write(dir.join("report.pdf"), b"pdf").unwrap();
        let notifier = RecordingNotifier::new();

        let handle = watch(key, kinds(), 42, notifier.clone(), RetryPolicy::new(UNIT, 5));

        // First reminder at 30s; the missing file lands before the 90s check.
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(notifier.messages().len(), 1);
        std::fs::write(dir.join("report.docx"), b"docx").unwrap();

        assert_eq!(
            handle.join().await.unwrap(),
            RetryOutcome::Completed { attempt: 2 }
        );
        assert_eq!(notifier.messages().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreadable_directory_consumes_attempts() {
        let tmp = tempfile::tempdir().unwrap();
        let key = key(tmp.path());
        std::fs::remove_dir_all(key.dir()).unwrap();
        let notifier = RecordingNotifier::new();

        let handle = watch(key, kinds(), 42, notifier.clone(), RetryPolicy::new(UNIT, 3));
        assert_eq!(
            handle.join().await.unwrap(),
            RetryOutcome::Exhausted { attempts: 3 }
        );
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delivery_failure_is_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let key = key(tmp.path());
        let notifier = RecordingNotifier::failing();

        let handle = watch(key, kinds(), 42, notifier.clone(), RetryPolicy::new(UNIT, 4));
        assert_eq!(
            handle.join().await.unwrap(),
            RetryOutcome::Exhausted { attempts: 4 }
        );
        assert_eq!(notifier.attempts(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_registry_supersedes_watcher_for_same_key() {
        let tmp = tempfile::tempdir().unwrap();
        let key = key(tmp.path());
        let notifier = RecordingNotifier::new();
        let registry = WatcherRegistry::new();

        registry.start(key.clone(), kinds(), 42, notifier.clone(), RetryPolicy::new(UNIT, 5));
        tokio::time::sleep(Duration::from_secs(10)).await;
        registry.start(key.clone(), kinds(), 42, notifier.clone(), RetryPolicy::new(UNIT, 5));
        assert_eq!(registry.active_count(), 1);

        // The first watcher would have fired at 30s, the replacement fires at 40s.
        tokio::time::sleep(Duration::from_secs(25)).await;
        assert!(notifier.messages().is_empty());
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(notifier.messages().len(), 1);

        assert!(registry.cancel(&key));
        assert_eq!(registry.active_count(), 0);
        assert!(!registry.cancel(&key));
    }

    #[tokio::test(start_paused = true)]
    async fn test_registry_tracks_keys_independently() {
        let tmp = tempfile::tempdir().unwrap();
        let first = key(tmp.path());
        let second = SubmissionKey::new("bob", "lab1", tmp.path().join("bob"));
        std::fs::create_dir_all(second.dir()).unwrap();
        std::fs::write(second.dir().join("report.pdf"), b"pdf").unwrap();
        std::fs::write(second.dir().join("report.docx"), b"docx").unwrap();
        let notifier = RecordingNotifier::new();
        let registry = WatcherRegistry::new();

        registry.start(first, kinds(), 1, notifier.clone(), RetryPolicy::new(UNIT, 5));
        registry.start(second, kinds(), 2, notifier.clone(), RetryPolicy::new(UNIT, 5));
        assert_eq!(registry.active_count(), 2);

        // bob is complete and finishes on the first check.
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(registry.active_count(), 1);
        let sent = notifier.messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 1);

        registry.cancel_all();
        tokio::time::sleep(UNIT * 20).await;
        assert_eq!(notifier.messages().len(), 1);
        assert_eq!(registry.active_count(), 0);
    }
}
