//! Lock-guarded registry shared by concurrent handlers.
//!
//! Readers get cloned values, never references into the shared collection.
//! The only runtime mutation is binding an admin to a chat, which is written
//! back to the config file.

use std::path::{Path, PathBuf};

use tokio::sync::RwLock;

use crate::config::{Admin, Registry, Student};
use crate::error::{ReportBotError, Result};
use crate::types::ReportKind;

pub struct RegistryStore {
    inner: RwLock<Registry>,
    path: PathBuf,
}

impl RegistryStore {
    /// Wrap an already prepared registry that persists to `path`.
    pub fn new(registry: Registry, path: &Path) -> Self {
        Self {
            inner: RwLock::new(registry),
            path: path.to_path_buf(),
        }
    }

    pub async fn student(&self, user_name: &str) -> Option<Student> {
        self.inner.read().await.student(user_name).cloned()
    }

    pub async fn admin(&self, user_name: &str) -> Option<Admin> {
        self.inner.read().await.admin(user_name).cloned()
    }

    pub async fn admin_for_group(&self, group: &str) -> Option<Admin> {
        self.inner.read().await.admin_for_group(group).cloned()
    }

    pub async fn report_kinds(&self) -> Vec<ReportKind> {
        self.inner.read().await.report_kinds()
    }

    pub async fn work_items(&self) -> Vec<String> {
        self.inner.read().await.work.clone()
    }

    /// Registered work item matching `name` after trimming.
    pub async fn work_item(&self, name: &str) -> Option<String> {
        self.inner.read().await.work_item(name).map(String::from)
    }

    pub async fn report_kind(&self, extension: &str) -> Option<ReportKind> {
        self.inner.read().await.report_kind(extension)
    }

    /// Record the chat an admin writes from. Returns `true` when the binding
    /// changed and was persisted, `false` when it was already current or the
    /// user is not an admin.
    ///
    /// The change is written to disk first and only then applied in memory,
    /// so a failed save leaves the old binding in place.
    pub async fn bind_admin_chat(&self, user_name: &str, chat_id: i64) -> Result<bool> {
        let mut registry = self.inner.write().await;
        let Some(index) = registry
            .admin
            .iter()
            .position(|a| a.user.eq_ignore_ascii_case(user_name))
        else {
            return Ok(false);
        };
        let previous = registry.admin[index].chat_id;
        if previous == chat_id {
            return Ok(false);
        }

        let mut updated = registry.clone();
        updated.admin[index].chat_id = chat_id;
        let path = self.path.clone();
        let updated = tokio::task::spawn_blocking(move || updated.save_to(&path).map(|()| updated))
            .await
            .map_err(|e| ReportBotError::Storage(format!("Config save task failed: {e}")))??;

        tracing::info!(
            "🔗 Change admin [{}] chat ID [{} => {}]",
            updated.admin[index].user,
            previous,
            chat_id
        );
        *registry = updated;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReportType;

    fn registry() -> Registry {
        Registry {
            work: vec!["lab1".into()],
            report_type: vec![ReportType {
                format: ".pdf".into(),
                max_size_mb: 1,
                notify: false,
            }],
            admin: vec![Admin {
                group: "g1".into(),
                user: "Teacher".into(),
                chat_id: 0,
            }],
            ..Registry::default()
        }
    }

    #[tokio::test]
    async fn test_bind_admin_chat_persists() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.yaml");
        let store = RegistryStore::new(registry(), &path);

        assert!(store.bind_admin_chat("teacher", 777).await.unwrap());
        assert_eq!(store.admin_for_group("g1").await.unwrap().chat_id, 777);

        let on_disk = Registry::load_from(&path).unwrap();
        assert_eq!(on_disk.admin[0].chat_id, 777);

        // Same chat again is a no-op.
        assert!(!store.bind_admin_chat("TEACHER", 777).await.unwrap());
    }

    #[tokio::test]
    async fn test_bind_unknown_admin() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.yaml");
        let store = RegistryStore::new(registry(), &path);

        assert!(!store.bind_admin_chat("stranger", 1).await.unwrap());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_reads_are_copies() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RegistryStore::new(registry(), &tmp.path().join("c.yaml"));

        let mut admin = store.admin("teacher").await.unwrap();
        admin.chat_id = 99;
        assert_eq!(store.admin("teacher").await.unwrap().chat_id, 0);
        assert_eq!(store.report_kinds().await[0].extension, "pdf");
        assert_eq!(store.work_items().await, vec!["lab1".to_string()]);
    }

    #[tokio::test]
    async fn test_lookups_delegate_to_registry() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RegistryStore::new(registry(), &tmp.path().join("c.yaml"));

        assert_eq!(store.work_item("  lab1 ").await.as_deref(), Some("lab1"));
        assert_eq!(store.work_item("lab2").await, None);
        assert_eq!(store.report_kind(".PDF").await.unwrap().extension, "pdf");
        assert!(store.report_kind("docx").await.is_none());
    }

    #[tokio::test]
    async fn test_failed_save_keeps_old_binding() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();
        let store = RegistryStore::new(registry(), &blocker.join("config.yaml"));

        assert!(store.bind_admin_chat("teacher", 777).await.is_err());
        assert_eq!(store.admin("teacher").await.unwrap().chat_id, 0);

        // Still treated as a change on the next message.
        assert!(store.bind_admin_chat("teacher", 777).await.is_err());
    }
}
