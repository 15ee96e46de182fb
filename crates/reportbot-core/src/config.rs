//! ReportBot registry configuration.
//!
//! The YAML file lists participants, group admins, work items and the report
//! types every work item requires. Key names follow the historical format so
//! existing config files keep working.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{ReportBotError, Result};
use crate::slug::participant_slug;
use crate::types::{normalize_extension, ReportKind};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registry {
    #[serde(default)]
    pub student: Vec<Student>,
    #[serde(default)]
    pub admin: Vec<Admin>,
    #[serde(default)]
    pub work: Vec<String>,
    #[serde(default)]
    pub report_type: Vec<ReportType>,
    #[serde(default = "default_work_dir")]
    pub work_dir: String,
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub reminder: ReminderConfig,
    /// Seconds between Telegram polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
}

fn default_work_dir() -> String { "~/.reportbot/reports".into() }
fn default_poll_interval() -> u64 { 1 }

impl Default for Registry {
    fn default() -> Self {
        Self {
            student: Vec::new(),
            admin: Vec::new(),
            work: Vec::new(),
            report_type: Vec::new(),
            work_dir: default_work_dir(),
            bot_token: String::new(),
            reminder: ReminderConfig::default(),
            poll_interval: default_poll_interval(),
        }
    }
}

/// A participant who owes reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub second_name: String,
    pub group_name: String,
    pub user_name: String,
    /// Storage root, filled in by [`Registry::prepare_work_dirs`].
    #[serde(skip)]
    pub work_dir: PathBuf,
}

impl Student {
    pub fn full_name(&self) -> String {
        [&self.last_name, &self.first_name, &self.second_name]
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A group admin. `chat_id` is 0 until the admin writes to the bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Admin {
    pub group: String,
    pub user: String,
    #[serde(default)]
    pub chat_id: i64,
}

impl Admin {
    pub fn is_linked(&self) -> bool {
        self.chat_id != 0
    }
}

const BYTES_PER_MB: u64 = 1024 * 1024;

/// A required report type as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportType {
    /// Extension, conventionally with a leading dot (`.pdf`).
    pub format: String,
    pub max_size_mb: u64,
    #[serde(default)]
    pub notify: bool,
}

impl ReportType {
    pub fn kind(&self) -> ReportKind {
        ReportKind::new(&self.format, self.max_size_mb.saturating_mul(BYTES_PER_MB), self.notify)
    }
}

/// Reminder schedule for submission watchers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_attempts() -> u32 { 5 }
fn default_interval_secs() -> u64 { 30 }

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            interval_secs: default_interval_secs(),
        }
    }
}

impl Registry {
    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ReportBotError::Config(format!("Failed to read config {}: {e}", path.display())))?;
        let registry: Self = serde_yaml::from_str(&content)
            .map_err(|e| ReportBotError::Config(format!("Failed to parse config: {e}")))?;
        registry.validate()?;
        Ok(registry)
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".reportbot")
            .join("config.yaml")
    }

    /// Reject configs the bot cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.work.is_empty() {
            return Err(ReportBotError::Config("work list must not be empty".into()));
        }
        for work in &self.work {
            let name = work.trim();
            if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
                return Err(ReportBotError::Config(format!(
                    "work name '{work}' is not a valid directory name"
                )));
            }
        }

        if self.report_type.is_empty() {
            return Err(ReportBotError::Config("report_type must not be empty".into()));
        }
        let mut formats = HashSet::new();
        for report in &self.report_type {
            let ext = normalize_extension(&report.format);
            if ext.is_empty() {
                return Err(ReportBotError::Config("report format must not be empty".into()));
            }
            if report.max_size_mb == 0 || report.max_size_mb.checked_mul(BYTES_PER_MB).is_none() {
                return Err(ReportBotError::Config(format!(
                    "report format '{}' needs 0 < max_size_mb <= {}",
                    report.format,
                    u64::MAX / BYTES_PER_MB
                )));
            }
            if !formats.insert(ext) {
                return Err(ReportBotError::Config(format!(
                    "report format '{}' is listed twice",
                    report.format
                )));
            }
        }

        for student in &self.student {
            if participant_slug(&student.first_name, &student.last_name).is_empty() {
                return Err(ReportBotError::Config(format!(
                    "student '{}' has no usable name for a directory",
                    student.user_name
                )));
            }
        }

        if self.reminder.attempts == 0 || self.reminder.interval_secs == 0 {
            return Err(ReportBotError::Config(
                "reminder attempts and interval_secs must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Storage root with `~` expanded.
    pub fn work_root(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.work_dir).into_owned())
    }

    /// Assign every student a storage root and create all work directories.
    /// Existing directories are left untouched.
    pub fn prepare_work_dirs(&mut self) -> Result<()> {
        let root = self.work_root();
        for student in self.student.iter_mut() {
            let dir = root
                .join(&student.group_name)
                .join(participant_slug(&student.first_name, &student.last_name));
            if !dir.exists() {
                tracing::info!("📁 Create student directory: {}", dir.display());
            }
            for work in &self.work {
                std::fs::create_dir_all(dir.join(work.trim()))?;
            }
            student.work_dir = dir;
        }
        Ok(())
    }

    /// Find a student by chat user name (case-insensitive).
    pub fn student(&self, user_name: &str) -> Option<&Student> {
        self.student
            .iter()
            .find(|s| s.user_name.eq_ignore_ascii_case(user_name))
    }

    /// Find an admin by chat user name (case-insensitive).
    pub fn admin(&self, user_name: &str) -> Option<&Admin> {
        self.admin
            .iter()
            .find(|a| a.user.eq_ignore_ascii_case(user_name))
    }

    pub fn admin_for_group(&self, group: &str) -> Option<&Admin> {
        self.admin.iter().find(|a| a.group == group)
    }

    /// Required report kinds, in config order.
    pub fn report_kinds(&self) -> Vec<ReportKind> {
        self.report_type.iter().map(ReportType::kind).collect()
    }

    pub fn report_kind(&self, extension: &str) -> Option<ReportKind> {
        self.report_type
            .iter()
            .map(ReportType::kind)
            .find(|k| k.matches(extension))
    }

    /// Exact match of a (trimmed) work item name.
    pub fn work_item(&self, name: &str) -> Option<&str> {
        let name = name.trim();
        self.work
            .iter()
            .map(|w| w.trim())
            .find(|w| *w == name)
    }
}
