//! Report kinds, submission keys and normalized chat messages.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Prefix of every stored artifact: `report.<extension>`.
pub const ARTIFACT_STEM: &str = "report";

/// One required artifact type, identified by its file extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportKind {
    /// Lowercase extension without the leading dot (`pdf`, `docx`).
    pub extension: String,
    /// Size ceiling in bytes.
    pub max_size_bytes: u64,
    /// Forward the document to the group admin on receipt.
    pub notify: bool,
}

impl ReportKind {
    pub fn new(extension: &str, max_size_bytes: u64, notify: bool) -> Self {
        Self {
            extension: normalize_extension(extension),
            max_size_bytes,
            notify,
        }
    }

    /// Whether a (possibly dotted, any case) extension names this kind.
    pub fn matches(&self, extension: &str) -> bool {
        self.extension == normalize_extension(extension)
    }

    /// Canonical file name for this kind inside a submission directory.
    pub fn file_name(&self) -> String {
        format!("{ARTIFACT_STEM}.{}", self.extension)
    }

    /// Size ceiling in whole megabytes, as shown to participants.
    pub fn max_size_mb(&self) -> u64 {
        self.max_size_bytes / (1024 * 1024)
    }
}

/// Lowercase an extension and strip its leading dot.
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

/// Extension of a file name, normalized. `None` when there is none.
pub fn extension_of(name: impl AsRef<Path>) -> Option<String> {
    name.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(normalize_extension)
        .filter(|e| !e.is_empty())
}

/// Identifies the directory holding one participant's artifacts for one work item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubmissionKey {
    /// Participant identifier (chat user name).
    pub participant: String,
    /// Work item name.
    pub work_item: String,
    /// Participant storage root; the submission lives in `<root>/<work_item>`.
    pub root: PathBuf,
}

impl SubmissionKey {
    pub fn new(participant: &str, work_item: &str, root: impl Into<PathBuf>) -> Self {
        Self {
            participant: participant.to_string(),
            work_item: work_item.to_string(),
            root: root.into(),
        }
    }

    /// Directory holding the artifacts.
    pub fn dir(&self) -> PathBuf {
        self.root.join(&self.work_item)
    }

    /// Canonical path of the artifact for `kind`.
    pub fn artifact_path(&self, kind: &ReportKind) -> PathBuf {
        self.dir().join(kind.file_name())
    }
}

impl fmt::Display for SubmissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.participant, self.work_item)
    }
}

/// A document attached to an incoming chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingDocument {
    /// Transport handle used to resolve the download URL.
    pub file_id: String,
    /// File name as sent by the user.
    pub file_name: String,
    /// Declared size in bytes.
    pub file_size: u64,
}

impl IncomingDocument {
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.file_name)
    }
}

/// A normalized incoming chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub chat_id: i64,
    pub message_id: i64,
    /// Sender user name, empty when the sender has none.
    pub username: String,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub document: Option<IncomingDocument>,
}

impl IncomingMessage {
    /// Bot command without the slash or `@botname` suffix, if the text is one.
    pub fn command(&self) -> Option<&str> {
        let text = self.text.as_deref()?.trim_start();
        let word = text.strip_prefix('/')?.split_whitespace().next()?;
        let name = word.split('@').next().unwrap_or(word);
        (!name.is_empty()).then_some(name)
    }
}
