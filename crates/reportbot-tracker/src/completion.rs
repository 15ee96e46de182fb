//! Which report kinds a submission directory holds.
//!
//! Always computed from the directory listing. Nothing is cached.

use std::path::Path;

use reportbot_core::error::{ReportBotError, Result};
use reportbot_core::types::{extension_of, ReportKind, SubmissionKey};

pub const PRESENT_GLYPH: &str = "✅";
pub const MISSING_GLYPH: &str = "❌";

/// Presence of every registered report kind, in registry order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionStatus {
    entries: Vec<(String, bool)>,
}

impl CompletionStatus {
    fn absent(kinds: &[ReportKind]) -> Self {
        Self {
            entries: kinds.iter().map(|k| (k.extension.clone(), false)).collect(),
        }
    }

    fn mark(&mut self, extension: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|(ext, _)| ext == extension) {
            entry.1 = true;
        }
    }

    /// `(extension, present)` pairs.
    pub fn entries(&self) -> &[(String, bool)] {
        &self.entries
    }

    /// `None` when the extension is not a registered kind.
    pub fn is_present(&self, extension: &str) -> Option<bool> {
        self.entries
            .iter()
            .find(|(ext, _)| ext == extension)
            .map(|(_, present)| *present)
    }

    /// True iff every registered kind has an artifact.
    pub fn all_present(&self) -> bool {
        self.entries.iter().all(|(_, present)| *present)
    }

    pub fn missing(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, present)| !present)
            .map(|(ext, _)| ext.as_str())
    }

    /// One-line status: `pdf: ✅ | docx: ❌`.
    pub fn summary(&self) -> String {
        self.entries
            .iter()
            .map(|(ext, present)| format!("{ext}: {}", glyph(*present)))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

pub fn glyph(present: bool) -> &'static str {
    if present { PRESENT_GLYPH } else { MISSING_GLYPH }
}

/// Evaluate the submission directory of `key`.
pub fn evaluate(key: &SubmissionKey, kinds: &[ReportKind]) -> Result<CompletionStatus> {
    evaluate_dir(&key.dir(), kinds)
}

/// Evaluate an arbitrary directory against `kinds`.
///
/// Entries with unregistered extensions are ignored, and so are directories.
/// A listing failure is returned as [`ReportBotError::DirectoryRead`].
pub fn evaluate_dir(dir: &Path, kinds: &[ReportKind]) -> Result<CompletionStatus> {
    let read_error = |source| ReportBotError::DirectoryRead {
        path: dir.to_path_buf(),
        source,
    };

    let mut status = CompletionStatus::absent(kinds);
    for entry in std::fs::read_dir(dir).map_err(read_error)? {
        let entry = entry.map_err(read_error)?;
        if entry.file_type().is_ok_and(|t| t.is_dir()) {
            continue;
        }
        if let Some(ext) = extension_of(entry.file_name()) {
            status.mark(&ext);
        }
    }
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn test_all_present_and_removal() {
        let tmp = tempfile::tempdir().unwrap();
        let key = key(tmp.path());
        std::fs::write(key.dir().join("report.pdf"), b"pdf").unwrap();
        std::fs::write(key.dir().join("report.docx"), b"docx").unwrap();

        let status = evaluate(&key, &kinds()).unwrap();
        assert!(status.all_present());
        assert_eq!(status.missing().count(), 0);

        std::fs::remove_file(key.dir().join("report.docx")).unwrap();
        let status = evaluate(&key, &kinds()).unwrap();
        assert!(!status.all_present());
        assert_eq!(status.missing().collect::<Vec<_>>(), vec!["docx"]);
        assert_eq!(status.is_present("pdf"), Some(true));
        assert_eq!(status.is_present("txt"), None);
    }

    #[test]
    fn test_empty_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let status = evaluate(&key(tmp.path()), &kinds()).unwrap();
        assert!(!status.all_present());
        assert_eq!(status.summary(), "pdf: ❌ | docx: ❌");
    }

    #[test]
    fn test_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let key = key(tmp.path());
        std::fs::write(key.dir().join("report.pdf"), b"pdf").unwrap();

        let first = evaluate(&key, &kinds()).unwrap();
        let second = evaluate(&key, &kinds()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.summary(), "pdf: ✅ | docx: ❌");
    }

    #[test]
    fn test_ignores_unknown_files_and_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let key = key(tmp.path());
        std::fs::write(key.dir().join("notes.txt"), b"x").unwrap();
        std::fs::write(key.dir().join("report.pdf.part"), b"partial").unwrap();
        std::fs::create_dir(key.dir().join("old.docx")).unwrap();
        std::fs::write(key.dir().join("Report.PDF"), b"pdf").unwrap();

        let status = evaluate(&key, &kinds()).unwrap();
        assert_eq!(status.is_present("pdf"), Some(true));
        assert_eq!(status.is_present("docx"), Some(false));
    }

    #[test]
    fn test_missing_directory_is_read_error() {
        let tmp = tempfile::tempdir().unwrap();
        let key = SubmissionKey::new("alice", "gone", tmp.path());

        match evaluate(&key, &kinds()) {
            Err(ReportBotError::DirectoryRead { path, .. }) => assert_eq!(path, key.dir()),
            other => panic!("expected DirectoryRead, got {other:?}"),
        }
    }

    #[test]
    fn test_no_kinds_is_complete() {
        let tmp = tempfile::tempdir().unwrap();
        let status = evaluate(&key(tmp.path()), &[]).unwrap();
        assert!(status.all_present());
        assert_eq!(status.summary(), "");
    }
}
