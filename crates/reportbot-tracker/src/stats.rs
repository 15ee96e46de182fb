//! Per-participant progress across all work items (the `/stat` command).

use reportbot_core::config::Student;
use reportbot_core::error::Result;
use reportbot_core::types::{ReportKind, SubmissionKey};

use crate::completion::{evaluate, glyph, CompletionStatus};
use crate::text::escape_markdown;

/// Completion of one work item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkProgress {
    pub work_item: String,
    pub status: CompletionStatus,
}

/// Evaluate every work item of `student`. Fails on the first unreadable directory.
pub fn collect(
    student: &Student,
    work_items: &[String],
    kinds: &[ReportKind],
) -> Result<Vec<WorkProgress>> {
    work_items
        .iter()
        .map(|work| -> Result<WorkProgress> {
            let key = SubmissionKey::new(&student.user_name, work.trim(), &student.work_dir);
            Ok(WorkProgress {
                work_item: key.work_item.clone(),
                status: evaluate(&key, kinds)?,
            })
        })
        .collect()
}

/// Markdown table: participant header, then one line of glyphs per work item.
pub fn render(student: &Student, progress: &[WorkProgress]) -> String {
    let mut text = format!(
        "*Student*: _{}_\n*Group*: _{}_\n",
        escape_markdown(&student.full_name()),
        escape_markdown(&student.group_name)
    );
    for row in progress {
        for (ext, present) in row.status.entries() {
            text.push_str(&format!("| _{}:_ *{}* ", ext.to_uppercase(), glyph(*present)));
        }
        text.push_str(&format!("| *{}*\n", escape_markdown(&row.work_item)));
    }
    text
}
