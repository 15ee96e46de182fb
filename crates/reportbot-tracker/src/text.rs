//! User-facing message texts (Telegram Markdown v1).

use reportbot_core::types::ReportKind;

use crate::completion::CompletionStatus;

/// Escape Telegram MarkdownV1 special characters.
pub fn escape_markdown(s: &str) -> String {
    s.replace('_', "\\_")
        .replace('*', "\\*")
        .replace('[', "\\[")
        .replace('`', "\\`")
}

/// Reminder sent by a watcher while a submission is incomplete.
pub fn reminder_text(work_item: &str, status: &CompletionStatus) -> String {
    format!(
        "Please, send missing report: *[{}]* {}",
        escape_markdown(work_item),
        status.summary()
    )
}

/// `/help` answer.
pub fn help_text(work_items: &[String], kinds: &[ReportKind]) -> String {
    let work_list: String = work_items
        .iter()
        .map(|w| format!("• \"{}\"\n", escape_markdown(w)))
        .collect();
    let formats = kinds
        .iter()
        .map(|k| format!("`{}`", k.extension))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "*How to use this bot?*\n\n\
         Create message with attached file and text _<work name>_.\n\
         *ONE MESSAGE - ONE FILE*.\n\n\
         WORK NAMES:\n{work_list}\n\
         Every work needs these files: {formats}.\n\
         If you sent only some of them you will receive a notification about the missing ones.\n\n\
         • For show this message run command `/help`\n\
         • For show statistic run command `/stat`"
    )
}
