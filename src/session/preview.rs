//! Textual summaries of user turns with attachments.
//!
//! Attachments are never persisted. A user turn is stored as its text, a blank
//! line, and an `Attachments: a.png, b.pdf` line, and parsed back for display.
//! The summary line only counts when it is the last line and follows a blank
//! line, so plain text that happens to start with `Attachments:` stays text.

use regex::Regex;
use std::sync::LazyLock;

use crate::i18n::{self, Localizer};
use crate::models::{sanitize_attachment_file_name, Attachment, ContentPart};

pub const ATTACHMENT_SUMMARY_PREFIX: &str = "Attachments";
const IMAGE_TOKEN: &str = "image";

static EXTENSION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.([a-z0-9]{1,8})$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentSummary {
    pub file_name: String,
    /// `Image`, the upper-cased extension, or `FILE`.
    pub summary_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPreview {
    pub text: String,
    pub attachments: Vec<AttachmentSummary>,
}

fn summary_name(file_name: &str) -> String {
    sanitize_attachment_file_name(&file_name.replace(',', " "))
}

fn with_summary(localizer: &dyn Localizer, text: &str, names: Vec<String>) -> String {
    if names.is_empty() {
        return text.to_string();
    }

    let prefix = i18n::text(
        localizer,
        "popupAttachmentSummaryPrefix",
        ATTACHMENT_SUMMARY_PREFIX,
    );
    let text = if text.trim().is_empty() { "" } else { text };
    format!("{}\n\n{}: {}", text, prefix, names.join(", "))
}

/// Display string persisted for a user turn.
pub fn serialize_user_turn(
    localizer: &dyn Localizer,
    text: &str,
    attachments: &[Attachment],
) -> String {
    let names = attachments
        .iter()
        .map(|attachment| summary_name(&attachment.file_name))
        .collect();
    with_summary(localizer, text, names)
}

/// Flattens structured content the same way [`serialize_user_turn`] does.
pub fn flatten_parts(localizer: &dyn Localizer, parts: &[ContentPart]) -> String {
    let mut texts = Vec::new();
    let mut names = Vec::new();
    for part in parts {
        match part {
            ContentPart::InputText { text } => texts.push(text.as_str()),
            ContentPart::InputImage { .. } => names.push(IMAGE_TOKEN.to_string()),
            ContentPart::InputFile { filename, .. } => names.push(summary_name(filename)),
        }
    }
    with_summary(localizer, &texts.join("\n"), names)
}

fn attachment_prefix_regex(localizer: &dyn Localizer) -> Option<Regex> {
    let localized = i18n::text(
        localizer,
        "popupAttachmentSummaryPrefix",
        ATTACHMENT_SUMMARY_PREFIX,
    );
    let mut prefixes: Vec<String> = Vec::new();
    for prefix in [localized.as_str(), ATTACHMENT_SUMMARY_PREFIX, "Attachment"] {
        let escaped = regex::escape(prefix);
        if !prefix.is_empty() && !prefixes.contains(&escaped) {
            prefixes.push(escaped);
        }
    }
    Regex::new(&format!(r"(?i)^\s*(?:{}):\s*", prefixes.join("|"))).ok()
}

fn summary_item(localizer: &dyn Localizer, raw: &str) -> AttachmentSummary {
    let file_name = sanitize_attachment_file_name(raw);
    let lower = file_name.to_lowercase();
    let image_token =
        i18n::text(localizer, "popupAttachmentImageToken", IMAGE_TOKEN).to_lowercase();

    let summary_label = if lower == IMAGE_TOKEN || lower == image_token {
        i18n::text(localizer, "popupAttachmentImageLabel", "Image")
    } else {
        match EXTENSION_REGEX.captures(&file_name) {
            Some(captures) => captures[1].to_uppercase(),
            None => i18n::text(localizer, "popupAttachmentFileLabel", "FILE"),
        }
    };

    AttachmentSummary {
        file_name,
        summary_label,
    }
}

/// Recovers the text and attachment summary of a stored user turn.
/// Returns `None` when the content carries no attachment line.
pub fn parse_stored_user_preview(
    localizer: &dyn Localizer,
    content: &str,
) -> Option<UserPreview> {
    let lines: Vec<&str> = content.trim_end().split('\n').collect();
    let summary_index = lines.len().checked_sub(1)?;
    if summary_index == 0 || !lines[summary_index - 1].trim().is_empty() {
        return None;
    }

    let pattern = attachment_prefix_regex(localizer)?;
    if !pattern.is_match(lines[summary_index]) {
        return None;
    }

    let summary_line = pattern.replace(lines[summary_index], "");
    let summary_line = summary_line.trim();
    if summary_line.is_empty() {
        return None;
    }

    let attachments: Vec<AttachmentSummary> = summary_line
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| summary_item(localizer, item))
        .collect();
    if attachments.is_empty() {
        return None;
    }

    let mut text_lines = lines[..summary_index].to_vec();
    while text_lines.last().is_some_and(|line| line.trim().is_empty()) {
        text_lines.pop();
    }

    Some(UserPreview {
        text: text_lines.join("\n"),
        attachments,
    })
}

/// Text of the user turn without its attachment summary.
pub fn user_text(localizer: &dyn Localizer, content: &str) -> String {
    parse_stored_user_preview(localizer, content)
        .map(|preview| preview.text)
        .unwrap_or_else(|| content.to_string())
}
