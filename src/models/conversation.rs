use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::message::Message;

pub const DEFAULT_TITLE: &str = "New Conversation";
pub const DEFAULT_PREVIEW: &str = "Start a new conversation...";

const TITLE_MAX_CHARS: usize = 30;
const PREVIEW_MAX_CHARS: usize = 40;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub preview: String,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Conversation {
    /// An empty conversation with the placeholder title and preview.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: DEFAULT_TITLE.to_string(),
            preview: DEFAULT_PREVIEW.to_string(),
            last_updated: Utc::now(),
            messages: Vec::new(),
        }
    }

    /// A conversation named after the message that started it.
    pub fn titled_from(content: &str) -> Self {
        Self {
            title: title_from(content),
            preview: content.to_string(),
            ..Self::new()
        }
    }

    pub fn has_default_title(&self) -> bool {
        self.title == DEFAULT_TITLE
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

/// Truncate to `max` characters, appending an ellipsis when anything was cut.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((boundary, _)) => format!("{}...", &text[..boundary]),
        None => text.to_string(),
    }
}

pub fn title_from(content: &str) -> String {
    truncate_chars(content.trim(), TITLE_MAX_CHARS)
}

pub fn preview_from(content: &str) -> String {
    truncate_chars(content, PREVIEW_MAX_CHARS)
}

/// Sidebar label for a timestamp relative to `now`, e.g. `Today, 10:30 AM`.
pub fn format_timestamp<Tz: TimeZone>(at: &DateTime<Tz>, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let today = now.date_naive();
    let day = at.date_naive();

    if day >= today {
        format!("Today, {}", at.format("%I:%M %p"))
    } else if today.pred_opt() == Some(day) {
        format!("Yesterday, {}", at.format("%I:%M %p"))
    } else {
        at.format("%b %-d, %Y").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("exactly10!", 10), "exactly10!");
        assert_eq!(truncate_chars("this is longer", 4), "this...");
        // multi-byte characters are never split
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo...");
    }

    #[test]
    fn test_new_and_titled_conversations() {
        let conv = Conversation::new();
        assert!(conv.has_default_title());
        assert_eq!(conv.preview, DEFAULT_PREVIEW);
        assert!(conv.messages.is_empty());

        let conv = Conversation::titled_from("How do I fix this React component that's not rendering?");
        assert_eq!(conv.title, "How do I fix this React compon...");
        assert!(!conv.has_default_title());
        assert_eq!(conv.preview, "How do I fix this React component that's not rendering?");
    }

    #[test]
    fn test_preview_truncates_at_forty() {
        let text = "a".repeat(41);
        assert_eq!(preview_from(&text), format!("{}...", "a".repeat(40)));
        assert_eq!(preview_from("Thank You :)"), "Thank You :)");
    }

    #[test]
    fn test_format_timestamp() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 18, 0, 0).unwrap();

        let today = Utc.with_ymd_and_hms(2024, 3, 10, 10, 30, 0).unwrap();
        assert_eq!(format_timestamp(&today, &now), "Today, 10:30 AM");

        let yesterday = Utc.with_ymd_and_hms(2024, 3, 9, 15, 45, 0).unwrap();
        assert_eq!(format_timestamp(&yesterday, &now), "Yesterday, 03:45 PM");

        let older = Utc.with_ymd_and_hms(2023, 1, 15, 9, 0, 0).unwrap();
        assert_eq!(format_timestamp(&older, &now), "Jan 15, 2023");
    }
}
