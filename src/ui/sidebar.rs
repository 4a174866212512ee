use std::fmt::Write as _;

use chrono::{DateTime, TimeZone};

use crate::models::conversation::format_timestamp;
use crate::models::Conversation;

/// Numbered conversation list, newest first, with the active one marked.
pub fn render<Tz: TimeZone>(
    conversations: &[Conversation],
    active_id: Option<&str>,
    now: &DateTime<Tz>,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    if conversations.is_empty() {
        return "No conversations yet. Type a message or /new to start one.".to_string();
    }

    let mut out = String::new();
    for (idx, conv) in conversations.iter().enumerate() {
        let marker = if Some(conv.id.as_str()) == active_id { '*' } else { ' ' };
        let when = format_timestamp(&conv.last_updated.with_timezone(&now.timezone()), now);
        let _ = writeln!(out, "{marker}{:>3}. {}  ({when})", idx + 1, conv.title);
        let _ = writeln!(out, "      {}", conv.preview);
    }
    out.truncate(out.trim_end().len());
    out
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::Message;
    use crate::services::ConversationStore;

    #[test]
    fn test_render_marks_active_and_numbers_rows() {
        let mut store = ConversationStore::new();
        let first = store.create_conversation();
        store.create_conversation();
        store.append_message(&first, Message::user("Code Help")).unwrap();

        let now = Utc::now();
        let out = render(store.conversations(), Some(first.as_str()), &now);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("*  1. Code Help  (Today, "));
        assert_eq!(lines[1].trim(), "Code Help");
        assert!(lines[2].starts_with("   2. New Conversation"));
        assert_eq!(lines[3].trim(), "Start a new conversation...");
    }

    #[test]
    fn test_render_empty() {
        let out = render(&[], None, &Utc::now());
        assert!(out.starts_with("No conversations yet"));
    }
}
