use std::fmt::Write as _;

use crate::config::APP_NAME;
use crate::models::{Message, Role, User};

pub const THINKING: &str = "Thinking...";

fn author_label(role: Role, user: Option<&User>) -> &str {
    match role {
        Role::User => user.map(|u| u.username.as_str()).unwrap_or("You"),
        Role::Assistant => APP_NAME,
    }
}

/// The visible message list for the active conversation.
pub fn render(messages: &[&Message], user: Option<&User>, search_query: &str) -> String {
    let searching = !search_query.trim().is_empty();

    if messages.is_empty() {
        return if searching {
            format!("No messages match \"{}\".", search_query.trim())
        } else {
            "Start a conversation by typing a message below.".to_string()
        };
    }

    let mut out = String::new();
    if searching {
        let _ = writeln!(out, "Showing messages matching \"{}\"\n", search_query.trim());
    }
    for msg in messages {
        let _ = writeln!(out, "{}:", author_label(msg.role, user));
        for line in msg.content.lines() {
            let _ = writeln!(out, "  {line}");
        }
        out.push('\n');
    }
    out.truncate(out.trim_end().len());
    out
}
