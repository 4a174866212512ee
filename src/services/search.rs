use crate::models::Message;

/// Case-insensitive substring filter over message content.
///
/// A blank query keeps every message.
pub fn filter<'a>(messages: &'a [Message], query: &str) -> Vec<&'a Message> {
    if query.trim().is_empty() {
        return messages.iter().collect();
    }

    let needle = query.to_lowercase();
    messages
        .iter()
        .filter(|m| m.content.to_lowercase().contains(&needle))
        .collect()
}
