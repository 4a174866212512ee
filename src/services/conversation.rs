use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::conversation::{preview_from, title_from};
use crate::models::{Conversation, Message, Role};
use crate::services::database::Database;

pub const CHATS_KEY: &str = "chatbot_chats";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedChats {
    conversations: Vec<Conversation>,
    #[serde(default)]
    active_id: Option<String>,
}

/// The conversation list plus the active selection.
///
/// The list is kept most-recently-updated first. At most one conversation
/// is active, and an active id always names a conversation in the list.
#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    conversations: Vec<Conversation>,
    active_id: Option<String>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    pub fn active(&self) -> Option<&Conversation> {
        self.active_id.as_deref().and_then(|id| self.get(id))
    }

    /// Messages of the active conversation, empty when nothing is selected.
    pub fn active_messages(&self) -> &[Message] {
        self.active().map(|c| c.messages.as_slice()).unwrap_or_default()
    }

    pub fn create_conversation(&mut self) -> String {
        self.insert_front(Conversation::new())
    }

    /// Put a conversation at the front of the list and make it active.
    pub fn insert_front(&mut self, conversation: Conversation) -> String {
        let id = conversation.id.clone();
        self.conversations.insert(0, conversation);
        self.active_id = Some(id.clone());
        id
    }

    /// Returns `false` and leaves the selection untouched for unknown ids.
    pub fn select_conversation(&mut self, id: &str) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.active_id = Some(id.to_string());
        true
    }

    pub fn append_message(
        &mut self,
        conversation_id: &str,
        message: Message,
    ) -> Result<(), StoreError> {
        let idx = self
            .conversations
            .iter()
            .position(|c| c.id == conversation_id)
            .ok_or_else(|| StoreError::ConversationNotFound(conversation_id.to_string()))?;

        let mut conversation = self.conversations.remove(idx);

        if message.role == Role::User
            && conversation.has_default_title()
            && !conversation.messages.iter().any(|m| m.role == Role::User)
        {
            conversation.title = title_from(&message.content);
        }

        conversation.preview = preview_from(&message.content);
        conversation.last_updated = Utc::now();
        conversation.messages.push(message);

        self.conversations.insert(0, conversation);
        Ok(())
    }

    /// Returns `false` for unknown ids. Deleting the active conversation
    /// activates the new first conversation, if any.
    pub fn delete_conversation(&mut self, id: &str) -> bool {
        let before = self.conversations.len();
        self.conversations.retain(|c| c.id != id);
        if self.conversations.len() == before {
            return false;
        }

        if self.active_id.as_deref() == Some(id) {
            self.active_id = self.conversations.first().map(|c| c.id.clone());
        }
        true
    }

    pub fn clear_all(&mut self) {
        self.conversations.clear();
        self.active_id = None;
    }

    pub async fn persist(&self, db: &Database) -> Result<()> {
        let snapshot = PersistedChats {
            conversations: self.conversations.clone(),
            active_id: self.active_id.clone(),
        };
        let json = serde_json::to_string(&snapshot).context("Failed to serialize conversations")?;
        db.set_item(CHATS_KEY, &json).await
    }

    /// Clear everything and drop the stored copy as well.
    pub async fn erase(&mut self, db: &Database) -> Result<()> {
        self.clear_all();
        db.remove_item(CHATS_KEY).await
    }

    /// Load the saved state. Missing, unreadable or malformed data yields an
    /// empty store.
    pub async fn restore(db: &Database) -> Self {
        let raw = match db.get_item(CHATS_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::new(),
            Err(e) => {
                tracing::warn!("Failed to read saved conversations: {}", e);
                return Self::new();
            }
        };

        match serde_json::from_str::<PersistedChats>(&raw) {
            Ok(saved) => Self::from_saved(saved),
            Err(e) => {
                tracing::warn!("Discarding malformed saved conversations: {}", e);
                Self::new()
            }
        }
    }

    fn from_saved(saved: PersistedChats) -> Self {
        let mut conversations = saved.conversations;
        conversations.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));

        let active_id = saved
            .active_id
            .filter(|id| conversations.iter().any(|c| &c.id == id));

        Self {
            conversations,
            active_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(store: &ConversationStore) -> Vec<String> {
        store.conversations().iter().map(|c| c.id.clone()).collect()
    }

    #[test]
    fn test_create_inserts_front_and_activates() {
        let mut store = ConversationStore::new();
        let first = store.create_conversation();
        let second = store.create_conversation();

        assert_eq!(ids(&store), vec![second.clone(), first]);
        assert_eq!(store.active_id(), Some(second.as_str()));
        assert!(store.active_messages().is_empty());
    }

    #[test]
    fn test_select_unknown_is_noop() {
        let mut store = ConversationStore::new();
        let first = store.create_conversation();
        let second = store.create_conversation();

        assert!(!store.select_conversation("missing"));
        assert_eq!(store.active_id(), Some(second.as_str()));

        assert!(store.select_conversation(&first));
        assert_eq!(store.active_id(), Some(first.as_str()));
    }

    #[test]
    fn test_append_moves_to_front_and_updates_preview() {
        let mut store = ConversationStore::new();
        let older = store.create_conversation();
        let newer = store.create_conversation();
        let before = store.get(&older).unwrap().last_updated;

        store
            .append_message(&older, Message::user("Fix this code and explain the issues please, thanks"))
            .unwrap();

        assert_eq!(ids(&store), vec![older.clone(), newer]);
        let conv = store.get(&older).unwrap();
        assert_eq!(conv.messages.len(), 1);
        assert_eq!(conv.preview, "Fix this code and explain the issues ple...");
        assert_eq!(conv.title, "Fix this code and explain the ...");
        assert!(conv.last_updated >= before);
    }

    #[test]
    fn test_title_only_set_from_first_user_message() {
        let mut store = ConversationStore::new();
        let id = store.create_conversation();

        store.append_message(&id, Message::assistant("Welcome!")).unwrap();
        assert_eq!(store.get(&id).unwrap().title, "New Conversation");

        store.append_message(&id, Message::user("Marketing ideas")).unwrap();
        store.append_message(&id, Message::user("Something else")).unwrap();
        assert_eq!(store.get(&id).unwrap().title, "Marketing ideas");
    }

    #[test]
    fn test_append_unknown_conversation_fails() {
        let mut store = ConversationStore::new();
        let err = store.append_message("ghost", Message::user("hi")).unwrap_err();
        assert_eq!(err, StoreError::ConversationNotFound("ghost".to_string()));
    }

    #[test]
    fn test_delete_active_activates_first() {
        let mut store = ConversationStore::new();
        let a = store.create_conversation();
        let b = store.create_conversation();
        let c = store.create_conversation();

        // active is c, list is [c, b, a]
        assert!(store.delete_conversation(&c));
        assert_eq!(store.active_id(), Some(b.as_str()));

        // deleting an inactive one keeps the selection
        assert!(store.delete_conversation(&a));
        assert_eq!(store.active_id(), Some(b.as_str()));

        assert!(store.delete_conversation(&b));
        assert_eq!(store.active_id(), None);
        assert!(!store.delete_conversation(&b));
    }

    #[tokio::test]
    async fn test_persist_and_restore() {
        let db = Database::new_in_memory().unwrap();
        let mut store = ConversationStore::new();
        let a = store.create_conversation();
        store.append_message(&a, Message::user("Hello")).unwrap();
        store.append_message(&a, Message::assistant("Hi there")).unwrap();
        let b = store.create_conversation();
        store.persist(&db).await.unwrap();

        let restored = ConversationStore::restore(&db).await;
        assert_eq!(ids(&restored), vec![b.clone(), a.clone()]);
        assert_eq!(restored.active_id(), Some(b.as_str()));
        assert_eq!(restored.get(&a).unwrap().messages, store.get(&a).unwrap().messages);
    }

    #[tokio::test]
    async fn test_restore_corrupted_is_empty() {
        let db = Database::new_in_memory().unwrap();
        db.set_item(CHATS_KEY, "{not json").await.unwrap();

        let store = ConversationStore::restore(&db).await;
        assert!(store.conversations().is_empty());
        assert_eq!(store.active_id(), None);

        db.set_item(CHATS_KEY, r#"{"conversations":[{"id":1}]}"#).await.unwrap();
        assert!(ConversationStore::restore(&db).await.conversations().is_empty());
    }

    #[tokio::test]
    async fn test_restore_drops_dangling_active_id() {
        let db = Database::new_in_memory().unwrap();
        db.set_item(CHATS_KEY, r#"{"conversations":[],"activeId":"gone"}"#)
            .await
            .unwrap();

        let store = ConversationStore::restore(&db).await;
        assert_eq!(store.active_id(), None);
    }

    #[tokio::test]
    async fn test_erase_removes_saved_copy() {
        let db = Database::new_in_memory().unwrap();
        let mut store = ConversationStore::new();
        store.create_conversation();
        store.persist(&db).await.unwrap();

        store.erase(&db).await.unwrap();
        assert!(store.conversations().is_empty());
        assert!(db.get_item(CHATS_KEY).await.unwrap().is_none());
    }
}
