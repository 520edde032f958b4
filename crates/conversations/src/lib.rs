//! Conversation message logs: per user/hub append-only messages with
//! attachments, generated files, and token-usage counters. The counters are
//! bumped in the same critical section as the message append so a
//! conversation's totals always match its messages.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Uuid,
    pub file_name: String,
    pub storage_key: String,
    pub size: usize,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedFile {
    pub id: Uuid,
    pub file_name: String,
    pub storage_key: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub hub_id: Uuid,
    pub title: Option<String>,
    pub messages: Vec<Message>,
    pub attachments: Vec<Attachment>,
    pub generated_files: Vec<GeneratedFile>,
    pub token_usage: TokenUsage,
    /// Free-form context carried across messages.
    pub context: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct ConversationStore {
    conversations: DashMap<Uuid, Conversation>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, user_id: Uuid, hub_id: Uuid, title: Option<String>) -> Conversation {
        let now = Utc::now();
        let conversation = Conversation {
            id: Uuid::new_v4(),
            user_id,
            hub_id,
            title,
            messages: Vec::new(),
            attachments: Vec::new(),
            generated_files: Vec::new(),
            token_usage: TokenUsage::default(),
            context: HashMap::new(),
            created_at: now,
            updated_at: now,
        };
        self.conversations
            .insert(conversation.id, conversation.clone());
        metrics::counter!("conversations.created").increment(1);
        conversation
    }

    pub fn get(&self, id: Uuid) -> Option<Conversation> {
        self.conversations.get(&id).map(|r| r.value().clone())
    }

    pub fn list_for_user(&self, user_id: Uuid, hub_id: Uuid) -> Vec<Conversation> {
        let mut out: Vec<Conversation> = self
            .conversations
            .iter()
            .filter(|r| r.value().user_id == user_id && r.value().hub_id == hub_id)
            .map(|r| r.value().clone())
            .collect();
        out.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        out
    }

    /// Append a message and bump token counters in one critical section.
    pub fn append_message(
        &self,
        id: Uuid,
        role: MessageRole,
        content: String,
        prompt_tokens: u64,
        completion_tokens: u64,
    ) -> Option<Conversation> {
        self.conversations.get_mut(&id).map(|mut entry| {
            let c = entry.value_mut();
            c.messages.push(Message {
                id: Uuid::new_v4(),
                role,
                content,
                created_at: Utc::now(),
            });
            c.token_usage.prompt_tokens += prompt_tokens;
            c.token_usage.completion_tokens += completion_tokens;
            c.token_usage.total_tokens += prompt_tokens + completion_tokens;
            c.updated_at = Utc::now();
            c.clone()
        })
    }

    pub fn add_attachment(
        &self,
        id: Uuid,
        file_name: String,
        storage_key: String,
        size: usize,
    ) -> Option<Conversation> {
        self.conversations.get_mut(&id).map(|mut entry| {
            let c = entry.value_mut();
            c.attachments.push(Attachment {
                id: Uuid::new_v4(),
                file_name,
                storage_key,
                size,
                added_at: Utc::now(),
            });
            c.updated_at = Utc::now();
            c.clone()
        })
    }

    pub fn add_generated_file(
        &self,
        id: Uuid,
        file_name: String,
        storage_key: String,
    ) -> Option<Conversation> {
        self.conversations.get_mut(&id).map(|mut entry| {
            let c = entry.value_mut();
            c.generated_files.push(GeneratedFile {
                id: Uuid::new_v4(),
                file_name,
                storage_key,
                created_at: Utc::now(),
            });
            c.updated_at = Utc::now();
            c.clone()
        })
    }

    pub fn set_context(
        &self,
        id: Uuid,
        key: String,
        value: serde_json::Value,
    ) -> Option<Conversation> {
        self.conversations.get_mut(&id).map(|mut entry| {
            let c = entry.value_mut();
            c.context.insert(key, value);
            c.updated_at = Utc::now();
            c.clone()
        })
    }

    pub fn delete(&self, id: Uuid) -> bool {
        let removed = self.conversations.remove(&id).is_some();
        if removed {
            info!(conversation_id = %id, "Conversation deleted");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_updates_counters_with_message() {
        let store = ConversationStore::new();
        let c = store.create(Uuid::new_v4(), Uuid::new_v4(), Some("Plan Q4".into()));

        let c = store
            .append_message(c.id, MessageRole::User, "Draft a plan".into(), 12, 0)
            .unwrap();
        let c = store
            .append_message(c.id, MessageRole::Assistant, "Here it is".into(), 0, 54)
            .unwrap();

        assert_eq!(c.messages.len(), 2);
        assert_eq!(c.token_usage.prompt_tokens, 12);
        assert_eq!(c.token_usage.completion_tokens, 54);
        assert_eq!(c.token_usage.total_tokens, 66);
    }

    #[test]
    fn list_is_scoped_to_user_and_hub() {
        let store = ConversationStore::new();
        let user = Uuid::new_v4();
        let hub = Uuid::new_v4();
        store.create(user, hub, None);
        store.create(user, Uuid::new_v4(), None);
        store.create(Uuid::new_v4(), hub, None);
        assert_eq!(store.list_for_user(user, hub).len(), 1);
    }

    #[test]
    fn attachments_and_context() {
        let store = ConversationStore::new();
        let c = store.create(Uuid::new_v4(), Uuid::new_v4(), None);
        store
            .add_attachment(c.id, "brief.pdf".into(), "bucket/brief.pdf".into(), 1024)
            .unwrap();
        store
            .set_context(c.id, "campaign_id".into(), serde_json::json!("c-123"))
            .unwrap();
        let c = store.get(c.id).unwrap();
        assert_eq!(c.attachments.len(), 1);
        assert_eq!(c.context["campaign_id"], serde_json::json!("c-123"));
    }

    #[test]
    fn generated_files_recorded() {
        let store = ConversationStore::new();
        let c = store.create(Uuid::new_v4(), Uuid::new_v4(), None);
        let c = store
            .add_generated_file(c.id, "media-plan.xlsx".into(), "bucket/media-plan.xlsx".into())
            .unwrap();
        assert_eq!(c.generated_files.len(), 1);
        assert_eq!(c.generated_files[0].file_name, "media-plan.xlsx");
        assert!(store
            .add_generated_file(Uuid::new_v4(), "x".into(), "k".into())
            .is_none());
    }

    #[test]
    fn delete_missing_is_false() {
        let store = ConversationStore::new();
        assert!(!store.delete(Uuid::new_v4()));
    }
}
