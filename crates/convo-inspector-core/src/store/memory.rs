//! In-memory [`DashboardStore`] implementation for testing.
//!
//! Records live in `Vec`s behind `std::sync::RwLock`. Senders are resolved
//! against the user list at read time, the same way the SQLite store joins
//! them.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::external_id::normalize_uuid;
use crate::models::{Conversation, Engagement, EngagementMembership, GuardianLink, Message, User};

use super::{DashboardStore, StoreStats};

/// In-memory store for tests and fixtures.
pub struct InMemoryStore {
    users: RwLock<Vec<User>>,
    engagements: RwLock<Vec<Engagement>>,
    memberships: RwLock<Vec<EngagementMembership>>,
    guardian_links: RwLock<Vec<GuardianLink>>,
    conversations: RwLock<Vec<Conversation>>,
    messages: RwLock<Vec<Message>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(Vec::new()),
            engagements: RwLock::new(Vec::new()),
            memberships: RwLock::new(Vec::new()),
            guardian_links: RwLock::new(Vec::new()),
            conversations: RwLock::new(Vec::new()),
            messages: RwLock::new(Vec::new()),
        }
    }

    pub fn add_user(&self, user: User) {
        self.users.write().unwrap().push(user);
    }

    /// Add an engagement together with its member UUIDs.
    pub fn add_engagement(&self, engagement: Engagement, members: &[&str]) {
        let mut memberships = self.memberships.write().unwrap();
        for m in members {
            memberships.push(EngagementMembership {
                engagement_uuid: engagement.uuid.clone(),
                user_uuid: m.to_string(),
            });
        }
        self.engagements.write().unwrap().push(engagement);
    }

    pub fn add_guardian_link(&self, guardian_uuid: &str, student_uuid: &str) {
        self.guardian_links.write().unwrap().push(GuardianLink {
            guardian_uuid: guardian_uuid.to_string(),
            student_uuid: student_uuid.to_string(),
        });
    }

    pub fn add_conversation(&self, conversation: Conversation) {
        self.conversations.write().unwrap().push(conversation);
    }

    /// Add a message. Any `sender` on the input is ignored and resolved on read.
    pub fn add_message(&self, mut message: Message) {
        message.sender = None;
        self.messages.write().unwrap().push(message);
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DashboardStore for InMemoryStore {
    async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        Ok(self.conversations.read().unwrap().clone())
    }

    async fn get_conversation(&self, uuid: &str) -> Result<Option<Conversation>> {
        let wanted = normalize_uuid(uuid);
        Ok(self
            .conversations
            .read()
            .unwrap()
            .iter()
            .find(|c| normalize_uuid(&c.uuid) == wanted)
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.users.read().unwrap().clone())
    }

    async fn list_engagements(&self) -> Result<Vec<Engagement>> {
        Ok(self.engagements.read().unwrap().clone())
    }

    async fn list_memberships(&self) -> Result<Vec<EngagementMembership>> {
        Ok(self.memberships.read().unwrap().clone())
    }

    async fn list_guardian_links(&self) -> Result<Vec<GuardianLink>> {
        Ok(self.guardian_links.read().unwrap().clone())
    }

    async fn list_messages(
        &self,
        conversation_uuid: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Message>> {
        let wanted = normalize_uuid(conversation_uuid);
        let users = self.users.read().unwrap();
        let mut messages: Vec<Message> = self
            .messages
            .read()
            .unwrap()
            .iter()
            .filter(|m| normalize_uuid(&m.conversation_uuid) == wanted)
            .cloned()
            .collect();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.uuid.cmp(&b.uuid)));

        if let Some(limit) = limit {
            let skip = messages.len().saturating_sub(limit);
            messages.drain(..skip);
        }

        for m in &mut messages {
            let sender = normalize_uuid(&m.sender_uuid);
            m.sender = users
                .iter()
                .find(|u| normalize_uuid(&u.uuid) == sender)
                .cloned();
        }
        Ok(messages)
    }

    async fn last_message_times(&self) -> Result<HashMap<String, DateTime<Utc>>> {
        let mut out: HashMap<String, DateTime<Utc>> = HashMap::new();
        for m in self.messages.read().unwrap().iter() {
            let entry = out.entry(m.conversation_uuid.clone()).or_insert(m.created_at);
            if m.created_at > *entry {
                *entry = m.created_at;
            }
        }
        Ok(out)
    }

    async fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            users: self.users.read().unwrap().len() as i64,
            engagements: self.engagements.read().unwrap().len() as i64,
            conversations: self.conversations.read().unwrap().len() as i64,
            messages: self.messages.read().unwrap().len() as i64,
            guardian_links: self.guardian_links.read().unwrap().len() as i64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Snapshot;
    use chrono::{Duration, TimeZone};

    fn message(uuid: &str, sender: &str, minutes: i64) -> Message {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + Duration::minutes(minutes);
        Message {
            uuid: uuid.to_string(),
            conversation_uuid: "c1".to_string(),
            sender_uuid: sender.to_string(),
            text: format!("message {}", uuid),
            created_at: at,
            updated_at: at,
            reactions: Vec::new(),
            read_by: Vec::new(),
            read_by_all: false,
            sender: None,
        }
    }

    fn store() -> InMemoryStore {
        let store = InMemoryStore::new();
        store.add_user(User {
            uuid: "u1".into(),
            roles: vec!["mentor".into()],
            full_name: Some("Mia".into()),
            email: None,
        });
        store.add_message(message("m2", "u1", 5));
        store.add_message(message("m1", "ghost", 0));
        store.add_message(message("m3", "u1", 9));
        store
    }

    #[tokio::test]
    async fn test_messages_sorted_with_senders() {
        let store = store();
        let messages = store.list_messages("c1", None).await.unwrap();
        let ids: Vec<&str> = messages.iter().map(|m| m.uuid.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
        assert!(messages[0].sender.is_none());
        assert!(messages[1].is_from_mentor());
    }

    #[tokio::test]
    async fn test_message_limit_keeps_newest() {
        let store = store();
        let messages = store.list_messages("c1", Some(2)).await.unwrap();
        let ids: Vec<&str> = messages.iter().map(|m| m.uuid.as_str()).collect();
        assert_eq!(ids, vec!["m2", "m3"]);
    }

    #[tokio::test]
    async fn test_last_message_times_and_stats() {
        let store = store();
        let times = store.last_message_times().await.unwrap();
        assert_eq!(
            times["c1"],
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 9, 0).unwrap()
        );
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.messages, 3);
        assert_eq!(stats.users, 1);
    }

    #[tokio::test]
    async fn test_snapshot_load() {
        let store = store();
        store.add_engagement(
            Engagement {
                uuid: "e1".into(),
                title: "Art".into(),
            },
            &["u1", "u2"],
        );
        let snapshot = Snapshot::load(&store).await.unwrap();
        assert_eq!(snapshot.engagements.len(), 1);
        assert_eq!(snapshot.memberships.len(), 2);
    }
}
