//! Storage abstraction for Convo Inspector.
//!
//! The [`DashboardStore`] trait is the seam between the pure resolution and
//! analytics code and whatever holds the records (SQLite in the application
//! crate, [`memory::InMemoryStore`] in tests). Every operation is a read;
//! the dashboard never mutates the store.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Conversation, Engagement, EngagementMembership, GuardianLink, Message, User};

/// Row counts for the stats view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub users: i64,
    pub engagements: i64,
    pub conversations: i64,
    pub messages: i64,
    pub guardian_links: i64,
}

/// Read-only data access for the dashboard.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`list_conversations`](DashboardStore::list_conversations) | All conversations with rosters |
/// | [`get_conversation`](DashboardStore::get_conversation) | One conversation by UUID |
/// | [`list_users`](DashboardStore::list_users) | All users with roles |
/// | [`list_engagements`](DashboardStore::list_engagements) | All engagements |
/// | [`list_memberships`](DashboardStore::list_memberships) | Engagement membership rows |
/// | [`list_guardian_links`](DashboardStore::list_guardian_links) | Guardian → student links |
/// | [`list_messages`](DashboardStore::list_messages) | Messages of one conversation, oldest first |
/// | [`last_message_times`](DashboardStore::last_message_times) | Newest message time per conversation |
/// | [`stats`](DashboardStore::stats) | Row counts |
#[async_trait]
pub trait DashboardStore: Send + Sync {
    async fn list_conversations(&self) -> Result<Vec<Conversation>>;

    async fn get_conversation(&self, uuid: &str) -> Result<Option<Conversation>>;

    async fn list_users(&self) -> Result<Vec<User>>;

    async fn list_engagements(&self) -> Result<Vec<Engagement>>;

    async fn list_memberships(&self) -> Result<Vec<EngagementMembership>>;

    async fn list_guardian_links(&self) -> Result<Vec<GuardianLink>>;

    /// Messages ordered by `created_at` ascending, with `sender` resolved.
    ///
    /// With a `limit`, only the newest `limit` messages are returned (still
    /// oldest first).
    async fn list_messages(
        &self,
        conversation_uuid: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Message>>;

    async fn last_message_times(&self) -> Result<HashMap<String, DateTime<Utc>>>;

    async fn stats(&self) -> Result<StoreStats>;
}

/// Every input the engagement resolver needs, fetched in one go.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub users: Vec<User>,
    pub engagements: Vec<Engagement>,
    pub memberships: Vec<EngagementMembership>,
    pub guardian_links: Vec<GuardianLink>,
}

impl Snapshot {
    pub async fn load<S: DashboardStore + ?Sized>(store: &S) -> Result<Self> {
        Ok(Self {
            users: store.list_users().await?,
            engagements: store.list_engagements().await?,
            memberships: store.list_memberships().await?,
            guardian_links: store.list_guardian_links().await?,
        })
    }

    /// Build the pair index for this snapshot.
    pub fn pair_index(&self) -> crate::resolver::PairIndex {
        crate::resolver::PairIndex::build(
            &self.engagements,
            &self.memberships,
            &self.users,
            &self.guardian_links,
        )
    }
}
