//! SQLite-backed [`DashboardStore`] implementation.
//!
//! Maps each store operation onto the schema created by
//! [`migrate`](crate::migrate). Timestamps are stored as Unix milliseconds.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use convo_inspector_core::external_id::normalize_uuid;
use convo_inspector_core::models::{
    Conversation, Engagement, EngagementMembership, GuardianLink, Message, Reaction, User,
};
use convo_inspector_core::store::{DashboardStore, StoreStats};

/// SQLite implementation of the [`DashboardStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn rosters(
        &self,
        conversation_uuid: Option<&str>,
    ) -> Result<HashMap<String, Vec<String>>> {
        let rows = match conversation_uuid {
            Some(uuid) => {
                sqlx::query(
                    "SELECT conversation_uuid, user_uuid FROM conversation_users WHERE conversation_uuid = ? ORDER BY position ASC",
                )
                .bind(uuid)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT conversation_uuid, user_uuid FROM conversation_users ORDER BY conversation_uuid ASC, position ASC",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        let mut rosters: HashMap<String, Vec<String>> = HashMap::new();
        for row in &rows {
            rosters
                .entry(row.get("conversation_uuid"))
                .or_default()
                .push(row.get("user_uuid"));
        }
        Ok(rosters)
    }
}

fn users_from_rows(user_rows: &[SqliteRow], role_rows: &[SqliteRow]) -> Vec<User> {
    let mut roles: HashMap<String, Vec<String>> = HashMap::new();
    for row in role_rows {
        roles
            .entry(row.get("user_uuid"))
            .or_default()
            .push(row.get("role"));
    }

    user_rows
        .iter()
        .map(|row| {
            let uuid: String = row.get("uuid");
            User {
                roles: roles.remove(&uuid).unwrap_or_default(),
                uuid,
                full_name: row.get("full_name"),
                email: row.get("email"),
            }
        })
        .collect()
}

pub fn millis_to_datetime(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| anyhow!("timestamp out of range: {}", ms))
}

#[async_trait]
impl DashboardStore for SqliteStore {
    async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        let rows = sqlx::query(
            "SELECT uuid, external_conversation_id FROM conversations ORDER BY uuid ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut rosters = self.rosters(None).await?;

        Ok(rows
            .iter()
            .map(|row| {
                let uuid: String = row.get("uuid");
                Conversation {
                    user_uuids: rosters.remove(&uuid).unwrap_or_default(),
                    uuid,
                    external_conversation_id: row.get("external_conversation_id"),
                }
            })
            .collect())
    }

    async fn get_conversation(&self, uuid: &str) -> Result<Option<Conversation>> {
        let row = sqlx::query(
            "SELECT uuid, external_conversation_id FROM conversations WHERE lower(uuid) = lower(?)",
        )
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;

        let row = match row {
            Some(r) => r,
            None => return Ok(None),
        };

        let uuid: String = row.get("uuid");
        let mut rosters = self.rosters(Some(&uuid)).await?;

        Ok(Some(Conversation {
            user_uuids: rosters.remove(&uuid).unwrap_or_default(),
            external_conversation_id: row.get("external_conversation_id"),
            uuid,
        }))
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let user_rows = sqlx::query("SELECT uuid, full_name, email FROM users ORDER BY uuid ASC")
            .fetch_all(&self.pool)
            .await?;
        let role_rows = sqlx::query("SELECT user_uuid, role FROM user_roles ORDER BY role ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(users_from_rows(&user_rows, &role_rows))
    }

    async fn list_engagements(&self) -> Result<Vec<Engagement>> {
        let rows = sqlx::query("SELECT uuid, title FROM engagements ORDER BY title ASC, uuid ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| Engagement {
                uuid: row.get("uuid"),
                title: row.get("title"),
            })
            .collect())
    }

    async fn list_memberships(&self) -> Result<Vec<EngagementMembership>> {
        let rows = sqlx::query(
            "SELECT engagement_uuid, user_uuid FROM engagement_members ORDER BY engagement_uuid ASC, rowid ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| EngagementMembership {
                engagement_uuid: row.get("engagement_uuid"),
                user_uuid: row.get("user_uuid"),
            })
            .collect())
    }

    async fn list_guardian_links(&self) -> Result<Vec<GuardianLink>> {
        let rows = sqlx::query("SELECT guardian_uuid, student_uuid FROM guardian_links")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| GuardianLink {
                guardian_uuid: row.get("guardian_uuid"),
                student_uuid: row.get("student_uuid"),
            })
            .collect())
    }

    async fn list_messages(
        &self,
        conversation_uuid: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Message>> {
        // SQLite treats a negative LIMIT as "no limit".
        let limit: i64 = limit.map(|l| l as i64).unwrap_or(-1);

        let rows = sqlx::query(
            r#"
            SELECT uuid, conversation_uuid, sender_uuid, text, created_at, updated_at, read_by_all
            FROM (
                SELECT * FROM messages
                WHERE conversation_uuid = ?
                ORDER BY created_at DESC, uuid DESC
                LIMIT ?
            )
            ORDER BY created_at ASC, uuid ASC
            "#,
        )
        .bind(conversation_uuid)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let read_rows = sqlx::query(
            r#"
            SELECT r.message_uuid, r.user_uuid
            FROM message_reads r
            JOIN messages m ON m.uuid = r.message_uuid
            WHERE m.conversation_uuid = ?
            ORDER BY r.user_uuid ASC
            "#,
        )
        .bind(conversation_uuid)
        .fetch_all(&self.pool)
        .await?;

        let reaction_rows = sqlx::query(
            r#"
            SELECT x.message_uuid, x.user_uuid, x.emoji
            FROM message_reactions x
            JOIN messages m ON m.uuid = x.message_uuid
            WHERE m.conversation_uuid = ?
            ORDER BY x.rowid ASC
            "#,
        )
        .bind(conversation_uuid)
        .fetch_all(&self.pool)
        .await?;

        let sender_rows = sqlx::query(
            r#"
            SELECT uuid, full_name, email FROM users
            WHERE lower(uuid) IN (
                SELECT DISTINCT lower(sender_uuid) FROM messages WHERE conversation_uuid = ?
            )
            "#,
        )
        .bind(conversation_uuid)
        .fetch_all(&self.pool)
        .await?;

        let sender_role_rows = sqlx::query(
            r#"
            SELECT user_uuid, role FROM user_roles
            WHERE lower(user_uuid) IN (
                SELECT DISTINCT lower(sender_uuid) FROM messages WHERE conversation_uuid = ?
            )
            ORDER BY role ASC
            "#,
        )
        .bind(conversation_uuid)
        .fetch_all(&self.pool)
        .await?;

        let senders: HashMap<String, User> = users_from_rows(&sender_rows, &sender_role_rows)
            .into_iter()
            .map(|u| (normalize_uuid(&u.uuid), u))
            .collect();

        let mut read_by: HashMap<String, Vec<String>> = HashMap::new();
        for row in &read_rows {
            read_by
                .entry(row.get("message_uuid"))
                .or_default()
                .push(row.get("user_uuid"));
        }

        let mut reactions: HashMap<String, Vec<Reaction>> = HashMap::new();
        for row in &reaction_rows {
            reactions
                .entry(row.get("message_uuid"))
                .or_default()
                .push(Reaction {
                    user_uuid: row.get("user_uuid"),
                    emoji: row.get("emoji"),
                });
        }

        let mut messages = Vec::with_capacity(rows.len());
        for row in &rows {
            let uuid: String = row.get("uuid");
            let sender_uuid: String = row.get("sender_uuid");
            let read_by_all: i64 = row.get("read_by_all");
            messages.push(Message {
                conversation_uuid: row.get("conversation_uuid"),
                text: row.get("text"),
                created_at: millis_to_datetime(row.get("created_at"))?,
                updated_at: millis_to_datetime(row.get("updated_at"))?,
                reactions: reactions.remove(&uuid).unwrap_or_default(),
                read_by: read_by.remove(&uuid).unwrap_or_default(),
                read_by_all: read_by_all != 0,
                sender: senders.get(&normalize_uuid(&sender_uuid)).cloned(),
                sender_uuid,
                uuid,
            });
        }

        Ok(messages)
    }

    async fn last_message_times(&self) -> Result<HashMap<String, DateTime<Utc>>> {
        let rows = sqlx::query(
            "SELECT conversation_uuid, MAX(created_at) AS last_at FROM messages GROUP BY conversation_uuid",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut out = HashMap::with_capacity(rows.len());
        for row in &rows {
            out.insert(
                row.get::<String, _>("conversation_uuid"),
                millis_to_datetime(row.get("last_at"))?,
            );
        }
        Ok(out)
    }

    async fn stats(&self) -> Result<StoreStats> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) AS users,
                (SELECT COUNT(*) FROM engagements) AS engagements,
                (SELECT COUNT(*) FROM conversations) AS conversations,
                (SELECT COUNT(*) FROM messages) AS messages,
                (SELECT COUNT(*) FROM guardian_links) AS guardian_links
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(StoreStats {
            users: row.get("users"),
            engagements: row.get("engagements"),
            conversations: row.get("conversations"),
            messages: row.get("messages"),
            guardian_links: row.get("guardian_links"),
        })
    }
}

/// Open the configured database as a [`SqliteStore`].
pub async fn open(config: &crate::config::Config) -> Result<SqliteStore> {
    let pool = crate::db::connect(config).await?;
    Ok(SqliteStore::new(pool))
}
