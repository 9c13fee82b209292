//! Snapshot import.
//!
//! Loads a JSON snapshot of users, guardian links, engagements (with their
//! members), conversations, and messages into the SQLite store. Records
//! are upserted by UUID inside a single transaction, and child rows (roles,
//! memberships, rosters, reads, reactions) are replaced, so re-importing
//! the same file is idempotent.
//!
//! ```json
//! {
//!   "users": [{ "uuid": "...", "roles": ["mentor"], "fullName": "Ada", "email": "ada@example.org" }],
//!   "guardianLinks": [{ "guardianUuid": "...", "studentUuid": "..." }],
//!   "engagements": [{ "uuid": "...", "title": "Robotics", "members": ["..."] }],
//!   "conversations": [{ "uuid": "...", "userUuids": ["..."], "externalConversationId": "..." }],
//!   "messages": [{ "uuid": "...", "conversationUuid": "...", "senderUuid": "...",
//!                  "text": "hi", "createdAt": "2024-03-01T09:00:00Z" }]
//! }
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::SqlitePool;

use convo_inspector_core::models::{Conversation, GuardianLink, Reaction, User};

use crate::config::Config;
use crate::{db, migrate};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotFile {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub guardian_links: Vec<GuardianLink>,
    #[serde(default)]
    pub engagements: Vec<SnapshotEngagement>,
    #[serde(default)]
    pub conversations: Vec<Conversation>,
    #[serde(default)]
    pub messages: Vec<SnapshotMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEngagement {
    pub uuid: String,
    pub title: String,
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMessage {
    pub uuid: String,
    pub conversation_uuid: String,
    pub sender_uuid: String,
    #[serde(default)]
    pub text: String,
    pub created_at: DateTime<Utc>,
    /// Defaults to `created_at`.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    #[serde(default)]
    pub read_by: Vec<String>,
    #[serde(default)]
    pub read_by_all: bool,
}

/// Row counts written by an import.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub users: usize,
    pub guardian_links: usize,
    pub engagements: usize,
    pub memberships: usize,
    pub conversations: usize,
    pub messages: usize,
}

pub fn read_snapshot(path: &Path) -> Result<SnapshotFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse snapshot: {}", path.display()))
}

/// Write a snapshot into the database in one transaction.
pub async fn import_snapshot(pool: &SqlitePool, snapshot: &SnapshotFile) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();
    let mut tx = pool.begin().await?;

    for user in &snapshot.users {
        sqlx::query(
            r#"
            INSERT INTO users (uuid, full_name, email) VALUES (?, ?, ?)
            ON CONFLICT(uuid) DO UPDATE SET
                full_name = excluded.full_name,
                email = excluded.email
            "#,
        )
        .bind(&user.uuid)
        .bind(&user.full_name)
        .bind(&user.email)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM user_roles WHERE user_uuid = ?")
            .bind(&user.uuid)
            .execute(&mut *tx)
            .await?;

        for role in &user.roles {
            sqlx::query("INSERT OR IGNORE INTO user_roles (user_uuid, role) VALUES (?, ?)")
                .bind(&user.uuid)
                .bind(role.to_lowercase())
                .execute(&mut *tx)
                .await?;
        }
        summary.users += 1;
    }

    for link in &snapshot.guardian_links {
        sqlx::query(
            "INSERT OR IGNORE INTO guardian_links (guardian_uuid, student_uuid) VALUES (?, ?)",
        )
        .bind(&link.guardian_uuid)
        .bind(&link.student_uuid)
        .execute(&mut *tx)
        .await?;
        summary.guardian_links += 1;
    }

    for engagement in &snapshot.engagements {
        sqlx::query(
            r#"
            INSERT INTO engagements (uuid, title) VALUES (?, ?)
            ON CONFLICT(uuid) DO UPDATE SET title = excluded.title
            "#,
        )
        .bind(&engagement.uuid)
        .bind(&engagement.title)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM engagement_members WHERE engagement_uuid = ?")
            .bind(&engagement.uuid)
            .execute(&mut *tx)
            .await?;

        for member in &engagement.members {
            sqlx::query("INSERT INTO engagement_members (engagement_uuid, user_uuid) VALUES (?, ?)")
                .bind(&engagement.uuid)
                .bind(member)
                .execute(&mut *tx)
                .await?;
            summary.memberships += 1;
        }
        summary.engagements += 1;
    }

    for conversation in &snapshot.conversations {
        sqlx::query(
            r#"
            INSERT INTO conversations (uuid, external_conversation_id) VALUES (?, ?)
            ON CONFLICT(uuid) DO UPDATE SET
                external_conversation_id = excluded.external_conversation_id
            "#,
        )
        .bind(&conversation.uuid)
        .bind(&conversation.external_conversation_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM conversation_users WHERE conversation_uuid = ?")
            .bind(&conversation.uuid)
            .execute(&mut *tx)
            .await?;

        for (position, user_uuid) in conversation.user_uuids.iter().enumerate() {
            sqlx::query(
                "INSERT OR IGNORE INTO conversation_users (conversation_uuid, user_uuid, position) VALUES (?, ?, ?)",
            )
            .bind(&conversation.uuid)
            .bind(user_uuid)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }
        summary.conversations += 1;
    }

    for message in &snapshot.messages {
        let created_at = message.created_at.timestamp_millis();
        let updated_at = message
            .updated_at
            .unwrap_or(message.created_at)
            .timestamp_millis();

        sqlx::query(
            r#"
            INSERT INTO messages (uuid, conversation_uuid, sender_uuid, text, created_at, updated_at, read_by_all)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(uuid) DO UPDATE SET
                conversation_uuid = excluded.conversation_uuid,
                sender_uuid = excluded.sender_uuid,
                text = excluded.text,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at,
                read_by_all = excluded.read_by_all
            "#,
        )
        .bind(&message.uuid)
        .bind(&message.conversation_uuid)
        .bind(&message.sender_uuid)
        .bind(&message.text)
        .bind(created_at)
        .bind(updated_at)
        .bind(message.read_by_all as i64)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to import message {}", message.uuid))?;

        sqlx::query("DELETE FROM message_reads WHERE message_uuid = ?")
            .bind(&message.uuid)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM message_reactions WHERE message_uuid = ?")
            .bind(&message.uuid)
            .execute(&mut *tx)
            .await?;

        for reader in &message.read_by {
            sqlx::query("INSERT OR IGNORE INTO message_reads (message_uuid, user_uuid) VALUES (?, ?)")
                .bind(&message.uuid)
                .bind(reader)
                .execute(&mut *tx)
                .await?;
        }

        for reaction in &message.reactions {
            sqlx::query(
                "INSERT OR IGNORE INTO message_reactions (message_uuid, user_uuid, emoji) VALUES (?, ?, ?)",
            )
            .bind(&message.uuid)
            .bind(&reaction.user_uuid)
            .bind(&reaction.emoji)
            .execute(&mut *tx)
            .await?;
        }
        summary.messages += 1;
    }

    tx.commit().await?;
    Ok(summary)
}

/// CLI entry point for `convo import <file>`. Applies the schema first.
pub async fn run_import(config: &Config, path: &Path) -> Result<()> {
    let snapshot = read_snapshot(path)?;
    let pool = db::connect(config).await?;
    migrate::apply_schema(&pool).await?;
    let summary = import_snapshot(&pool, &snapshot).await?;
    pool.close().await;

    tracing::info!(
        users = summary.users,
        engagements = summary.engagements,
        conversations = summary.conversations,
        messages = summary.messages,
        "snapshot imported"
    );

    println!("Import of {} complete:", path.display());
    println!("  users:          {}", summary.users);
    println!("  guardian links: {}", summary.guardian_links);
    println!("  engagements:    {}", summary.engagements);
    println!("  memberships:    {}", summary.memberships);
    println!("  conversations:  {}", summary.conversations);
    println!("  messages:       {}", summary.messages);

    Ok(())
}
