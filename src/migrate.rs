use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        uuid TEXT PRIMARY KEY,
        full_name TEXT,
        email TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_roles (
        user_uuid TEXT NOT NULL,
        role TEXT NOT NULL,
        PRIMARY KEY (user_uuid, role),
        FOREIGN KEY (user_uuid) REFERENCES users(uuid)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS guardian_links (
        guardian_uuid TEXT NOT NULL,
        student_uuid TEXT NOT NULL,
        PRIMARY KEY (guardian_uuid, student_uuid)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS engagements (
        uuid TEXT PRIMARY KEY,
        title TEXT NOT NULL
    )
    "#,
    // Membership rows are not unique per (engagement, user).
    r#"
    CREATE TABLE IF NOT EXISTS engagement_members (
        engagement_uuid TEXT NOT NULL,
        user_uuid TEXT NOT NULL,
        FOREIGN KEY (engagement_uuid) REFERENCES engagements(uuid)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS conversations (
        uuid TEXT PRIMARY KEY,
        external_conversation_id TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS conversation_users (
        conversation_uuid TEXT NOT NULL,
        user_uuid TEXT NOT NULL,
        position INTEGER NOT NULL,
        PRIMARY KEY (conversation_uuid, user_uuid),
        FOREIGN KEY (conversation_uuid) REFERENCES conversations(uuid)
    )
    "#,
    // sender_uuid has no foreign key; senders may no longer exist.
    r#"
    CREATE TABLE IF NOT EXISTS messages (
        uuid TEXT PRIMARY KEY,
        conversation_uuid TEXT NOT NULL,
        sender_uuid TEXT NOT NULL,
        text TEXT NOT NULL DEFAULT '',
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        read_by_all INTEGER NOT NULL DEFAULT 0,
        FOREIGN KEY (conversation_uuid) REFERENCES conversations(uuid)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS message_reads (
        message_uuid TEXT NOT NULL,
        user_uuid TEXT NOT NULL,
        PRIMARY KEY (message_uuid, user_uuid),
        FOREIGN KEY (message_uuid) REFERENCES messages(uuid)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS message_reactions (
        message_uuid TEXT NOT NULL,
        user_uuid TEXT NOT NULL,
        emoji TEXT NOT NULL,
        PRIMARY KEY (message_uuid, user_uuid, emoji),
        FOREIGN KEY (message_uuid) REFERENCES messages(uuid)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_engagement_members_engagement ON engagement_members(engagement_uuid)",
    "CREATE INDEX IF NOT EXISTS idx_guardian_links_student ON guardian_links(student_uuid)",
    "CREATE INDEX IF NOT EXISTS idx_conversation_users_user ON conversation_users(user_uuid)",
    "CREATE INDEX IF NOT EXISTS idx_messages_conversation_created ON messages(conversation_uuid, created_at)",
];

/// Create all tables and indexes. Idempotent.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    tracing::info!(statements = SCHEMA.len(), "schema applied");
    Ok(())
}
