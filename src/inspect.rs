//! Conversation detail and message history.
//!
//! Used by the `convo show` / `convo messages` CLI commands and the
//! `GET /api/conversations/{uuid}[/messages]` endpoints.

use anyhow::{bail, Result};
use serde::Serialize;

use convo_inspector_core::models::{AnnotatedConversation, Message};
use convo_inspector_core::resolver::EngagementResolver;
use convo_inspector_core::response_time::{analyze, ResponseTimeStats};
use convo_inspector_core::roster::{build_roster, index_users, Participant, UNKNOWN_USER};
use convo_inspector_core::store::{DashboardStore, Snapshot};

use crate::config::Config;
use crate::sqlite_store;

/// A single conversation with its engagement linkage and roster.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationDetail {
    #[serde(flatten)]
    pub conversation: AnnotatedConversation,
    pub participants: Vec<Participant>,
}

/// Message history plus the mentor response-time analysis over it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesView<'a> {
    pub conversation_uuid: &'a str,
    pub messages: &'a [Message],
    /// `null` when there is not enough data for a response time.
    pub response_time: Option<ResponseTimeStats<'a>>,
}

impl<'a> MessagesView<'a> {
    pub fn new(conversation_uuid: &'a str, messages: &'a [Message]) -> Self {
        Self {
            conversation_uuid,
            messages,
            response_time: analyze(messages),
        }
    }
}

/// Fetch and annotate one conversation.
///
/// Fails with "conversation not found" when the UUID is unknown.
pub async fn conversation_detail<S: DashboardStore + ?Sized>(
    store: &S,
    uuid: &str,
) -> Result<ConversationDetail> {
    let conversation = match store.get_conversation(uuid).await? {
        Some(c) => c,
        None => bail!("conversation not found: {}", uuid),
    };

    let snapshot = Snapshot::load(store).await?;
    let pairs = snapshot.pair_index();
    let annotated = EngagementResolver::new(&snapshot.engagements, &pairs).resolve(&conversation);
    let participants = build_roster(&conversation, &index_users(&snapshot.users));

    Ok(ConversationDetail {
        conversation: annotated,
        participants,
    })
}

/// Fetch the newest `limit` messages of a conversation, oldest first.
///
/// Fails with "conversation not found" when the UUID is unknown.
pub async fn conversation_messages<S: DashboardStore + ?Sized>(
    store: &S,
    uuid: &str,
    limit: usize,
) -> Result<(String, Vec<Message>)> {
    let conversation = match store.get_conversation(uuid).await? {
        Some(c) => c,
        None => bail!("conversation not found: {}", uuid),
    };

    let messages = store.list_messages(&conversation.uuid, Some(limit)).await?;
    Ok((conversation.uuid, messages))
}

/// CLI entry point for `convo show <uuid>`.
pub async fn run_show(config: &Config, uuid: &str, json: bool) -> Result<()> {
    let store = sqlite_store::open(config).await?;
    let detail = conversation_detail(&store, uuid).await;
    store.pool().close().await;
    let detail = detail?;

    if json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
        return Ok(());
    }

    let c = &detail.conversation;
    println!("--- Conversation ---");
    println!("uuid:         {}", c.uuid);
    println!("external id:  {}", c.external_conversation_id);
    println!("type:         {}", c.kind.unwrap_or("(unrecognized)"));
    match (&c.engagement, c.engagements.len()) {
        (Some(e), _) => println!("engagement:   {} ({})", e.title, e.uuid),
        (None, 0) => println!("engagement:   (none)"),
        (None, n) => {
            println!("engagement:   (ambiguous, {} candidates)", n);
            for e in &c.engagements {
                println!("              - {} ({})", e.title, e.uuid);
            }
        }
    }
    println!();

    println!("--- Participants ({}) ---", detail.participants.len());
    for p in &detail.participants {
        let roles = p.roles().join(", ");
        println!(
            "{:<38} {:<28} {}",
            p.uuid,
            p.display_name(),
            if roles.is_empty() { "-" } else { roles.as_str() }
        );
    }

    Ok(())
}

/// CLI entry point for `convo messages <uuid>`.
pub async fn run_messages(config: &Config, uuid: &str, json: bool) -> Result<()> {
    let store = sqlite_store::open(config).await?;
    let result = conversation_messages(&store, uuid, config.dashboard.message_limit).await;
    store.pool().close().await;
    let (conversation_uuid, messages) = result?;

    let view = MessagesView::new(&conversation_uuid, &messages);

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!("--- Messages ({}) ---", messages.len());
    for m in &messages {
        let sender = m
            .sender
            .as_ref()
            .and_then(|u| u.full_name.as_deref().or(u.email.as_deref()))
            .unwrap_or(UNKNOWN_USER);
        let mentor = if m.is_from_mentor() { " [mentor]" } else { "" };
        let read = if m.read_by_all {
            "read by all".to_string()
        } else {
            format!("read by {}", m.read_by.len())
        };
        println!(
            "[{}] {}{} ({})",
            m.created_at.format("%Y-%m-%d %H:%M:%S"),
            sender,
            mentor,
            read
        );
        println!("  {}", m.text);
        if !m.reactions.is_empty() {
            let emojis: Vec<&str> = m.reactions.iter().map(|r| r.emoji.as_str()).collect();
            println!("  reactions: {}", emojis.join(" "));
        }
    }
    println!();

    println!("--- Mentor response time ---");
    match &view.response_time {
        Some(stats) => {
            println!("average:   {}", stats.average_time_formatted);
            println!("responses: {}", stats.response_count);
        }
        None => println!("insufficient data"),
    }

    Ok(())
}
