//! Conversation search.
//!
//! Fetches conversations and the resolver inputs through a
//! [`DashboardStore`], annotates every conversation with its engagement
//! linkage, then filters and orders them for the list view. Used by both
//! the `convo conversations` CLI command and `GET /api/conversations`.

use anyhow::Result;

use convo_inspector_core::resolver::EngagementResolver;
use convo_inspector_core::search::{search_conversations, ConversationFilter, ConversationListItem};
use convo_inspector_core::store::{DashboardStore, Snapshot};

use crate::config::Config;
use crate::sqlite_store;

/// Core search function returning structured data (used by CLI and server).
pub async fn search<S: DashboardStore + ?Sized>(
    store: &S,
    filter: &ConversationFilter,
    limit: usize,
) -> Result<Vec<ConversationListItem>> {
    let conversations = store.list_conversations().await?;
    let snapshot = Snapshot::load(store).await?;
    let activity = store.last_message_times().await?;

    let pairs = snapshot.pair_index();
    let annotated =
        EngagementResolver::new(&snapshot.engagements, &pairs).resolve_all(&conversations);

    let hits = search_conversations(annotated, &snapshot.users, &activity, filter, limit);

    tracing::debug!(
        total = conversations.len(),
        hits = hits.len(),
        "conversation search"
    );

    Ok(hits)
}

/// CLI entry point: runs a search and prints a table or JSON.
pub async fn run_conversations(
    config: &Config,
    engagement: Option<String>,
    participant: Option<String>,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let store = sqlite_store::open(config).await?;
    let filter = ConversationFilter {
        engagement,
        participant,
    };
    let limit = config.dashboard.effective_limit(limit);
    let hits = search(&store, &filter, limit).await?;
    store.pool().close().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!("No conversations found.");
        return Ok(());
    }

    println!(
        "{:<38} {:<6} {:<32} {:<18} PARTICIPANTS",
        "CONVERSATION", "TYPE", "ENGAGEMENT", "LAST MESSAGE"
    );
    println!("{}", "-".repeat(120));

    for hit in &hits {
        let c = &hit.conversation;
        let engagement = match (&c.engagement, c.engagements.len()) {
            (Some(e), _) => e.title.clone(),
            (None, 0) => "-".to_string(),
            (None, n) => format!("(ambiguous: {} engagements)", n),
        };
        let last = hit
            .last_message_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".to_string());
        let names: Vec<&str> = hit.participants.iter().map(|p| p.display_name()).collect();

        println!(
            "{:<38} {:<6} {:<32} {:<18} {}",
            c.uuid,
            c.kind.unwrap_or("-"),
            truncate(&engagement, 32),
            last,
            names.join(", ")
        );
    }

    println!();
    println!("{} conversation(s)", hits.len());

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}
