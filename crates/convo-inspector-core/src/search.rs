//! Conversation search for the dashboard list view.
//!
//! Filtering runs over conversations that have already been annotated by
//! the [resolver](crate::resolver), so engagement terms can match group
//! chats and direct chats alike.
//!
//! # Matching
//!
//! | Term | Matches (case-insensitive) |
//! |------|----------------------------|
//! | `engagement` | candidate engagement UUID (exact or prefix) or title (substring) |
//! | `participant` | participant UUID (exact or prefix), full name, or email (substring) |
//!
//! Blank terms are ignored; when both are given, both must match. Hits are
//! ordered by most recent activity, then by UUID.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::external_id::ConversationKind;
use crate::models::{AnnotatedConversation, User};
use crate::roster::{build_roster_for, Participant};

#[derive(Debug, Clone, Default)]
pub struct ConversationFilter {
    pub engagement: Option<String>,
    pub participant: Option<String>,
}

impl ConversationFilter {
    fn engagement_term(&self) -> Option<String> {
        normalize_term(self.engagement.as_deref())
    }

    fn participant_term(&self) -> Option<String> {
        normalize_term(self.participant.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.engagement_term().is_none() && self.participant_term().is_none()
    }
}

fn normalize_term(raw: Option<&str>) -> Option<String> {
    raw.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty())
}

/// A conversation in the list view, with its resolved roster.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationListItem {
    #[serde(flatten)]
    pub conversation: AnnotatedConversation,
    pub participants: Vec<Participant>,
    pub last_message_at: Option<DateTime<Utc>>,
}

pub fn matches_engagement(conversation: &AnnotatedConversation, term: &str) -> bool {
    let by_candidate = conversation.engagements.iter().any(|e| {
        let uuid = e.uuid.to_lowercase();
        uuid.starts_with(term) || e.title.to_lowercase().contains(term)
    });
    if by_candidate {
        return true;
    }

    // Group chats whose engagement is missing from the fetched set still
    // carry the UUID in their identifier.
    match ConversationKind::parse(&conversation.external_conversation_id) {
        Some(ConversationKind::Group { engagement_uuid }) => engagement_uuid.starts_with(term),
        _ => false,
    }
}

pub fn matches_participant(participants: &[Participant], term: &str) -> bool {
    participants.iter().any(|p| {
        if p.uuid.to_lowercase().starts_with(term) {
            return true;
        }
        match &p.user {
            Some(u) => {
                u.full_name
                    .as_deref()
                    .is_some_and(|n| n.to_lowercase().contains(term))
                    || u.email
                        .as_deref()
                        .is_some_and(|e| e.to_lowercase().contains(term))
            }
            None => false,
        }
    })
}

/// Filter, order, and truncate annotated conversations.
///
/// `last_activity` maps conversation UUID to its newest message time;
/// conversations without messages sort last.
pub fn search_conversations(
    conversations: Vec<AnnotatedConversation>,
    users: &[User],
    last_activity: &HashMap<String, DateTime<Utc>>,
    filter: &ConversationFilter,
    limit: usize,
) -> Vec<ConversationListItem> {
    let engagement_term = filter.engagement_term();
    let participant_term = filter.participant_term();
    let users_by_uuid = crate::roster::index_users(users);

    let mut hits: Vec<ConversationListItem> = conversations
        .into_iter()
        .filter(|c| {
            engagement_term
                .as_deref()
                .map_or(true, |t| matches_engagement(c, t))
        })
        .filter_map(|c| {
            let participants = build_roster_for(&c.user_uuids, &users_by_uuid);
            if let Some(t) = participant_term.as_deref() {
                if !matches_participant(&participants, t) {
                    return None;
                }
            }
            let last_message_at = last_activity.get(&c.uuid).copied();
            Some(ConversationListItem {
                conversation: c,
                participants,
                last_message_at,
            })
        })
        .collect();

    hits.sort_by(|a, b| {
        b.last_message_at
            .cmp(&a.last_message_at)
            .then(a.conversation.uuid.cmp(&b.conversation.uuid))
    });
    hits.truncate(limit);
    hits
}
