//! Core data models used throughout Convo Inspector.
//!
//! These are read-only snapshots of the records held by the external data
//! store: users and their roles, guardian relationships, engagements and
//! their membership rows, conversations, and messages. Field names serialize
//! in camelCase to match the dashboard's JSON API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::external_id::ConversationKind;

pub const ROLE_MENTOR: &str = "mentor";
pub const ROLE_STUDENT: &str = "student";
pub const ROLE_GUARDIAN: &str = "guardian";

/// A dashboard user. A user may hold several roles at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub uuid: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl User {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    pub fn is_mentor(&self) -> bool {
        self.has_role(ROLE_MENTOR)
    }
}

/// Directed relation: `guardian_uuid` is a guardian of `student_uuid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardianLink {
    pub guardian_uuid: String,
    pub student_uuid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Engagement {
    pub uuid: String,
    pub title: String,
}

/// One row of the engagement-membership relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementMembership {
    pub engagement_uuid: String,
    pub user_uuid: String,
}

/// The `{uuid, title}` projection of an engagement attached to conversations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementRef {
    pub uuid: String,
    pub title: String,
}

impl From<&Engagement> for EngagementRef {
    fn from(e: &Engagement) -> Self {
        Self {
            uuid: e.uuid.clone(),
            title: e.title.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub uuid: String,
    /// Participant UUIDs in roster order.
    #[serde(default)]
    pub user_uuids: Vec<String>,
    pub external_conversation_id: String,
}

impl Conversation {
    /// Classify the conversation from its external identifier.
    pub fn kind(&self) -> Option<ConversationKind> {
        ConversationKind::parse(&self.external_conversation_id)
    }
}

/// A conversation annotated with its resolved engagement linkage.
///
/// `engagement` and `engagement_uuid` are only set when exactly one
/// engagement matches; `engagements` always carries every candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedConversation {
    pub uuid: String,
    pub user_uuids: Vec<String>,
    pub external_conversation_id: String,
    /// `"group"`, `"user"`, or `null` for unrecognized identifiers.
    #[serde(rename = "type")]
    pub kind: Option<&'static str>,
    pub engagement_uuid: Option<String>,
    pub engagement: Option<EngagementRef>,
    pub engagements: Vec<EngagementRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    pub user_uuid: String,
    pub emoji: String,
}

/// A chat message with its sender resolved (or `None` when the sender
/// no longer exists in the user table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub uuid: String,
    pub conversation_uuid: String,
    pub sender_uuid: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    #[serde(default)]
    pub read_by: Vec<String>,
    #[serde(default)]
    pub read_by_all: bool,
    #[serde(default)]
    pub sender: Option<User>,
}

impl Message {
    /// True when the resolved sender carries the mentor role.
    ///
    /// Unresolved senders are never mentors.
    pub fn is_from_mentor(&self) -> bool {
        self.sender.as_ref().is_some_and(User::is_mentor)
    }
}
