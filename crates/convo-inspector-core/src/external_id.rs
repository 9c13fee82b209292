//! Parsing of opaque external conversation identifiers.
//!
//! The chat provider encodes the conversation type in the identifier:
//!
//! | Type | Format |
//! |------|--------|
//! | `group` | `group_engagement_<engagement-uuid>` |
//! | `user` | `user_<uuid>_with_<uuid>` |
//!
//! Identifiers matching neither format are valid but carry no engagement.

use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

const UUID_PATTERN: &str =
    "[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}";

pub const GROUP_PREFIX: &str = "group_engagement_";
pub const PAIR_PREFIX: &str = "user_";
pub const PAIR_SEPARATOR: &str = "_with_";

static GROUP_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{}(?P<engagement>{})$", GROUP_PREFIX, UUID_PATTERN)).unwrap()
});

static PAIR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        "^{}(?P<first>{}){}(?P<second>{})$",
        PAIR_PREFIX, UUID_PATTERN, PAIR_SEPARATOR, UUID_PATTERN
    ))
    .unwrap()
});

/// Conversation type decoded from an external identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationKind {
    /// Engagement-wide group chat; carries the engagement UUID directly.
    Group { engagement_uuid: String },
    /// Direct chat between two users.
    Pair { first: String, second: String },
}

impl ConversationKind {
    /// Decode an external identifier. Returns `None` when it matches
    /// neither known format. Captured UUIDs are lowercased.
    pub fn parse(external_id: &str) -> Option<Self> {
        if let Some(caps) = GROUP_REGEX.captures(external_id) {
            return Some(ConversationKind::Group {
                engagement_uuid: normalize_uuid(&caps["engagement"]),
            });
        }

        PAIR_REGEX
            .captures(external_id)
            .map(|caps| ConversationKind::Pair {
                first: normalize_uuid(&caps["first"]),
                second: normalize_uuid(&caps["second"]),
            })
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ConversationKind::Group { .. } => "group",
            ConversationKind::Pair { .. } => "user",
        }
    }
}

/// Canonical lowercase hyphenated form of a UUID-shaped string.
///
/// Strings that do not parse as a UUID are lowercased as-is.
pub fn normalize_uuid(raw: &str) -> String {
    match Uuid::parse_str(raw) {
        Ok(u) => u.hyphenated().to_string(),
        Err(_) => raw.to_ascii_lowercase(),
    }
}

/// Build the external identifier for an engagement group chat.
pub fn group_id(engagement_uuid: &str) -> String {
    format!("{}{}", GROUP_PREFIX, engagement_uuid)
}

/// Build the external identifier for a direct chat.
pub fn pair_id(first: &str, second: &str) -> String {
    format!("{}{}{}{}", PAIR_PREFIX, first, PAIR_SEPARATOR, second)
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: &str = "6f1c2d3e-0000-4000-8000-00000000000a";
    const B: &str = "6f1c2d3e-0000-4000-8000-00000000000b";

    #[test]
    fn test_parse_group() {
        let kind = ConversationKind::parse(&group_id(A)).unwrap();
        assert_eq!(
            kind,
            ConversationKind::Group {
                engagement_uuid: A.to_string()
            }
        );
        assert_eq!(kind.type_name(), "group");
    }

    #[test]
    fn test_parse_pair() {
        let kind = ConversationKind::parse(&pair_id(A, B)).unwrap();
        assert_eq!(
            kind,
            ConversationKind::Pair {
                first: A.to_string(),
                second: B.to_string()
            }
        );
        assert_eq!(kind.type_name(), "user");
    }

    #[test]
    fn test_parse_uppercase_is_normalized() {
        let kind = ConversationKind::parse(&group_id(&A.to_uppercase())).unwrap();
        assert_eq!(
            kind,
            ConversationKind::Group {
                engagement_uuid: A.to_string()
            }
        );
    }

    #[test]
    fn test_unmatched_identifiers() {
        let ids = vec![
            String::new(),
            "random-channel".to_string(),
            "group_engagement_".to_string(),
            "group_engagement_not-a-uuid".to_string(),
            format!("user_{}", A),
            format!("user_{}_and_{}", A, B),
            format!("{}_with_{}", A, B),
            format!("xgroup_engagement_{}", A),
            format!("group_engagement_{}-extra", A),
            format!(" {}", group_id(A)),
            format!("{}\n", pair_id(A, B)),
        ];
        for id in &ids {
            assert!(ConversationKind::parse(id).is_none(), "matched: {}", id);
        }
    }
}
