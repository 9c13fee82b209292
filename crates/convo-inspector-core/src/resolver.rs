//! Conversation-to-engagement resolution.
//!
//! Every conversation is annotated with `engagement_uuid`, `engagement`, and
//! `engagements` according to its external identifier:
//!
//! 1. **Group** identifiers embed an engagement UUID, which is looked up
//!    directly in the fetched engagement set.
//! 2. **Pair** identifiers embed two user UUIDs, which are looked up in a
//!    [`PairIndex`] mapping unordered user pairs to the engagements that
//!    connect them.
//! 3. Anything else resolves to nothing.
//!
//! # Eligible participants
//!
//! An engagement connects every pair drawn from its eligible participants:
//! members holding the `mentor`, `student`, or `guardian` role, plus every
//! guardian linked to a student member (member or not).
//!
//! # Ambiguity
//!
//! A pair connected by exactly one engagement resolves to it. A pair
//! connected by several keeps `engagement` and `engagement_uuid` empty and
//! lists all candidates in `engagements`.

use std::collections::{BTreeSet, HashMap};

use crate::external_id::{normalize_uuid, ConversationKind};
use crate::models::{
    AnnotatedConversation, Conversation, Engagement, EngagementMembership, EngagementRef,
    GuardianLink, User, ROLE_GUARDIAN, ROLE_MENTOR, ROLE_STUDENT,
};

/// Unordered pair of normalized user UUIDs, stored as `(min, max)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PairKey(String, String);

impl PairKey {
    fn new(a: &str, b: &str) -> Option<Self> {
        let a = normalize_uuid(a);
        let b = normalize_uuid(b);
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(PairKey(a, b)),
            std::cmp::Ordering::Greater => Some(PairKey(b, a)),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// Symmetric lookup table from user pairs to connecting engagements.
///
/// Built once per batch of conversations and passed to
/// [`EngagementResolver`]. Each pair lists distinct engagements in the
/// order they were supplied to [`PairIndex::build`].
#[derive(Debug, Default)]
pub struct PairIndex {
    pairs: HashMap<PairKey, Vec<EngagementRef>>,
}

impl PairIndex {
    pub fn build(
        engagements: &[Engagement],
        memberships: &[EngagementMembership],
        users: &[User],
        guardian_links: &[GuardianLink],
    ) -> Self {
        let users_by_uuid: HashMap<String, &User> = users
            .iter()
            .map(|u| (normalize_uuid(&u.uuid), u))
            .collect();

        let mut guardians_of: HashMap<String, Vec<String>> = HashMap::new();
        for link in guardian_links {
            guardians_of
                .entry(normalize_uuid(&link.student_uuid))
                .or_default()
                .push(normalize_uuid(&link.guardian_uuid));
        }

        let mut members_of: HashMap<String, Vec<String>> = HashMap::new();
        for m in memberships {
            members_of
                .entry(normalize_uuid(&m.engagement_uuid))
                .or_default()
                .push(normalize_uuid(&m.user_uuid));
        }

        let mut pairs: HashMap<PairKey, Vec<EngagementRef>> = HashMap::new();

        for engagement in engagements {
            let members = match members_of.get(&normalize_uuid(&engagement.uuid)) {
                Some(m) => m,
                None => continue,
            };

            let eligible = eligible_participants(members, &users_by_uuid, &guardians_of);
            let ordered: Vec<&String> = eligible.iter().collect();

            for i in 0..ordered.len() {
                for j in (i + 1)..ordered.len() {
                    let key = PairKey(ordered[i].clone(), ordered[j].clone());
                    let list = pairs.entry(key).or_default();
                    if !list.iter().any(|e| e.uuid == engagement.uuid) {
                        list.push(EngagementRef::from(engagement));
                    }
                }
            }
        }

        tracing::debug!(
            engagements = engagements.len(),
            pairs = pairs.len(),
            "built engagement pair index"
        );

        Self { pairs }
    }

    /// Engagements connecting `a` and `b`, in either order.
    pub fn lookup(&self, a: &str, b: &str) -> &[EngagementRef] {
        PairKey::new(a, b)
            .and_then(|key| self.pairs.get(&key))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Combined eligible set for one engagement, in a fixed (sorted) order.
fn eligible_participants(
    members: &[String],
    users_by_uuid: &HashMap<String, &User>,
    guardians_of: &HashMap<String, Vec<String>>,
) -> BTreeSet<String> {
    let mut eligible = BTreeSet::new();

    for member in members {
        let user = match users_by_uuid.get(member) {
            Some(u) => u,
            None => continue,
        };

        if user.has_role(ROLE_MENTOR) || user.has_role(ROLE_GUARDIAN) {
            eligible.insert(member.clone());
        }

        if user.has_role(ROLE_STUDENT) {
            eligible.insert(member.clone());
            if let Some(guardians) = guardians_of.get(member) {
                eligible.extend(guardians.iter().cloned());
            }
        }
    }

    eligible
}

/// Resolves conversations against a fetched engagement set and a
/// pre-built [`PairIndex`].
pub struct EngagementResolver<'a> {
    engagements_by_uuid: HashMap<String, &'a Engagement>,
    pairs: &'a PairIndex,
}

impl<'a> EngagementResolver<'a> {
    pub fn new(engagements: &'a [Engagement], pairs: &'a PairIndex) -> Self {
        let engagements_by_uuid = engagements
            .iter()
            .map(|e| (normalize_uuid(&e.uuid), e))
            .collect();
        Self {
            engagements_by_uuid,
            pairs,
        }
    }

    pub fn resolve(&self, conversation: &Conversation) -> AnnotatedConversation {
        let kind = conversation.kind();

        let candidates: Vec<EngagementRef> = match &kind {
            Some(ConversationKind::Group { engagement_uuid }) => self
                .engagements_by_uuid
                .get(engagement_uuid)
                .map(|e| vec![EngagementRef::from(*e)])
                .unwrap_or_default(),
            Some(ConversationKind::Pair { first, second }) => {
                self.pairs.lookup(first, second).to_vec()
            }
            None => Vec::new(),
        };

        let engagement = match candidates.as_slice() {
            [only] => Some(only.clone()),
            [] => None,
            many => {
                tracing::debug!(
                    conversation = %conversation.uuid,
                    candidates = many.len(),
                    "ambiguous engagement for direct conversation"
                );
                None
            }
        };

        AnnotatedConversation {
            uuid: conversation.uuid.clone(),
            user_uuids: conversation.user_uuids.clone(),
            external_conversation_id: conversation.external_conversation_id.clone(),
            kind: kind.as_ref().map(ConversationKind::type_name),
            engagement_uuid: engagement.as_ref().map(|e| e.uuid.clone()),
            engagement,
            engagements: candidates,
        }
    }

    pub fn resolve_all(&self, conversations: &[Conversation]) -> Vec<AnnotatedConversation> {
        conversations.iter().map(|c| self.resolve(c)).collect()
    }
}

/// Annotate a batch of conversations in one call.
///
/// Builds a fresh [`PairIndex`] scoped to this batch.
pub fn resolve(
    conversations: &[Conversation],
    engagements: &[Engagement],
    memberships: &[EngagementMembership],
    users: &[User],
    guardian_links: &[GuardianLink],
) -> Vec<AnnotatedConversation> {
    let pairs = PairIndex::build(engagements, memberships, users, guardian_links);
    EngagementResolver::new(engagements, &pairs).resolve_all(conversations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external_id::{group_id, pair_id};

    const MENTOR: &str = "00000000-0000-4000-8000-000000000001";
    const STUDENT: &str = "00000000-0000-4000-8000-000000000002";
    const GUARDIAN: &str = "00000000-0000-4000-8000-000000000003";
    const OTHER_MENTOR: &str = "00000000-0000-4000-8000-000000000004";
    const OUTSIDER: &str = "00000000-0000-4000-8000-000000000005";
    const MEMBER_GUARDIAN: &str = "00000000-0000-4000-8000-000000000006";
    const ENG_A: &str = "aaaaaaaa-0000-4000-8000-000000000001";
    const ENG_B: &str = "bbbbbbbb-0000-4000-8000-000000000002";

    fn user(uuid: &str, roles: &[&str]) -> User {
        User {
            uuid: uuid.to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            full_name: None,
            email: None,
        }
    }

    fn engagement(uuid: &str, title: &str) -> Engagement {
        Engagement {
            uuid: uuid.to_string(),
            title: title.to_string(),
        }
    }

    fn member(engagement_uuid: &str, user_uuid: &str) -> EngagementMembership {
        EngagementMembership {
            engagement_uuid: engagement_uuid.to_string(),
            user_uuid: user_uuid.to_string(),
        }
    }

    fn conversation(uuid: &str, external_id: String) -> Conversation {
        Conversation {
            uuid: uuid.to_string(),
            user_uuids: Vec::new(),
            external_conversation_id: external_id,
        }
    }

    fn users() -> Vec<User> {
        vec![
            user(MENTOR, &["mentor"]),
            user(STUDENT, &["student"]),
            user(GUARDIAN, &["guardian"]),
            user(OTHER_MENTOR, &["mentor"]),
            user(OUTSIDER, &[]),
            user(MEMBER_GUARDIAN, &["guardian"]),
        ]
    }

    fn links() -> Vec<GuardianLink> {
        vec![GuardianLink {
            guardian_uuid: GUARDIAN.to_string(),
            student_uuid: STUDENT.to_string(),
        }]
    }

    #[test]
    fn test_group_conversation_resolves_directly() {
        let engagements = vec![engagement(ENG_A, "Robotics")];
        let convs = vec![conversation("c1", group_id(ENG_A))];

        let out = resolve(&convs, &engagements, &[], &[], &[]);
        assert_eq!(out[0].kind, Some("group"));
        assert_eq!(out[0].engagement_uuid.as_deref(), Some(ENG_A));
        assert_eq!(out[0].engagement.as_ref().unwrap().title, "Robotics");
        assert_eq!(out[0].engagements.len(), 1);
    }

    #[test]
    fn test_group_conversation_unknown_engagement() {
        let engagements = vec![engagement(ENG_A, "Robotics")];
        let convs = vec![conversation("c1", group_id(ENG_B))];

        let out = resolve(&convs, &engagements, &[], &[], &[]);
        assert_eq!(out[0].kind, Some("group"));
        assert!(out[0].engagement_uuid.is_none());
        assert!(out[0].engagement.is_none());
        assert!(out[0].engagements.is_empty());
    }

    #[test]
    fn test_pair_single_match() {
        let engagements = vec![engagement(ENG_A, "Robotics")];
        let memberships = vec![member(ENG_A, MENTOR), member(ENG_A, STUDENT)];
        let convs = vec![conversation("c1", pair_id(STUDENT, MENTOR))];

        let out = resolve(&convs, &engagements, &memberships, &users(), &links());
        assert_eq!(out[0].kind, Some("user"));
        assert_eq!(out[0].engagement_uuid.as_deref(), Some(ENG_A));
        assert_eq!(out[0].engagements.len(), 1);
    }

    #[test]
    fn test_pair_ambiguous_keeps_all_candidates() {
        let engagements = vec![engagement(ENG_A, "Robotics"), engagement(ENG_B, "Chess")];
        let memberships = vec![
            member(ENG_A, MENTOR),
            member(ENG_A, STUDENT),
            member(ENG_B, MENTOR),
            member(ENG_B, STUDENT),
        ];
        let convs = vec![conversation("c1", pair_id(MENTOR, STUDENT))];

        let out = resolve(&convs, &engagements, &memberships, &users(), &links());
        assert!(out[0].engagement.is_none());
        assert!(out[0].engagement_uuid.is_none());
        let uuids: Vec<&str> = out[0].engagements.iter().map(|e| e.uuid.as_str()).collect();
        assert_eq!(uuids, vec![ENG_A, ENG_B]);
    }

    #[test]
    fn test_pair_no_match() {
        let engagements = vec![engagement(ENG_A, "Robotics")];
        let memberships = vec![member(ENG_A, MENTOR), member(ENG_A, STUDENT)];
        let convs = vec![conversation("c1", pair_id(MENTOR, OTHER_MENTOR))];

        let out = resolve(&convs, &engagements, &memberships, &users(), &links());
        assert!(out[0].engagement.is_none());
        assert!(out[0].engagement_uuid.is_none());
        assert!(out[0].engagements.is_empty());
    }

    #[test]
    fn test_guardian_of_member_student_is_eligible() {
        let engagements = vec![engagement(ENG_A, "Robotics")];
        // GUARDIAN is not a member; linked to STUDENT, who is.
        let memberships = vec![member(ENG_A, MENTOR), member(ENG_A, STUDENT)];
        let convs = vec![conversation("c1", pair_id(GUARDIAN, MENTOR))];

        let out = resolve(&convs, &engagements, &memberships, &users(), &links());
        assert_eq!(out[0].engagement_uuid.as_deref(), Some(ENG_A));
    }

    #[test]
    fn test_guardian_role_member_is_eligible() {
        let engagements = vec![engagement(ENG_A, "Robotics")];
        let memberships = vec![member(ENG_A, MENTOR), member(ENG_A, MEMBER_GUARDIAN)];
        let convs = vec![conversation("c1", pair_id(MEMBER_GUARDIAN, MENTOR))];

        let out = resolve(&convs, &engagements, &memberships, &users(), &links());
        assert_eq!(out[0].engagement_uuid.as_deref(), Some(ENG_A));
    }

    #[test]
    fn test_roleless_member_is_not_eligible() {
        let engagements = vec![engagement(ENG_A, "Robotics")];
        let memberships = vec![member(ENG_A, MENTOR), member(ENG_A, OUTSIDER)];
        let convs = vec![conversation("c1", pair_id(OUTSIDER, MENTOR))];

        let out = resolve(&convs, &engagements, &memberships, &users(), &links());
        assert!(out[0].engagements.is_empty());
    }

    #[test]
    fn test_redundant_membership_rows_do_not_duplicate() {
        let engagements = vec![engagement(ENG_A, "Robotics")];
        let memberships = vec![
            member(ENG_A, MENTOR),
            member(ENG_A, STUDENT),
            member(ENG_A, STUDENT),
            member(ENG_A, MENTOR),
        ];
        let convs = vec![conversation("c1", pair_id(MENTOR, STUDENT))];

        let out = resolve(&convs, &engagements, &memberships, &users(), &links());
        assert_eq!(out[0].engagements.len(), 1);
        assert_eq!(out[0].engagement_uuid.as_deref(), Some(ENG_A));
    }

    #[test]
    fn test_unmatched_identifier_resolves_to_nothing() {
        let engagements = vec![engagement(ENG_A, "Robotics")];
        let convs = vec![conversation("c1", "legacy-channel-42".to_string())];

        let out = resolve(&convs, &engagements, &[], &users(), &[]);
        assert!(out[0].kind.is_none());
        assert!(out[0].engagement.is_none());
        assert!(out[0].engagements.is_empty());
    }

    #[test]
    fn test_pair_index_is_symmetric() {
        let engagements = vec![engagement(ENG_A, "Robotics")];
        let memberships = vec![member(ENG_A, MENTOR), member(ENG_A, STUDENT)];
        let index = PairIndex::build(&engagements, &memberships, &users(), &links());

        assert_eq!(index.lookup(MENTOR, STUDENT), index.lookup(STUDENT, MENTOR));
        assert_eq!(index.lookup(MENTOR, STUDENT).len(), 1);
        assert!(index.lookup(MENTOR, MENTOR).is_empty());
        // mentor, student, and the student's guardian: three pairs
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_resolution_is_order_independent() {
        let engagements = vec![engagement(ENG_A, "Robotics"), engagement(ENG_B, "Chess")];
        let memberships = vec![
            member(ENG_A, MENTOR),
            member(ENG_A, STUDENT),
            member(ENG_B, OTHER_MENTOR),
            member(ENG_B, STUDENT),
        ];
        let c1 = conversation("c1", pair_id(MENTOR, STUDENT));
        let c2 = conversation("c2", pair_id(OTHER_MENTOR, GUARDIAN));

        let forward = resolve(
            &[c1.clone(), c2.clone()],
            &engagements,
            &memberships,
            &users(),
            &links(),
        );
        let backward = resolve(&[c2, c1], &engagements, &memberships, &users(), &links());

        assert_eq!(forward[0], backward[1]);
        assert_eq!(forward[1], backward[0]);
        assert_eq!(forward[1].engagement_uuid.as_deref(), Some(ENG_B));
    }

    #[test]
    fn test_self_pair_resolves_to_nothing() {
        let engagements = vec![engagement(ENG_A, "Robotics")];
        let memberships = vec![member(ENG_A, MENTOR), member(ENG_A, STUDENT)];
        let convs = vec![conversation("c1", pair_id(MENTOR, MENTOR))];

        let out = resolve(&convs, &engagements, &memberships, &users(), &links());
        assert_eq!(out[0].kind, Some("user"));
        assert!(out[0].engagements.is_empty());
    }

    #[test]
    fn test_uppercase_identifier_matches() {
        let engagements = vec![engagement(ENG_A, "Robotics")];
        let memberships = vec![member(ENG_A, MENTOR), member(ENG_A, STUDENT)];
        let external = format!("user_{}_with_{}", MENTOR.to_uppercase(), STUDENT);
        let convs = vec![conversation("c1", external)];

        let out = resolve(&convs, &engagements, &memberships, &users(), &links());
        assert_eq!(out[0].engagement_uuid.as_deref(), Some(ENG_A));
    }
}
