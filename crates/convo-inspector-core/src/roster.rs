//! Conversation roster assembly.

use std::collections::HashMap;

use serde::Serialize;

use crate::external_id::normalize_uuid;
use crate::models::{Conversation, User};

/// Label shown for participants whose user record no longer resolves.
pub const UNKNOWN_USER: &str = "Unknown user";

/// A conversation participant. `user` is `None` when the UUID is not
/// present in the fetched user set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub uuid: String,
    pub user: Option<User>,
}

impl Participant {
    pub fn display_name(&self) -> &str {
        self.user
            .as_ref()
            .and_then(|u| u.full_name.as_deref().or(u.email.as_deref()))
            .unwrap_or(UNKNOWN_USER)
    }

    pub fn roles(&self) -> &[String] {
        self.user.as_ref().map(|u| u.roles.as_slice()).unwrap_or(&[])
    }
}

/// Index users by normalized UUID for roster lookups.
pub fn index_users(users: &[User]) -> HashMap<String, &User> {
    users.iter().map(|u| (normalize_uuid(&u.uuid), u)).collect()
}

/// One participant per `user_uuids` entry, in roster order.
pub fn build_roster(
    conversation: &Conversation,
    users: &HashMap<String, &User>,
) -> Vec<Participant> {
    build_roster_for(&conversation.user_uuids, users)
}

pub fn build_roster_for(
    user_uuids: &[String],
    users: &HashMap<String, &User>,
) -> Vec<Participant> {
    user_uuids
        .iter()
        .map(|uuid| Participant {
            uuid: uuid.clone(),
            user: users.get(&normalize_uuid(uuid)).map(|u| (*u).clone()),
        })
        .collect()
}
