//! Helix `users` and `users/follows` types.

use serde::{Deserialize, Serialize};

/// The partner program a broadcaster belongs to.
///
/// Partners and affiliates expose aggregate channel statistics directly. Channels outside both
/// programs need separate follower and video lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BroadcasterType {
    Partner,
    Affiliate,
    /// Neither partner nor affiliate; Twitch reports this as the empty string.
    #[serde(rename = "")]
    Normal,
}

impl BroadcasterType {
    /// Whether the channel is outside the partner and affiliate programs.
    pub fn is_unpartnered(self) -> bool {
        self == Self::Normal
    }
}

/// A Twitch user account.
///
/// This is the subset of fields the client uses.
///
/// See: <https://dev.twitch.tv/docs/api/reference/#get-users>
#[derive(Debug, Serialize, Deserialize)]
pub struct User {
    /// The user's login name, always lower case.
    pub login: String,
    pub broadcaster_type: BroadcasterType,
    /// Total views across the channel.
    pub view_count: u64,
}

/// Response of `GET /users/follows`.
///
/// Only the total is of interest; the first page of follow records is ignored.
#[derive(Debug, Serialize, Deserialize)]
pub struct FollowsResponse {
    pub total: u64,
}
