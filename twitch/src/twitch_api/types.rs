//! Envelope types shared by the Helix endpoints.

use serde::{Deserialize, Serialize};

/// The `{"data": [...]}` envelope Helix wraps every list response in.
///
/// Pagination cursors are ignored; every lookup here reads only the first page.
///
/// See: <https://dev.twitch.tv/docs/api/guide#twitch-api-response>
#[derive(Debug, Serialize, Deserialize)]
pub struct HelixResponse<T> {
    pub data: Vec<T>,
}
