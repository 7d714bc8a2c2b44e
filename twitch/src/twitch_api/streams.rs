//! Helix `streams` types and the enriched per-channel detail record.

use crate::twitch_api::users::{BroadcasterType, User};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// A channel that is currently live.
///
/// Deserialized straight from a Helix `streams` record; fields the client does not use are
/// dropped. Only the name, ID and viewer count are required. A record missing its title,
/// thumbnail or start time still parses, with those left empty (the start time as the Unix
/// epoch), so one odd record does not fail the whole listing.
///
/// See: <https://dev.twitch.tv/docs/api/reference/#get-streams>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamSummary {
    /// The broadcaster's display name.
    pub user_name: String,
    pub user_id: String,
    pub viewer_count: u64,
    #[serde(default)]
    pub title: String,
    /// Thumbnail URL template containing `{width}` and `{height}` placeholders.
    #[serde(default)]
    pub thumbnail_url: String,
    /// When the broadcast started.
    #[serde(default)]
    pub started_at: Timestamp,
}

impl StreamSummary {
    /// The lower-cased display name that identifies this channel in a detail lookup.
    pub fn key(&self) -> String {
        self.user_name.to_lowercase()
    }
}

/// A live channel together with its account metadata.
///
/// `followers` and `videos` are only ever filled in for channels whose broadcaster type is
/// [`BroadcasterType::Normal`]; partners and affiliates never get them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDetail {
    pub user_id: String,
    pub viewer_count: u64,
    pub title: String,
    pub thumbnail: String,
    pub started: Timestamp,
    /// Lower-cased display name, the same as this record's key.
    pub display: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broadcaster_type: Option<BroadcasterType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_views: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followers: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub videos: Option<u64>,
}

impl From<&StreamSummary> for StreamDetail {
    fn from(stream: &StreamSummary) -> Self {
        Self {
            user_id: stream.user_id.clone(),
            viewer_count: stream.viewer_count,
            title: stream.title.clone(),
            thumbnail: stream.thumbnail_url.clone(),
            started: stream.started_at,
            display: stream.key(),
            broadcaster_type: None,
            channel_views: None,
            followers: None,
            videos: None,
        }
    }
}

impl StreamDetail {
    /// Records the account-level fields from the user's Helix record.
    pub(crate) fn attach_user(&mut self, user: &User) {
        self.broadcaster_type = Some(user.broadcaster_type);
        self.channel_views = Some(user.view_count);
    }

    /// Whether this channel needs the extra follower and video lookups.
    pub fn is_unpartnered(&self) -> bool {
        self.broadcaster_type
            .is_some_and(BroadcasterType::is_unpartnered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn summary_from_helix_record() {
        let stream: StreamSummary = serde_json::from_value(json!({
            "id": "40952121085",
            "user_id": "101051819",
            "user_login": "afro",
            "user_name": "Afro",
            "game_id": "32982",
            "game_name": "Grand Theft Auto V",
            "type": "live",
            "title": "Jacob: Digital Den Laptops & Routers | NoPixel | !MAINGEAR !FCF",
            "tags": ["English"],
            "viewer_count": 1490,
            "started_at": "2021-03-10T03:18:11Z",
            "language": "en",
            "thumbnail_url": "https://static-cdn.jtvnw.net/previews-ttv/live_user_afro-{width}x{height}.jpg",
            "is_mature": false
        }))
        .unwrap();

        assert_eq!(stream.key(), "afro");
        assert_eq!(stream.viewer_count, 1490);
        assert_eq!(
            stream.started_at,
            "2021-03-10T03:18:11Z".parse::<Timestamp>().unwrap()
        );

        let detail = StreamDetail::from(&stream);
        assert_eq!(detail.display, "afro");
        assert_eq!(detail.user_id, "101051819");
        assert!(detail.broadcaster_type.is_none());
        assert!(!detail.is_unpartnered());
    }

    #[test]
    fn summary_tolerates_missing_descriptive_fields() {
        let stream: StreamSummary = serde_json::from_value(json!({
            "user_id": "7",
            "user_name": "Quiet",
            "viewer_count": 250
        }))
        .unwrap();
        assert_eq!(stream.key(), "quiet");
        assert_eq!(stream.title, "");
        assert_eq!(stream.thumbnail_url, "");
        assert_eq!(stream.started_at, Timestamp::UNIX_EPOCH);

        assert!(
            serde_json::from_value::<StreamSummary>(json!({
                "user_name": "Quiet",
                "viewer_count": 250
            }))
            .is_err()
        );
    }

    #[test]
    fn unset_enrichment_is_not_serialized() {
        let detail = StreamDetail {
            user_id: "1".to_string(),
            viewer_count: 101,
            title: "t".to_string(),
            thumbnail: "u".to_string(),
            started: Timestamp::UNIX_EPOCH,
            display: "someone".to_string(),
            broadcaster_type: Some(BroadcasterType::Partner),
            channel_views: Some(10),
            followers: None,
            videos: None,
        };
        let value = serde_json::to_value(&detail).unwrap();
        assert_eq!(value["broadcaster_type"], json!("partner"));
        assert!(value.get("followers").is_none());
        assert!(value.get("videos").is_none());
    }
}
