//! Channel panel links via Twitch's GraphQL API.
//!
//! Panels are not exposed by Helix. The Twitch web client fetches them with a persisted GraphQL
//! query, authenticated only by the web client's own public client ID, so no app credential is
//! involved here.

use crate::config::{DEFAULT_REQUEST_TIMEOUT, Endpoints};
use eyre::Context;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::instrument;

/// Client ID of the Twitch web player. Not the app's registered client ID.
pub const WEB_CLIENT_ID: &str = "kimne78kx3ncx6brgo4mv6wki5h1ko";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/70.0.3538.77 Safari/537.36";

const CHANNEL_PANELS_OPERATION: &str = "ChannelPanels";
const CHANNEL_PANELS_HASH: &str =
    "236b0ec07489e5172ee1327d114172f27aceca206a1a8053106d60926a7f622e";

/// Matches `http(s)://` URLs and bare `www.` hosts in free text.
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:https?://|www\.)+[-a-zA-Z0-9@:%._+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b[-a-zA-Z0-9()@:%_+.~#?&/=]*",
    )
    .expect("URL pattern is a valid regex")
});

#[derive(Debug, Serialize)]
struct PersistedQuery<'a> {
    #[serde(rename = "operationName")]
    operation_name: &'static str,
    variables: ChannelVariables<'a>,
    extensions: Extensions,
}

#[derive(Debug, Serialize)]
struct ChannelVariables<'a> {
    id: &'a str,
}

#[derive(Debug, Serialize)]
struct Extensions {
    #[serde(rename = "persistedQuery")]
    persisted_query: PersistedQueryHash,
}

#[derive(Debug, Serialize)]
struct PersistedQueryHash {
    version: u32,
    #[serde(rename = "sha256Hash")]
    sha256_hash: &'static str,
}

impl<'a> PersistedQuery<'a> {
    fn channel_panels(user_id: &'a str) -> Self {
        Self {
            operation_name: CHANNEL_PANELS_OPERATION,
            variables: ChannelVariables { id: user_id },
            extensions: Extensions {
                persisted_query: PersistedQueryHash {
                    version: 1,
                    sha256_hash: CHANNEL_PANELS_HASH,
                },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChannelPanelsResponse {
    data: ChannelPanelsData,
}

#[derive(Debug, Deserialize)]
struct ChannelPanelsData {
    user: Option<PanelOwner>,
}

#[derive(Debug, Deserialize)]
struct PanelOwner {
    panels: Vec<Panel>,
}

/// A content block shown beneath a channel's video player.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Panel {
    #[serde(rename = "linkURL")]
    pub link_url: Option<String>,
    pub description: Option<String>,
}

/// Collects every link in `panels`: each panel's direct link plus any URLs in its description.
pub fn extract_links<'a>(panels: impl IntoIterator<Item = &'a Panel>) -> HashSet<String> {
    let mut links = HashSet::new();
    for panel in panels {
        if let Some(link) = panel.link_url.as_deref().filter(|l| !l.is_empty()) {
            links.insert(link.to_string());
        }
        if let Some(description) = panel.description.as_deref() {
            links.extend(
                URL_PATTERN
                    .find_iter(description)
                    .map(|m| m.as_str().to_string()),
            );
        }
    }
    links
}

/// Stateless client for the Twitch GraphQL endpoint.
#[derive(Debug, Clone)]
pub struct GqlClient {
    url: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl GqlClient {
    /// Creates a client for the GraphQL endpoint at `url`, giving each request `timeout`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> eyre::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("build GraphQL HTTP client")?;
        Ok(Self {
            url: url.into(),
            timeout,
            http,
        })
    }

    /// Creates a client for Twitch's own GraphQL endpoint with the default request timeout.
    pub fn production() -> eyre::Result<Self> {
        Self::new(Endpoints::default().gql, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the unique links found in a channel's panels.
    ///
    /// Any failure to fetch or parse the panels yields an empty set.
    #[instrument(skip(self))]
    pub async fn get_panel_links(&self, user_id: &str) -> HashSet<String> {
        match self.try_get_panel_links(user_id).await {
            Ok(links) => {
                tracing::warn!(?links, "found links in channel panels");
                links
            }
            Err(e) => {
                tracing::debug!(user_id, error = %e, "could not load channel panels");
                HashSet::new()
            }
        }
    }

    /// Fetches a channel's panels and extracts their links, reporting any failure.
    pub async fn try_get_panel_links(&self, user_id: &str) -> eyre::Result<HashSet<String>> {
        let body = [PersistedQuery::channel_panels(user_id)];
        let response = self
            .http
            .post(&self.url)
            .header("Client-ID", WEB_CLIENT_ID)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("send ChannelPanels query to {}", self.url))?;

        let status = response.status();
        if !status.is_success() {
            eyre::bail!("GraphQL request failed with status {status}");
        }

        let responses: Vec<ChannelPanelsResponse> = response
            .json()
            .await
            .context("parse ChannelPanels response as JSON")?;
        let owner = responses
            .into_iter()
            .next()
            .ok_or_else(|| eyre::eyre!("empty GraphQL response"))?
            .data
            .user
            .ok_or_else(|| eyre::eyre!("no such channel: {user_id}"))?;

        tracing::trace!(panels = owner.panels.len(), "fetched channel panels");
        Ok(extract_links(&owner.panels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn links(urls: &[&str]) -> HashSet<String> {
        urls.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn direct_link_and_description_urls() {
        let panels = [Panel {
            link_url: Some("https://example.com/shop".to_string()),
            description: Some(
                "Follow me on https://twitter.com/someone and www.youtube.com/c/someone thanks"
                    .to_string(),
            ),
        }];
        assert_eq!(
            extract_links(&panels),
            links(&[
                "https://example.com/shop",
                "https://twitter.com/someone",
                "www.youtube.com/c/someone",
            ])
        );
    }

    #[test]
    fn duplicates_collapse() {
        let panels = [
            Panel {
                link_url: Some("https://discord.gg/abc".to_string()),
                description: Some("join https://discord.gg/abc".to_string()),
            },
            Panel {
                link_url: Some("https://discord.gg/abc".to_string()),
                description: None,
            },
        ];
        assert_eq!(extract_links(&panels), links(&["https://discord.gg/abc"]));
    }

    #[test]
    fn empty_fields_contribute_nothing() {
        let panels = [
            Panel::default(),
            Panel {
                link_url: Some(String::new()),
                description: Some("no links here, just example dot com".to_string()),
            },
        ];
        assert!(extract_links(&panels).is_empty());
    }

    #[test]
    fn production_client_uses_default_timeout() {
        let gql = GqlClient::production().unwrap();
        assert_eq!(gql.url(), "https://gql.twitch.tv/gql");
        assert_eq!(gql.timeout(), DEFAULT_REQUEST_TIMEOUT);
    }

    #[tokio::test]
    async fn fetches_panels_with_web_client_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/gql"))
            .and(header("Client-ID", WEB_CLIENT_ID))
            .and(body_json(json!([{
                "operationName": "ChannelPanels",
                "variables": { "id": "12345" },
                "extensions": {
                    "persistedQuery": {
                        "version": 1,
                        "sha256Hash": CHANNEL_PANELS_HASH
                    }
                }
            }])))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "data": {
                    "user": {
                        "id": "12345",
                        "panels": [
                            {
                                "id": "1",
                                "type": "DEFAULT",
                                "title": "Links",
                                "linkURL": "https://example.com/shop",
                                "description": "https://twitter.com/someone | www.youtube.com/c/someone",
                                "__typename": "DefaultPanel"
                            },
                            {
                                "id": "2",
                                "type": "EXTENSION",
                                "__typename": "Panel"
                            }
                        ]
                    }
                },
                "extensions": {}
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let gql = GqlClient::new(format!("{}/gql", server.uri()), Duration::from_secs(5)).unwrap();
        assert_eq!(
            gql.get_panel_links("12345").await,
            links(&[
                "https://example.com/shop",
                "https://twitter.com/someone",
                "www.youtube.com/c/someone",
            ])
        );
    }

    #[tokio::test]
    async fn unknown_channel_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/gql"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{ "data": { "user": null } }])),
            )
            .mount(&server)
            .await;

        let gql = GqlClient::new(format!("{}/gql", server.uri()), Duration::from_secs(5)).unwrap();
        assert!(gql.get_panel_links("0").await.is_empty());
        assert!(gql.try_get_panel_links("0").await.is_err());
    }

    #[tokio::test]
    async fn transport_failure_is_empty() {
        // nothing listens on the discard port
        let gql = GqlClient::new("http://127.0.0.1:9/gql", Duration::from_secs(5)).unwrap();
        assert!(gql.get_panel_links("12345").await.is_empty());
    }
}
