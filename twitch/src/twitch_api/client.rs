//! Core Twitch API client functionality.

use crate::config::{Config, Endpoints};
use crate::error::CredentialError;
use crate::oauth::CredentialManager;
use crate::store::CredentialStore;
use crate::twitch_api::{
    panels::GqlClient,
    streams::{StreamDetail, StreamSummary},
    types::HelixResponse,
    users::{FollowsResponse, User},
};
use eyre::Context;
use http::Method;
use serde::de::IgnoredAny;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::instrument;

/// Game categories whose live streams are listed by [`TwitchClient::get_top_streams`].
pub const GAME_IDS: [&str; 2] = ["459931", "2083"];

/// Follower count reported when the real count cannot be fetched.
///
/// Deliberately large: consumers treat high follower counts as disqualifying, so an unknown count
/// must never look like a small one.
pub const FOLLOWER_COUNT_ON_ERROR: u64 = 10_000_000;

/// Video count reported when the real count cannot be fetched.
///
/// See [`FOLLOWER_COUNT_ON_ERROR`].
pub const VIDEO_COUNT_ON_ERROR: u64 = 10_000;

/// The registered application's identity, fixed when the client connects.
///
/// The client secret is only needed to issue a token, so it stays with the configuration and is
/// not carried here.
#[derive(Clone)]
pub struct AppIdentity {
    /// Sent as `Client-ID` on every Helix request.
    pub client_id: String,
    /// The app access token sent as the bearer credential.
    pub access_token: String,
}

impl fmt::Debug for AppIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppIdentity")
            .field("client_id", &self.client_id)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Client for the handful of Helix endpoints used to find and describe live channels.
///
/// The app access token is acquired once in [`TwitchClient::connect`] and used unchanged for
/// the lifetime of the client.
///
/// None of the query methods return errors. Each has a documented fallback (an empty collection
/// or a sentinel count) that is returned instead, after logging what went wrong. The `try_*`
/// variants expose the underlying error for callers that want it.
#[derive(Debug, Clone)]
pub struct TwitchClient {
    identity: AppIdentity,
    endpoints: Endpoints,
    min_viewers: u64,
    http: reqwest::Client,
}

impl TwitchClient {
    /// Connects to Twitch using the stored access token if it is still valid, or a newly issued
    /// one otherwise.
    ///
    /// A newly issued token is written back to `store`.
    ///
    /// # Errors
    ///
    /// [`CredentialError::NoAccessToken`] if Twitch refuses to issue a token for the configured
    /// client ID and secret. Transport failures while validating or requesting a token are also
    /// returned rather than retried.
    #[instrument(skip_all, fields(client_id = %config.client_id))]
    pub async fn connect(
        config: &Config,
        store: &dyn CredentialStore,
    ) -> Result<Self, CredentialError> {
        let manager = CredentialManager::new(
            &config.client_id,
            &config.client_secret,
            &config.endpoints.id,
            config.request_timeout,
        )?;
        let token = manager.acquire_credential(store).await?;
        Self::with_token(config, token)
    }

    fn with_token(config: &Config, access_token: String) -> Result<Self, CredentialError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(CredentialError::Http)?;
        Ok(Self {
            identity: AppIdentity {
                client_id: config.client_id.clone(),
                access_token,
            },
            endpoints: config.endpoints.clone(),
            min_viewers: config.min_viewers,
            http,
        })
    }

    pub fn identity(&self) -> &AppIdentity {
        &self.identity
    }

    /// Makes an authenticated request to a Helix endpoint.
    ///
    /// `path` is relative to the Helix base URL. Query parameters may repeat a key, which is how
    /// Helix accepts lists.
    ///
    /// Non-success statuses are turned into errors.
    #[instrument(skip(self), level = tracing::Level::TRACE)]
    async fn make_authenticated_request(
        &self,
        method: Method,
        path: &str,
        query_params: &[(&str, &str)],
    ) -> eyre::Result<reqwest::Response> {
        let url = format!("{}/{}", self.endpoints.helix, path);
        let response = self
            .http
            .request(method.clone(), &url)
            .header("Client-ID", &self.identity.client_id)
            .bearer_auth(&self.identity.access_token)
            .query(query_params)
            .send()
            .await
            .with_context(|| format!("send {method} request to Twitch API: {url}"))?;

        let status_code = response.status();
        if !status_code.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            eyre::bail!(
                "Twitch API {} request failed with status {}: {}",
                method,
                status_code,
                error_text
            );
        }

        Ok(response)
    }

    async fn get_helix<T>(&self, path: &str, query_params: &[(&str, &str)]) -> eyre::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.make_authenticated_request(Method::GET, path, query_params)
            .await?
            .json()
            .await
            .with_context(|| format!("parse Twitch {path} response as JSON"))
    }

    /// Returns the live streams in the tracked categories with more than
    /// [`Config::min_viewers`] viewers.
    ///
    /// Returns an empty list if the streams could not be fetched.
    #[instrument(skip(self))]
    pub async fn get_top_streams(&self) -> Vec<StreamSummary> {
        match self.try_get_top_streams().await {
            Ok(streams) => streams,
            Err(e) => {
                tracing::warn!(error = %e, "failed to list top streams");
                Vec::new()
            }
        }
    }

    /// Like [`Self::get_top_streams`], but reports why the listing failed.
    pub async fn try_get_top_streams(&self) -> eyre::Result<Vec<StreamSummary>> {
        let query_params: Vec<_> = GAME_IDS.iter().map(|id| ("game_id", *id)).collect();
        let streams: HelixResponse<StreamSummary> =
            self.get_helix("streams", &query_params).await?;

        let total = streams.data.len();
        let top: Vec<_> = streams
            .data
            .into_iter()
            .filter(|s| s.viewer_count > self.min_viewers)
            .collect();
        tracing::debug!(total, kept = top.len(), "fetched live streams");
        Ok(top)
    }

    /// Looks up account details for each of `streams`, keyed by lower-cased display name.
    ///
    /// Channels outside the partner and affiliate programs additionally get their follower and
    /// video counts. If any part of the lookup fails, nothing is returned.
    #[instrument(skip_all, fields(streams = streams.len()))]
    pub async fn get_stream_details(
        &self,
        streams: &[StreamSummary],
    ) -> HashMap<String, StreamDetail> {
        tracing::info!("loading extra info for {} streams", streams.len());
        match self.try_get_stream_details(streams).await {
            Ok(details) => details,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load stream details");
                HashMap::new()
            }
        }
    }

    /// Like [`Self::get_stream_details`], but reports the first failure instead of an empty map.
    ///
    /// The follower and video counts still fall back to their sentinels individually.
    pub async fn try_get_stream_details(
        &self,
        streams: &[StreamSummary],
    ) -> eyre::Result<HashMap<String, StreamDetail>> {
        let mut details: HashMap<String, StreamDetail> = streams
            .iter()
            .map(|s| (s.key(), StreamDetail::from(s)))
            .collect();
        if details.is_empty() {
            return Ok(details);
        }

        // one bulk lookup for every channel
        let users: HelixResponse<User> = {
            let query_params: Vec<_> = details.keys().map(|login| ("login", login.as_str())).collect();
            self.get_helix("users", &query_params).await?
        };

        for user in &users.data {
            // Helix logins are lower case, which is what the keys are.
            let Some(detail) = details.get_mut(&user.login) else {
                eyre::bail!("users lookup returned unrequested login {:?}", user.login);
            };
            detail.attach_user(user);
            if detail.is_unpartnered() {
                let user_id = detail.user_id.clone();
                detail.followers = Some(self.get_follower_count(&user_id).await);
                detail.videos = Some(self.get_video_count(&user_id).await);
            }
        }

        Ok(details)
    }

    /// Returns the number of videos saved on a channel.
    ///
    /// Only the first page of results is counted. On failure, returns [`VIDEO_COUNT_ON_ERROR`].
    #[instrument(skip(self))]
    pub async fn get_video_count(&self, user_id: &str) -> u64 {
        match self.try_get_video_count(user_id).await {
            Ok(count) => count,
            Err(e) => {
                tracing::error!(user_id, error = ?e, "failed to count videos");
                VIDEO_COUNT_ON_ERROR
            }
        }
    }

    /// Counts the first page of a channel's videos, reporting any failure.
    pub async fn try_get_video_count(&self, user_id: &str) -> eyre::Result<u64> {
        let videos: HelixResponse<IgnoredAny> =
            self.get_helix("videos", &[("user_id", user_id)]).await?;
        Ok(videos.data.len() as u64)
    }

    /// Returns the number of users following a channel.
    ///
    /// On failure, returns [`FOLLOWER_COUNT_ON_ERROR`].
    #[instrument(skip(self))]
    pub async fn get_follower_count(&self, user_id: &str) -> u64 {
        match self.try_get_follower_count(user_id).await {
            Ok(count) => count,
            Err(e) => {
                tracing::error!(user_id, error = ?e, "failed to count followers");
                FOLLOWER_COUNT_ON_ERROR
            }
        }
    }

    /// Fetches a channel's follower total, reporting any failure.
    pub async fn try_get_follower_count(&self, user_id: &str) -> eyre::Result<u64> {
        let follows: FollowsResponse =
            self.get_helix("users/follows", &[("to_id", user_id)]).await?;
        Ok(follows.total)
    }

    /// Returns the unique links in a channel's panels.
    ///
    /// This does not use the app's credentials; see [`GqlClient`] to target a different endpoint.
    /// Returns an empty set on any failure.
    pub async fn get_panel_links(user_id: &str) -> HashSet<String> {
        match GqlClient::production() {
            Ok(gql) => gql.get_panel_links(user_id).await,
            Err(e) => {
                tracing::warn!(error = %e, "failed to set up GraphQL client");
                HashSet::new()
            }
        }
    }
}
