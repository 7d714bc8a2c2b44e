//! App access token management for the Twitch API.
//!
//! Twitch app access tokens are obtained with the OAuth client credentials grant and expire after
//! some weeks. Expiry cannot be inspected locally, so a cached token is checked against the
//! identity service's validation endpoint before use, and only replaced when that check fails.

use crate::error::CredentialError;
use crate::store::CredentialStore;
use oauth2::basic::BasicClient;
use oauth2::{AuthType, ClientId, ClientSecret, RequestTokenError, Scope, TokenResponse, TokenUrl};
use oauth2::reqwest;
use serde::Deserialize;
use std::time::Duration;
use tracing::instrument;

/// The only scope the app requests.
pub const SCOPE: &str = "analytics:read:games";

/// Response of `GET /oauth2/validate`.
///
/// A valid token yields the client ID it was issued to. An invalid one yields a status/message
/// object without it.
#[derive(Debug, Deserialize)]
struct ValidateResponse {
    client_id: Option<String>,
    expires_in: Option<u64>,
}

/// The one field of a token endpoint response that matters.
///
/// Used when the full response does not fit oauth2's standard shape, e.g. because Twitch sends
/// `scope` as an array or omits `token_type`.
#[derive(Debug, Deserialize)]
struct IssuedToken {
    access_token: Option<String>,
}

/// Validates and, when needed, replaces the app access token.
#[derive(Debug, Clone)]
pub(crate) struct CredentialManager {
    client_id: String,
    client_secret: String,
    /// Base of the identity service, e.g. `https://id.twitch.tv`.
    id_base: String,
    http: reqwest::Client,
}

impl CredentialManager {
    pub(crate) fn new(
        client_id: &str,
        client_secret: &str,
        id_base: &str,
        timeout: Duration,
    ) -> Result<Self, CredentialError> {
        let http = reqwest::ClientBuilder::new()
            // SSRF no thank you.
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .build()
            .map_err(CredentialError::Http)?;
        Ok(Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            id_base: id_base.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Returns a usable access token, issuing and persisting a new one if the stored token is
    /// missing or no longer valid.
    ///
    /// The store is read once and written at most once.
    #[instrument(skip_all)]
    pub(crate) async fn acquire_credential(
        &self,
        store: &dyn CredentialStore,
    ) -> Result<String, CredentialError> {
        if let Some(saved) = store
            .load_token()
            .map_err(CredentialError::Load)?
            .filter(|t| !t.is_empty())
        {
            if self.validate(&saved).await? {
                tracing::info!("Twitch API token verified");
                return Ok(saved);
            }
            tracing::info!("stored Twitch API token is no longer valid");
        } else {
            tracing::debug!("no stored Twitch API token");
        }

        let token = self.request_token().await?;
        store
            .save_token(&token)
            .map_err(CredentialError::Persist)?;
        tracing::info!("saved new Twitch API token");
        Ok(token)
    }

    /// Asks the identity service whether `token` is still good.
    ///
    /// Transport errors and unparseable responses are returned as errors rather than treated as
    /// "invalid".
    #[instrument(skip_all, ret)]
    async fn validate(&self, token: &str) -> Result<bool, CredentialError> {
        let response = self
            .http
            .get(format!("{}/oauth2/validate", self.id_base))
            .header(http::header::AUTHORIZATION, format!("OAuth {token}"))
            .send()
            .await
            .map_err(CredentialError::Validate)?;

        let status = response.status();
        let body: ValidateResponse = response.json().await.map_err(CredentialError::Validate)?;
        match body.client_id {
            Some(_) => {
                tracing::debug!(expires_in = ?body.expires_in, "token validated");
                Ok(true)
            }
            None => {
                tracing::debug!(%status, "token rejected by validation endpoint");
                Ok(false)
            }
        }
    }

    /// Exchanges the client ID and secret for a fresh app access token.
    #[instrument(skip_all)]
    async fn request_token(&self) -> Result<String, CredentialError> {
        let token_url = TokenUrl::new(format!("{}/oauth2/token", self.id_base))
            .map_err(|e| CredentialError::Refresh(Box::new(e)))?;
        let client = BasicClient::new(ClientId::new(self.client_id.clone()))
            .set_client_secret(ClientSecret::new(self.client_secret.clone()))
            // Twitch wants the credentials as form fields, not HTTP basic auth.
            .set_auth_type(AuthType::RequestBody)
            .set_token_uri(token_url);

        tracing::debug!("requesting new app access token");
        match client
            .exchange_client_credentials()
            .add_scope(Scope::new(SCOPE.to_string()))
            .request_async(&self.http)
            .await
        {
            Ok(token) => Ok(token.access_token().secret().clone()),
            Err(RequestTokenError::Request(e)) => Err(CredentialError::Refresh(Box::new(e))),
            Err(RequestTokenError::Parse(e, body)) => {
                match serde_json::from_slice::<IssuedToken>(&body)
                    .ok()
                    .and_then(|t| t.access_token)
                    .filter(|t| !t.is_empty())
                {
                    Some(token) => {
                        tracing::debug!(error = %e, "token response is non-standard but has a token");
                        Ok(token)
                    }
                    None => {
                        tracing::error!(error = %e, "unable to generate access token");
                        Err(CredentialError::NoAccessToken(e.to_string()))
                    }
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "unable to generate access token");
                Err(CredentialError::NoAccessToken(e.to_string()))
            }
        }
    }
}
