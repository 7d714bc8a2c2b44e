//! Runtime configuration for the Twitch client.
//!
//! Credentials come from the process environment, optionally seeded from a `.env` file in the
//! working directory. Endpoints default to the production Twitch hosts but can be pointed
//! elsewhere, which is how the tests talk to a local mock server.

use eyre::Context;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the registered application's client ID.
pub const CLIENT_ID_VAR: &str = "CLIENT_ID";
/// Environment variable holding the registered application's client secret.
pub const CLIENT_SECRET_VAR: &str = "CLIENT_SECRET";
/// Environment variable (and `.env` key) holding the cached app access token.
pub const ACCESS_TOKEN_VAR: &str = "ACCESS_TOKEN";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Streams must have strictly more viewers than this to be reported by
/// [`crate::TwitchClient::get_top_streams`].
///
/// Note that the intent was originally described as "over 200 viewers", but the filter that
/// downstream consumers were tuned against has always used 100.
pub const DEFAULT_MIN_VIEWERS: u64 = 100;

/// Base URLs of the Twitch services the client talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Helix REST API, e.g. `https://api.twitch.tv/helix`.
    pub helix: String,
    /// Identity service hosting `/oauth2/validate` and `/oauth2/token`.
    pub id: String,
    /// Full URL of the GraphQL endpoint used by the Twitch web client.
    pub gql: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            helix: "https://api.twitch.tv/helix".to_string(),
            id: "https://id.twitch.tv".to_string(),
            gql: "https://gql.twitch.tv/gql".to_string(),
        }
    }
}

impl Endpoints {
    /// Points every endpoint at the same base URL.
    ///
    /// Paths are laid out as `{base}/helix/...`, `{base}/oauth2/...` and `{base}/gql`.
    pub fn at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            helix: format!("{base}/helix"),
            id: base.to_string(),
            gql: format!("{base}/gql"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub client_id: String,
    pub client_secret: String,
    pub endpoints: Endpoints,
    pub request_timeout: Duration,
    pub min_viewers: u64,
    /// The dotenv file new access tokens are written back to.
    pub env_file: PathBuf,
}

impl Config {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            endpoints: Endpoints::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            min_viewers: DEFAULT_MIN_VIEWERS,
            env_file: PathBuf::from(".env"),
        }
    }

    /// Loads configuration from the environment.
    ///
    /// A `.env` file in the current directory is read first if one exists. Values already set in
    /// the process environment take precedence over the file.
    pub fn from_env() -> eyre::Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env file"),
            Err(e) if e.not_found() => tracing::debug!("no .env file present"),
            Err(e) => return Err(e).context("read .env file"),
        }

        let client_id = std::env::var(CLIENT_ID_VAR)
            .with_context(|| format!("{CLIENT_ID_VAR} must be set"))?;
        let client_secret = std::env::var(CLIENT_SECRET_VAR)
            .with_context(|| format!("{CLIENT_SECRET_VAR} must be set"))?;

        Ok(Self::new(client_id, client_secret))
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_min_viewers(mut self, min_viewers: u64) -> Self {
        self.min_viewers = min_viewers;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
