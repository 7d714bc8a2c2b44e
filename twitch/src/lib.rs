pub mod config;
pub mod error;
pub mod oauth;
pub mod store;
pub mod twitch_api;

pub use config::{Config, Endpoints};
pub use error::CredentialError;
pub use store::{CredentialStore, EnvFileStore, MemoryStore};
pub use twitch_api::{
    BroadcasterType, FOLLOWER_COUNT_ON_ERROR, GqlClient, StreamDetail, StreamSummary,
    TwitchClient, VIDEO_COUNT_ON_ERROR,
};

/// Connects a [`TwitchClient`] whose access token is cached in the configured dotenv file.
///
/// Shared by the CLI and anything else embedding the client the standard way: the token is read
/// from [`Config::env_file`] (or the `ACCESS_TOKEN` environment variable), validated, and
/// replaced in that same file if Twitch no longer accepts it.
pub async fn setup_twitch_client(config: &Config) -> Result<TwitchClient, CredentialError> {
    let store = EnvFileStore::new(&config.env_file, config::ACCESS_TOKEN_VAR);
    tracing::debug!(path = %store.path().display(), "using token store");
    TwitchClient::connect(config, &store).await
}
