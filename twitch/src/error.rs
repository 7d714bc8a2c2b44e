use std::io;

/// Reasons a [`crate::TwitchClient`] could not obtain a usable app access token.
///
/// [`CredentialError::NoAccessToken`] is the unrecoverable configuration case: the identity
/// service refused to issue a token for the configured client ID and secret, and retrying will
/// not help. What to do about it (usually exiting) is up to the application.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("load stored access token")]
    Load(#[source] io::Error),

    #[error("validate stored access token")]
    Validate(#[source] reqwest::Error),

    #[error("request new access token")]
    Refresh(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    #[error("token endpoint did not issue an access token: {0}")]
    NoAccessToken(String),

    #[error("persist access token")]
    Persist(#[source] io::Error),

    #[error("build HTTP client")]
    Http(#[source] reqwest::Error),
}

impl CredentialError {
    /// Whether this error means the configured credentials cannot produce a token at all.
    pub fn is_unrecoverable(&self) -> bool {
        matches!(self, Self::NoAccessToken(_))
    }
}
