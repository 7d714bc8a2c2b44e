//! Twitch API client library.
//!
//! This module wraps the few Twitch endpoints needed to find popular live channels and describe
//! them:
//!
//! - Helix `streams`, to list live channels in the tracked game categories
//! - Helix `users`, looked up in bulk for broadcaster type and channel views
//! - Helix `users/follows` and `videos`, only for channels outside the partner and affiliate
//!   programs, since those do not get aggregate stats otherwise
//! - the web client's GraphQL endpoint, to read the links in a channel's panels
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use twitch_live_scout::{Config, EnvFileStore, TwitchClient};
//!
//! # async fn example() -> eyre::Result<()> {
//! let config = Config::from_env()?;
//! let store = EnvFileStore::new(&config.env_file, "ACCESS_TOKEN");
//! let client = TwitchClient::connect(&config, &store).await?;
//!
//! let streams = client.get_top_streams().await;
//! let details = client.get_stream_details(&streams).await;
//! for (name, detail) in &details {
//!     println!("{name}: {} viewers", detail.viewer_count);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod panels;
pub mod streams;
pub mod types;
pub mod users;

pub use client::{
    AppIdentity, FOLLOWER_COUNT_ON_ERROR, GAME_IDS, TwitchClient, VIDEO_COUNT_ON_ERROR,
};
pub use panels::GqlClient;
pub use streams::{StreamDetail, StreamSummary};
pub use users::BroadcasterType;
