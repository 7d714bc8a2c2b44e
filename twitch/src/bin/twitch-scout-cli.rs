use eyre::Context;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::io::IsTerminal;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use twitch_live_scout::{Config, GqlClient, StreamDetail, setup_twitch_client};

#[derive(Debug, Serialize)]
struct Report {
    streams: BTreeMap<String, StreamDetail>,
    /// Panel links of the unpartnered channels, by channel name.
    panel_links: BTreeMap<String, HashSet<String>>,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    let config = Config::from_env().context("load configuration")?;
    let client = match setup_twitch_client(&config).await {
        Ok(client) => client,
        Err(e) if e.is_unrecoverable() => {
            tracing::error!(error = %e, "unable to generate access token");
            std::process::exit(1);
        }
        Err(e) => return Err(e).context("connect to Twitch"),
    };

    let streams = client.get_top_streams().await;
    tracing::info!(count = streams.len(), "found top streams");
    let details = client.get_stream_details(&streams).await;

    let gql = GqlClient::new(config.endpoints.gql.clone(), config.request_timeout)?;
    let mut panel_links = BTreeMap::new();
    for (name, detail) in &details {
        if detail.is_unpartnered() {
            let links = gql.get_panel_links(&detail.user_id).await;
            panel_links.insert(name.clone(), links);
        }
    }

    let report = Report {
        streams: details.into_iter().collect(),
        panel_links,
    };
    let json = serde_json::to_string_pretty(&report).context("serialize report")?;
    println!("{json}");

    Ok(())
}
