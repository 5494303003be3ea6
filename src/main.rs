//! Backchannel - IRC-Slack chat bridge
//!
//! Relays conversation between mapped IRC and Slack channels, hides
//! bouncer buffer playback, and pings the owner on Slack when IRC
//! messages match their highlight rules.

mod bridge;
mod common;
mod config;
mod irc;
mod slack;

use std::sync::Arc;

use anyhow::Result;
use tokio::signal;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use bridge::{ChannelMapping, HighlightMatcher, IrcRelay, SlackRelay};
use config::{env::get_config_path, load_and_validate};
use irc::new_irc_client;
use slack::{new_outbox, run_sender, MarkupTranslator, SlackApi, SlackDirectory, SocketModeClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Backchannel v{} starting...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_path = get_config_path();
    info!("Loading configuration from {}...", config_path);

    let config = load_and_validate(&config_path).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!("Please ensure {} exists and is properly formatted.", config_path);
        e
    })?;

    info!("Configuration loaded successfully");
    info!("  IRC: {} as {}", config.irc.server_label(), config.irc.nickname);
    info!("  Slack owner: {}", config.slack.owner);

    let mapping = Arc::new(ChannelMapping::from_config(&config)?);
    info!("  Mapped channels: {}", mapping.len());
    let highlights = HighlightMatcher::new(config.irc.highlight_rules())?;
    info!("  Highlight rules: {}", highlights.len());

    // ============================================================
    // Connect to both networks
    // ============================================================
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (irc_events_tx, irc_events_rx) = mpsc::unbounded_channel();
    let (slack_events_tx, slack_events_rx) = mpsc::unbounded_channel();

    let (irc_client, irc_handle) =
        new_irc_client(config.irc.clone(), irc_events_tx, shutdown_rx.clone());
    let irc_stream = irc_client.connect().await?;

    let api = SlackApi::new(config.slack.token.clone());
    let directory = Arc::new(SlackDirectory::load(&api, &config.slack.owner).await?);
    let socket_client = SocketModeClient::new(
        api.clone(),
        config.slack.app_token.clone(),
        slack_events_tx,
        shutdown_rx,
    );
    let socket = socket_client.connect().await?;
    info!("Connected to Slack Socket Mode");

    // ============================================================
    // Spawn network tasks and relay loops
    // ============================================================
    let (slack_handle, outbox_rx) = new_outbox(directory.clone(), config.bot_username());
    let sender_task = tokio::spawn(run_sender(api, outbox_rx));

    let irc_connection = tokio::spawn(irc_client.run(irc_stream));
    let socket_task = tokio::spawn(socket_client.run(socket));

    let mut irc_relay = IrcRelay::new(
        irc_handle.clone(),
        slack_handle,
        mapping.clone(),
        highlights,
        config.slack.owner.clone(),
        config.irc.server_label(),
    );
    for channel in &config.irc.channels {
        if let Some(key) = &channel.key {
            irc_relay = irc_relay.with_channel_key(&channel.name, key.clone());
        }
    }
    let slack_relay = SlackRelay::new(
        irc_handle,
        mapping,
        directory,
        MarkupTranslator::new(config.expand_emoji()),
    );

    let irc_relay_task = tokio::spawn(irc_relay.run(irc_events_rx));
    let slack_relay_task = tokio::spawn(slack_relay.run(slack_events_rx));

    // ============================================================
    // Run until either side ends or a signal arrives
    // ============================================================
    tokio::select! {
        biased;
        _ = shutdown_signal() => info!("Shutdown signal received - leaving IRC..."),
        _ = irc_relay_task => info!("IRC side ended"),
        _ = slack_relay_task => info!("Slack side ended"),
    }

    // Tell the IRC connection to QUIT and the socket to close
    if let Err(e) = shutdown_tx.send(true) {
        debug!("Shutdown channel closed (tasks already exited): {}", e);
    }

    // The sender drains once the IRC relay has posted its last notice
    let timeout = tokio::time::Duration::from_secs(5);
    match tokio::time::timeout(timeout, sender_task).await {
        Ok(Ok(())) => info!("Pending Slack posts delivered"),
        Ok(Err(e)) => warn!("Slack sender task panicked: {}", e),
        Err(_) => warn!("Timed out delivering pending Slack posts"),
    }
    if !irc_connection.is_finished() {
        warn!("IRC connection did not close in time");
    }
    if !socket_task.is_finished() {
        debug!("Slack socket still closing");
    }

    info!("Exiting...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
