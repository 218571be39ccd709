use std::{sync::Arc, time::Duration};

use anyhow::Context;
use clap::crate_version;
use config::{Config, LogFormat};
use ctfd::CtfdClient;
use services::{
    first_blood::FirstBloodService,
    notifier::{DiscordNotifier, Notifier},
};
use tokio::sync::watch;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

mod config;
mod ctfd;
mod detector;
mod services;
mod stores;
mod tools;

#[deny(
    clippy::all,
    clippy::pedantic,
    clippy::perf,
    clippy::correctness,
    clippy::style,
    clippy::suspicious,
    clippy::complexity
)]
#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Loads configuration from command-line, YAML and environment sources
    let config = config::load().context("invalid configuration")?;

    setup_logging(&config);

    let api = Arc::new(CtfdClient::new(&config.ctfd)?);
    let notifier = Arc::new(DiscordNotifier::new(&config.discord)?);

    // Nothing can be announced with a bad token, so stop right away
    let bot_name = notifier
        .connect()
        .await
        .context("failed to connect to Discord")?;

    tracing::info!(
        version = crate_version!(),
        service = %config.service_name,
        "logged in to Discord as {bot_name}"
    );

    let store = stores::from_config(&config.store);

    let (shutdown_sender, shutdown) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        tracing::info!("shutdown signal received");
        shutdown_sender.send(true).ok();
    });

    let service = FirstBloodService::new(
        Duration::from_secs(config.interval_secs),
        api,
        notifier,
        store,
    );

    service.run(shutdown).await?;

    Ok(())
}

fn setup_logging(config: &Config) {
    let level = if config.logging.enabled {
        LevelFilter::from(&config.logging.level)
    } else {
        LevelFilter::OFF
    };

    // RUST_LOG directives still apply on top of the configured level
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    // Creates a tracing/logging subscriber based on the configuration provided
    if config.logging.format == LogFormat::Json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .compact()
            .with_env_filter(filter)
            .init();
    }
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        let mut terminate =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(signal) => signal,
                Err(err) => {
                    tracing::warn!("cannot listen for SIGTERM: {err}");
                    tokio::signal::ctrl_c().await.ok();
                    return;
                }
            };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.ok();
    }
}
