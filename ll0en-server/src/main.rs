//! ll0en
//!
//! Watches a region's NationStates happenings and telegrams nations that
//! resign from the World Assembly or move out of the region.

mod config;
mod shutdown;

use clap::Parser;
use config::{ConfigLoader, LoadedConfig};
use ll0en_core::events::Classifier;
use ll0en_core::processors::{
    ActionDispatcher, EligibilityQueryClient, NotificationDispatchClient, ReactionPlan, subscribe,
};
use ll0en_core::utils::RateBudget;
use ll0en_sdk::client::{EurocoreClient, NsClient};
use shutdown::spawn_shutdown_handler;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// ll0en - NationStates happenings watcher
#[derive(Parser, Debug)]
#[command(name = "ll0en")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(default_value = "./config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logging is configured from the file, so a load failure is reported at the default level.
    let loaded_config = match ConfigLoader::new(&args.config).load() {
        Ok(loaded_config) => loaded_config,
        Err(e) => {
            init_tracing("info");
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };
    init_tracing(&loaded_config.log_level);

    tracing::info!("Starting ll0en v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Configuration loaded from {:?}", args.config);
    if let Some(configured) = loaded_config.clamped_max_requests {
        tracing::warn!(
            configured,
            used = loaded_config.watch.max_requests,
            "max_requests out of range, clamping"
        );
    }

    run(loaded_config).await
}

async fn run(loaded_config: LoadedConfig) -> anyhow::Result<()> {
    let LoadedConfig {
        user,
        watch,
        eurocore,
        ..
    } = loaded_config;

    let ns_client = NsClient::new(&user)?;
    let feed_url = ns_client.happenings_url(&watch.region)?;
    let user_agent = ns_client.user_agent().to_string();

    let budget = Arc::new(RateBudget::new(watch.max_requests, watch.window));
    let eligibility = Arc::new(EligibilityQueryClient::new(ns_client, budget.clone()));

    let gateway = Arc::new(EurocoreClient::new(
        eurocore.url,
        eurocore.username,
        eurocore.password,
    ));
    let notifier = NotificationDispatchClient::new(gateway);

    let classifier = Classifier::new(&watch.region)?;
    let dispatcher = ActionDispatcher::new(
        watch.region.clone(),
        eligibility,
        notifier,
        ReactionPlan::resignation(watch.resign.clone()),
        ReactionPlan::relocation(watch.relocate.clone()),
    );

    tracing::info!(
        region = %watch.region,
        max_requests = budget.max_requests(),
        window_secs = budget.window().as_secs(),
        resign_mode = watch.resign.mode(),
        move_mode = watch.relocate.mode(),
        "Watching region"
    );

    let shutdown_rx = spawn_shutdown_handler().map_err(|e| {
        tracing::error!("Failed to install signal handlers: {}", e);
        e
    })?;

    subscribe(
        feed_url.as_str(),
        &user_agent,
        move |event| {
            if let Some(matched) = classifier.classify(&event.text) {
                tracing::debug!(
                    nation = matched.nation(),
                    category = %matched.category(),
                    "Matched happening"
                );
                dispatcher.dispatch(matched);
            }
        },
        shutdown_rx,
    )
    .await?;

    tracing::info!("ll0en stopped");
    Ok(())
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},reqwest=warn,hyper=warn")));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
