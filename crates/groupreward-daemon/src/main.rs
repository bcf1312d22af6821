//! Service entry point for the Steam group reward service.
//!
//! The daemon keeps the membership cache in sync with the Steam group
//! member list and exposes its state over the observer API.
//!
//! # Architecture
//!
//! ```text
//! groupreward.yaml --> ServiceConfig --> RefreshScheduler --> MembershipCache
//!                                              |
//!                                    RefreshHandle --> Observer API
//! ```
//!
//! A missing config file falls back to defaults plus environment
//! overrides; an invalid config is fatal. `Ctrl-C` stops the scheduler,
//! abandoning any in-flight cycle, and drains the observer.

mod error;

use std::path::Path;
use std::sync::Arc;

use groupreward_core::config::LoggingConfig;
use groupreward_core::{
    MemberListFetcher, MembershipCache, RefreshScheduler, RefreshTimings, ServiceConfig,
};
use groupreward_observer::{AppState, ServerConfig, spawn_server};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::DaemonError;

/// Config file looked up relative to the working directory.
const CONFIG_PATH: &str = "groupreward.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the observer cannot
/// bind, or a background task fails during shutdown.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (config, from_file) = load_config()?;
    init_tracing(&config.logging);

    info!(
        config_file = from_file.then_some(CONFIG_PATH),
        "groupreward-daemon starting"
    );
    run(&config).await?;
    info!("groupreward-daemon shutdown complete");
    Ok(())
}

/// Load `groupreward.yaml`, or defaults with env overrides if it is absent.
fn load_config() -> Result<(ServiceConfig, bool), DaemonError> {
    let path = Path::new(CONFIG_PATH);
    if path.exists() {
        return Ok((ServiceConfig::from_file(path)?, true));
    }
    let mut config = ServiceConfig::default();
    config.apply_env_overrides()?;
    Ok((config, false))
}

/// Initialize structured logging.
///
/// `RUST_LOG` wins over the configured level when set.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(config: &ServiceConfig) -> Result<(), DaemonError> {
    let group = config.validate()?;
    let url = config.sync.member_list_url(group);
    info!(
        group_id = group.get(),
        remote_group_id = %group.remote_id(),
        url = %url,
        spawn_hp = config.rewards.spawn_hp,
        spawn_armor = config.rewards.spawn_armor,
        spawn_money = config.rewards.spawn_money,
        kill_hp = config.rewards.kill_hp,
        kill_money = config.rewards.kill_money,
        "configuration loaded"
    );

    let fetcher = MemberListFetcher::new(url, config.sync.request_timeout())?;
    let (scheduler, handle) = RefreshScheduler::new(
        fetcher,
        MembershipCache::new(),
        RefreshTimings::from(&config.sync),
    );
    let refresh_task = scheduler.spawn();

    let (stop_tx, mut stop_rx) = watch::channel(false);
    let observer_task = if config.observer.enabled {
        let server_config = ServerConfig {
            host: config.observer.host.clone(),
            port: config.observer.port,
        };
        let state = Arc::new(AppState::new(group, handle.clone()));
        let shutdown = async move {
            let _ = stop_rx.wait_for(|stop| *stop).await;
        };
        match spawn_server(&server_config, state, shutdown).await {
            Ok((addr, task)) => {
                info!(%addr, "Observer API server started");
                Some(task)
            }
            Err(e) => {
                handle.shutdown();
                refresh_task.await?;
                return Err(e.into());
            }
        }
    } else {
        info!("Observer API disabled");
        None
    };

    let signal = tokio::signal::ctrl_c().await;
    info!("shutdown requested");
    handle.shutdown();
    stop_tx.send_replace(true);

    refresh_task.await?;
    if let Some(task) = observer_task {
        task.await?;
    }
    signal.map_err(DaemonError::Signal)
}
