//! Quayside - headless stevedoring operations dashboard
//!
//! A single widget manager drives the dashboard panels. Background services
//! push into a broadcast channel that the main loop drains on a timer.

mod config;
mod event_bus;
mod functions;
mod panel_manager;
mod panels;
mod services;

use config::{AppConfig, CONFIG_ENV};
use event_bus::EVENT_POLL_INTERVAL_MS;
use log::{info, warn};
use panel_manager::{Dashboard, WidgetFactory};
use panels::dashboard::events;
use quay_widgets::WidgetManager;
use std::error::Error;
use std::time::Duration;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("Starting Quayside...");

    let config_path =
        config::resolve_config_path(std::env::args().skip(1), std::env::var(CONFIG_ENV).ok())?;
    let config = AppConfig::load(&config_path)?;
    if !config_path.exists() {
        if let Err(e) = config.save(&config_path) {
            warn!("Could not write default config: {}", e);
        }
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run(config));
    Ok(())
}

async fn run(config: AppConfig) {
    let manager = WidgetManager::new(config.manager.clone());
    let dashboard = Dashboard::build(&manager, &config, &WidgetFactory::default());
    dashboard.attach_integrations();

    let sync = manager.spawn_periodic_sync(manager.config().periodic_sync_interval());

    // Subscribe before the service starts so the first snapshot is not lost.
    let mut event_rx = events::subscribe();
    let services = services::start_all(&config);

    info!(
        "Quayside running with {} widgets",
        manager.registered_widgets().len()
    );

    let mut ticker = tokio::time::interval(Duration::from_millis(EVENT_POLL_INTERVAL_MS));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                for event in events::drain_latest(&mut event_rx) {
                    dashboard.handle_event(event);
                }
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!("Failed to listen for shutdown signal: {}", e);
                }
                break;
            }
        }
    }

    info!("Shutting down");
    for service in services {
        service.abort();
    }
    sync.abort();
    manager.wait_idle().await;

    manager.log_debug_info();
    for (id, summary) in dashboard.summaries() {
        info!("{}: {}", id, summary);
    }
}
