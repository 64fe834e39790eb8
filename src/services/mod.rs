//! Background services for Quayside.
//!
//! Services poll external state and broadcast events to the dashboard.
//! Each service runs as a single task on the main runtime.
//!
//! - `ship_data` - Vessel discharge progress from a snapshot file or synthesised

pub mod ship_data;

use crate::config::AppConfig;
use log::info;
use tokio::task::JoinHandle;

/// Start all background services.
/// Call this after subscribing to the dashboard channel.
pub fn start_all(config: &AppConfig) -> Vec<JoinHandle<()>> {
    info!("Starting services...");
    vec![ship_data::start_ship_data_service(&config.ship_data)]
}
