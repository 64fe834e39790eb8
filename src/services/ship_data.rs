//! Ship data service.
//!
//! Produces `ShipSnapshot`s for the vessel under discharge and sends them to
//! the dashboard event bus. Snapshots come from a JSON file when one is
//! configured (re-read every poll), otherwise progress is synthesised from the
//! expected discharge rate.

use crate::config::ShipDataConfig;
use crate::panels::dashboard::events;
use chrono::{DateTime, Timelike, Utc};
use log::{info, warn};
use quay_widgets::{WidgetData, data_from};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;
use tokio::time::{Duration, sleep};

/// Hourly buckets kept for the productivity chart.
pub const HOURLY_WINDOW: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum ShipDataError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed ship data in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Discharge state of one vessel at one point in time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipSnapshot {
    pub vessel: String,
    pub total_vehicles: u32,
    pub discharged: u32,
    /// Target discharge rate in vehicles per hour.
    pub expected_rate: u32,
    /// Vehicles discharged per hour, oldest first, current hour last.
    #[serde(default)]
    pub hourly_counts: Vec<u32>,
    #[serde(default)]
    pub sequence: u64,
    pub captured_at: DateTime<Utc>,
}

impl ShipSnapshot {
    pub fn new(vessel: &str, total_vehicles: u32, expected_rate: u32, now: DateTime<Utc>) -> Self {
        Self {
            vessel: vessel.to_string(),
            total_vehicles,
            discharged: 0,
            expected_rate,
            hourly_counts: vec![0],
            sequence: 0,
            captured_at: now,
        }
    }

    /// Discharge progress in whole percent, capped at 100.
    pub fn progress(&self) -> u32 {
        if self.total_vehicles == 0 {
            return 0;
        }
        ((u64::from(self.discharged) * 100 / u64::from(self.total_vehicles)) as u32).min(100)
    }

    pub fn remaining(&self) -> u32 {
        self.total_vehicles.saturating_sub(self.discharged)
    }

    pub fn to_data(&self) -> WidgetData {
        serde_json::to_value(self).map(data_from).unwrap_or_default()
    }

    pub fn from_data(data: &WidgetData) -> Option<Self> {
        serde_json::from_value(serde_json::Value::Object(data.clone())).ok()
    }

    /// Advance synthetic progress by one poll of `poll`.
    pub fn advance(&mut self, poll: Duration, now: DateTime<Utc>) {
        let per_hour = u64::from(self.expected_rate);
        let step = (per_hour * poll.as_millis() as u64 / 3_600_000).max(1) as u32;
        let step = step.min(self.remaining());

        if now.hour() != self.captured_at.hour() || self.hourly_counts.is_empty() {
            self.hourly_counts.push(0);
            if self.hourly_counts.len() > HOURLY_WINDOW {
                let excess = self.hourly_counts.len() - HOURLY_WINDOW;
                self.hourly_counts.drain(..excess);
            }
        }
        if let Some(current) = self.hourly_counts.last_mut() {
            *current += step;
        }

        self.discharged += step;
        self.sequence += 1;
        self.captured_at = now;
    }
}

/// Read a snapshot from a JSON file.
pub fn load_snapshot(path: &Path) -> Result<ShipSnapshot, ShipDataError> {
    let content = std::fs::read_to_string(path).map_err(|source| ShipDataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ShipDataError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Snapshot source for the polling worker.
pub struct ShipDataFeed {
    source_file: Option<PathBuf>,
    poll: Duration,
    current: ShipSnapshot,
}

impl ShipDataFeed {
    pub fn new(config: &ShipDataConfig) -> Self {
        Self {
            source_file: config.source_file.clone(),
            poll: config.poll_interval(),
            current: ShipSnapshot::new(
                &config.vessel,
                config.total_vehicles,
                config.expected_rate,
                Utc::now(),
            ),
        }
    }

    /// Produce the next snapshot. File snapshots get a fresh sequence
    /// number only when their content changed.
    pub fn next_snapshot(&mut self, now: DateTime<Utc>) -> Result<ShipSnapshot, ShipDataError> {
        match &self.source_file {
            Some(path) => {
                let mut loaded = load_snapshot(path)?;
                loaded.sequence = self.current.sequence;
                if loaded != self.current {
                    loaded.sequence += 1;
                }
                self.current = loaded;
            }
            None => self.current.advance(self.poll, now),
        }
        Ok(self.current.clone())
    }
}

/// Start the polling worker. Sends events via the dashboard event bus.
pub fn start_ship_data_service(config: &ShipDataConfig) -> JoinHandle<()> {
    let mut feed = ShipDataFeed::new(config);
    let poll = config.poll_interval();

    match &config.source_file {
        Some(path) => info!("Reading ship data from {}", path.display()),
        None => info!("No ship data file configured, synthesising progress"),
    }

    tokio::spawn(async move {
        loop {
            match feed.next_snapshot(Utc::now()) {
                Ok(snapshot) => events::send_ship_data(snapshot),
                Err(e) => warn!("Ship data poll failed: {}", e),
            }
            sleep(poll).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_progress_is_capped_and_safe_on_empty_ship() {
        let mut ship = ShipSnapshot::new("MV Empty", 0, 150, at(8, 0));
        assert_eq!(ship.progress(), 0);

        ship.total_vehicles = 200;
        ship.discharged = 50;
        assert_eq!(ship.progress(), 25);

        ship.discharged = 250;
        assert_eq!(ship.progress(), 100);
        assert_eq!(ship.remaining(), 0);
    }

    #[test]
    fn test_advance_fills_hourly_buckets() {
        let mut ship = ShipSnapshot::new("MV Test", 1000, 120, at(8, 0));
        let poll = Duration::from_secs(60);

        ship.advance(poll, at(8, 1));
        ship.advance(poll, at(8, 2));
        ship.advance(poll, at(9, 0));

        assert_eq!(ship.discharged, 6);
        assert_eq!(ship.hourly_counts, vec![4, 2]);
        assert_eq!(ship.sequence, 3);
    }

    #[test]
    fn test_advance_never_overshoots_total() {
        let mut ship = ShipSnapshot::new("MV Small", 3, 3600, at(8, 0));
        ship.advance(Duration::from_secs(60), at(8, 1));
        assert_eq!(ship.discharged, 3);
        ship.advance(Duration::from_secs(60), at(8, 2));
        assert_eq!(ship.discharged, 3);
    }

    #[test]
    fn test_hourly_window_is_bounded() {
        let mut ship = ShipSnapshot::new("MV Long", 100_000, 150, at(0, 0));
        for hour in 1..12 {
            ship.advance(Duration::from_secs(60), at(hour, 0));
        }
        assert_eq!(ship.hourly_counts.len(), HOURLY_WINDOW);
    }

    #[test]
    fn test_snapshot_round_trips_through_widget_data() {
        let ship = ShipSnapshot::new("MV Round", 10, 5, at(8, 0));
        let data = ship.to_data();
        assert_eq!(data["totalVehicles"], serde_json::json!(10));
        assert_eq!(ShipSnapshot::from_data(&data), Some(ship));
    }

    #[test]
    fn test_file_feed_bumps_sequence_only_on_change() {
        let dir = std::env::temp_dir().join(format!("quayside-feed-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("ship.json");
        let ship = ShipSnapshot::new("MV File", 500, 150, at(8, 0));
        std::fs::write(&path, serde_json::to_string(&ship).unwrap()).unwrap();

        let config = ShipDataConfig {
            source_file: Some(path.clone()),
            ..ShipDataConfig::default()
        };
        let mut feed = ShipDataFeed::new(&config);

        let first = feed.next_snapshot(at(8, 1)).unwrap();
        let second = feed.next_snapshot(at(8, 2)).unwrap();
        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 1);

        let mut changed = ship.clone();
        changed.discharged = 42;
        std::fs::write(&path, serde_json::to_string(&changed).unwrap()).unwrap();
        let third = feed.next_snapshot(at(8, 3)).unwrap();
        assert_eq!(third.sequence, 2);
        assert_eq!(third.discharged, 42);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = load_snapshot(Path::new("/nonexistent/quayside/ship.json")).unwrap_err();
        assert!(matches!(err, ShipDataError::Io { .. }));
    }
}
