//! Hourly tracker panel: current rate against target, with an ETA.

use super::{PRODUCTIVITY_UPDATE, Panel, WidgetCore, ZONE_UPDATE, lock};
use crate::functions::formatting::{clock_time, rate};
use chrono::{DateTime, Duration, Utc};
use quay_widgets::{Event, EventHandler, WidgetError, handler};
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Mutex};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackerStatus {
    OnTarget,
    Behind,
    Critical,
}

impl TrackerStatus {
    /// Classify a rate given as percent of target.
    pub fn from_percent(percent: u32) -> Self {
        match percent {
            100.. => Self::OnTarget,
            80.. => Self::Behind,
            _ => Self::Critical,
        }
    }
}

impl fmt::Display for TrackerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::OnTarget => "on target",
            Self::Behind => "behind",
            Self::Critical => "critical",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Default)]
struct TrackerState {
    current_rate: Option<f64>,
    efficiency: Option<u32>,
    remaining: Option<u32>,
    captured_at: Option<DateTime<Utc>>,
}

impl TrackerState {
    /// Completion time at the current rate, if it can be estimated.
    fn estimated_completion(&self) -> Option<DateTime<Utc>> {
        let rate = self.current_rate.filter(|r| *r > 0.0)?;
        let remaining = self.remaining?;
        let seconds = (f64::from(remaining) / rate * 3600.0).round() as i64;
        self.captured_at?.checked_add_signed(Duration::try_seconds(seconds)?)
    }
}

#[derive(Clone)]
pub struct HourlyTrackerPanel {
    core: Arc<WidgetCore>,
    target_rate: u32,
    state: Arc<Mutex<TrackerState>>,
}

impl HourlyTrackerPanel {
    pub fn new(core: WidgetCore, target_rate: u32) -> Self {
        Self {
            core: Arc::new(core),
            target_rate,
            state: Arc::new(Mutex::new(TrackerState::default())),
        }
    }

    fn on_productivity(&self, event: &Event) -> Result<(), WidgetError> {
        let avg_rate = event
            .field("avgRate")
            .and_then(Value::as_f64)
            .ok_or_else(|| WidgetError::handler("productivity update without avgRate"))?;
        let remaining = event
            .field("remaining")
            .and_then(Value::as_u64)
            .and_then(|r| u32::try_from(r).ok());
        let captured_at = event
            .field("capturedAt")
            .cloned()
            .and_then(|v| serde_json::from_value::<DateTime<Utc>>(v).ok());

        let mut state = lock(&self.state);
        state.current_rate = Some(avg_rate);
        state.remaining = remaining.or(state.remaining);
        state.captured_at = captured_at.or(state.captured_at);
        Ok(())
    }

    fn on_zone(&self, event: &Event) -> Result<(), WidgetError> {
        let efficiency = event
            .field("avgEfficiency")
            .and_then(Value::as_u64)
            .and_then(|e| u32::try_from(e).ok())
            .ok_or_else(|| WidgetError::handler("zone update without avgEfficiency"))?;
        lock(&self.state).efficiency = Some(efficiency);
        Ok(())
    }
}

impl Panel for HourlyTrackerPanel {
    fn core(&self) -> &WidgetCore {
        &self.core
    }

    fn render(&self) -> Result<String, WidgetError> {
        let state = lock(&self.state);
        let Some(current) = state.current_rate else {
            return Ok(format!("target {}, waiting for productivity data", rate(self.target_rate.into())));
        };

        let percent = if self.target_rate == 0 {
            0
        } else {
            (current / f64::from(self.target_rate) * 100.0).round() as u32
        };
        let status = TrackerStatus::from_percent(percent);
        let efficiency = state
            .efficiency
            .map_or_else(|| "n/a".to_string(), |e| format!("{e}%"));
        let eta = state
            .estimated_completion()
            .map_or_else(|| "n/a".to_string(), clock_time);

        Ok(format!(
            "{} of {} ({}%, {}), efficiency {}, completion {}",
            rate(current),
            rate(self.target_rate.into()),
            percent,
            status,
            efficiency,
            eta
        ))
    }

    fn panel_handlers(&self) -> Vec<(String, EventHandler)> {
        let on_productivity = self.clone();
        let on_zone = self.clone();
        vec![
            (
                PRODUCTIVITY_UPDATE.to_string(),
                handler(move |event| {
                    on_productivity.on_productivity(event)?;
                    on_productivity.core().refresh();
                    Ok(())
                }),
            ),
            (
                ZONE_UPDATE.to_string(),
                handler(move |event| {
                    on_zone.on_zone(event)?;
                    on_zone.core().refresh();
                    Ok(())
                }),
            ),
        ]
    }
}
