//! Hourly productivity panel: vehicles per hour over the recent window.

use super::{PRODUCTIVITY_UPDATE, Panel, WidgetCore, lock};
use crate::functions::formatting::{hour_label, rate, trailing_hour_labels};
use crate::services::ship_data::{HOURLY_WINDOW, ShipSnapshot};
use chrono::{DateTime, Timelike, Utc};
use quay_widgets::{WidgetError, data_from};
use serde_json::json;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct ProductivityState {
    labels: Vec<String>,
    hourly: Vec<u32>,
    remaining: Option<u32>,
    captured_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct HourlyProductivityPanel {
    core: Arc<WidgetCore>,
    state: Arc<Mutex<ProductivityState>>,
}

impl HourlyProductivityPanel {
    pub fn new(core: WidgetCore) -> Self {
        Self {
            core: Arc::new(core),
            state: Arc::new(Mutex::new(ProductivityState::default())),
        }
    }
}

/// Expected hourly counts when the feed has no history yet: the rate starts
/// 20% above target and tapers as the shift wears on.
fn projected_counts(expected_rate: u32) -> Vec<u32> {
    let window = HOURLY_WINDOW as f64;
    (0..HOURLY_WINDOW)
        .map(|i| {
            let hour_progress = (i as f64 + 1.0) / window;
            (f64::from(expected_rate) * (1.2 - hour_progress * 0.4)).round() as u32
        })
        .collect()
}

/// Index of the first maximum and the first minimum.
fn best_and_worst(values: &[u32]) -> Option<(usize, usize)> {
    let mut best = 0;
    let mut worst = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
        if *v < values[worst] {
            worst = i;
        }
    }
    (!values.is_empty()).then_some((best, worst))
}

impl Panel for HourlyProductivityPanel {
    fn core(&self) -> &WidgetCore {
        &self.core
    }

    fn apply_ship_data(&self, ship: &ShipSnapshot) {
        let mut state = lock(&self.state);

        if ship.hourly_counts.is_empty() {
            state.hourly = projected_counts(ship.expected_rate);
            state.labels = (0..HOURLY_WINDOW as u32)
                .map(|i| hour_label(ship.captured_at.hour() + i))
                .collect();
        } else {
            let start = ship.hourly_counts.len().saturating_sub(HOURLY_WINDOW);
            state.hourly = ship.hourly_counts[start..].to_vec();
            state.labels = trailing_hour_labels(ship.captured_at, state.hourly.len());
        }
        state.remaining = Some(ship.remaining());
        state.captured_at = Some(ship.captured_at);
    }

    fn render(&self) -> Result<String, WidgetError> {
        let (payload, summary) = {
            let state = lock(&self.state);
            let Some((best, worst)) = best_and_worst(&state.hourly) else {
                return Ok("no productivity data yet".to_string());
            };

            let total: u32 = state.hourly.iter().sum();
            let avg_rate = f64::from(total) / state.hourly.len() as f64;

            let summary = format!(
                "avg {}, best {} ({} cars), worst {} ({} cars)",
                rate(avg_rate),
                state.labels[best],
                state.hourly[best],
                state.labels[worst],
                state.hourly[worst]
            );
            let payload = data_from(json!({
                "hourlyData": state.hourly,
                "labels": state.labels,
                "avgRate": avg_rate,
                "remaining": state.remaining,
                "capturedAt": state.captured_at,
            }));
            (payload, summary)
        };

        self.core.emit(PRODUCTIVITY_UPDATE, payload);
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panels::dashboard::testing::capture;
    use crate::panels::dashboard::{PanelWidget, SHIP_DATA_ID};
    use chrono::TimeZone;
    use crate::panels::dashboard::ship_data::ShipDataPanel;
    use quay_widgets::{UpdateOptions, WidgetManager};

    fn ship_data_widget(manager: &WidgetManager) -> Arc<PanelWidget<ShipDataPanel>> {
        Arc::new(PanelWidget(ShipDataPanel::new(WidgetCore::new(
            SHIP_DATA_ID,
            Vec::new(),
            true,
            manager.handle(),
        ))))
    }

    #[test]
    fn test_projection_tapers() {
        let counts = projected_counts(100);
        assert_eq!(counts.len(), HOURLY_WINDOW);
        assert_eq!(counts[0], 115);
        assert_eq!(counts[HOURLY_WINDOW - 1], 80);
    }

    #[test]
    fn test_best_and_worst_pick_first_extremes() {
        assert_eq!(best_and_worst(&[3, 9, 1, 9, 1]), Some((1, 2)));
        assert_eq!(best_and_worst(&[]), None);
    }

    #[tokio::test]
    async fn test_cascade_from_ship_data_renders_and_emits() {
        let manager = WidgetManager::default();
        let emitted = capture(&manager, PRODUCTIVITY_UPDATE);
        manager.register_widget(SHIP_DATA_ID, ship_data_widget(&manager));
        let panel = HourlyProductivityPanel::new(WidgetCore::new(
            "hourly-productivity",
            vec![SHIP_DATA_ID.to_string()],
            true,
            manager.handle(),
        ));
        manager.register_widget("hourly-productivity", Arc::new(PanelWidget(panel.clone())));

        let captured = Utc.with_ymd_and_hms(2026, 3, 14, 10, 15, 0).unwrap();
        let mut ship = ShipSnapshot::new("MV Test", 1000, 150, captured);
        ship.hourly_counts = vec![140, 160, 120];
        ship.discharged = 420;
        ship.sequence = 1;
        manager.update_widget_data(SHIP_DATA_ID, ship.to_data(), UpdateOptions::default());
        manager.wait_idle().await;

        assert_eq!(
            panel.core().last_render(),
            "avg 140 cars/h, best 09:00 (160 cars), worst 10:00 (120 cars)"
        );
        let emitted = emitted.lock().unwrap();
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].source, "hourly-productivity");
        assert_eq!(emitted[0].field("avgRate"), Some(&json!(140.0)));
        assert_eq!(emitted[0].field("remaining"), Some(&json!(580)));
    }

    #[tokio::test]
    async fn test_stale_snapshot_is_not_reapplied() {
        let manager = WidgetManager::default();
        manager.register_widget(SHIP_DATA_ID, ship_data_widget(&manager));
        let panel = HourlyProductivityPanel::new(WidgetCore::new(
            "hp",
            vec![SHIP_DATA_ID.to_string()],
            true,
            manager.handle(),
        ));
        manager.register_widget("hp", Arc::new(PanelWidget(panel.clone())));

        let mut ship = ShipSnapshot::new("MV Test", 1000, 150, Utc::now());
        ship.hourly_counts = vec![100];
        ship.sequence = 4;
        manager.update_widget_data(SHIP_DATA_ID, ship.to_data(), UpdateOptions::default());
        manager.wait_idle().await;

        // Same sequence, different counts: treated as already seen.
        ship.hourly_counts = vec![999];
        manager.update_widget_data(SHIP_DATA_ID, ship.to_data(), UpdateOptions::default());
        manager.wait_idle().await;

        assert!(panel.core().last_render().starts_with("avg 100 cars/h"));
    }

    #[test]
    fn test_render_without_data_emits_nothing() {
        let panel = HourlyProductivityPanel::new(WidgetCore::new(
            "hp",
            Vec::new(),
            true,
            quay_widgets::ManagerHandle::detached(),
        ));
        assert_eq!(panel.render().unwrap(), "no productivity data yet");
    }
}
