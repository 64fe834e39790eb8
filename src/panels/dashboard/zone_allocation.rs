//! Zone allocation panel: parking zone usage on the quay.

use super::{DECK_UPDATE, Panel, WidgetCore, ZONE_UPDATE, lock};
use crate::functions::formatting::percent;
use quay_widgets::{EventHandler, WidgetError, data_from, handler};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

/// Share of zone capacity in use once discharge completes, in percent.
const FILL_FACTOR: u32 = 85;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Zone {
    pub name: String,
    pub allocated: u32,
    pub capacity: u32,
    pub efficiency: u32,
}

impl Zone {
    fn new(name: &str, allocated: u32, capacity: u32, efficiency: u32) -> Self {
        Self {
            name: name.to_string(),
            allocated,
            capacity,
            efficiency,
        }
    }

    pub fn utilization(&self) -> u32 {
        percent(self.allocated, self.capacity)
    }
}

fn default_zones() -> Vec<Zone> {
    vec![
        Zone::new("Zone A", 245, 300, 87),
        Zone::new("Zone B", 189, 250, 92),
        Zone::new("Zone C", 156, 200, 83),
    ]
}

#[derive(Clone)]
pub struct ZoneAllocationPanel {
    core: Arc<WidgetCore>,
    zones: Arc<Mutex<Vec<Zone>>>,
}

impl ZoneAllocationPanel {
    pub fn new(core: WidgetCore) -> Self {
        Self {
            core: Arc::new(core),
            zones: Arc::new(Mutex::new(default_zones())),
        }
    }

    /// Re-allocate zones for the overall discharge progress (0..=100).
    fn reallocate(&self, progress: u32) {
        let progress = progress.min(100);
        for zone in lock(&self.zones).iter_mut() {
            zone.allocated = zone.capacity * progress * FILL_FACTOR / 10_000;
        }
    }
}

impl Panel for ZoneAllocationPanel {
    fn core(&self) -> &WidgetCore {
        &self.core
    }

    fn render(&self) -> Result<String, WidgetError> {
        let (payload, summary) = {
            let zones = lock(&self.zones);
            if zones.is_empty() {
                return Ok("no zones configured".to_string());
            }
            let total_allocated: u32 = zones.iter().map(|z| z.allocated).sum();
            let efficiency_sum: u32 = zones.iter().map(|z| z.efficiency).sum();
            let avg_efficiency =
                (f64::from(efficiency_sum) / zones.len() as f64).round() as u32;

            let rows: Vec<String> = zones
                .iter()
                .map(|z| {
                    format!("{} {}/{} ({}%)", z.name, z.allocated, z.capacity, z.utilization())
                })
                .collect();
            let summary = format!(
                "{}; {} allocated, efficiency {}%",
                rows.join(", "),
                total_allocated,
                avg_efficiency
            );
            let payload = data_from(json!({
                "zones": *zones,
                "totalAllocated": total_allocated,
                "avgEfficiency": avg_efficiency,
            }));
            (payload, summary)
        };

        self.core.emit(ZONE_UPDATE, payload);
        Ok(summary)
    }

    fn panel_handlers(&self) -> Vec<(String, EventHandler)> {
        let panel = self.clone();
        vec![(
            DECK_UPDATE.to_string(),
            handler(move |event| {
                let progress = event
                    .field("totalProgress")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| WidgetError::handler("deck update without totalProgress"))?;
                panel.reallocate(u32::try_from(progress).unwrap_or(u32::MAX));
                panel.core().refresh();
                Ok(())
            }),
        )]
    }
}
