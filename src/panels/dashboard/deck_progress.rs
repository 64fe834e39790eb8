//! Deck progress panel: discharge progress per vessel deck.

use super::{DECK_UPDATE, PRODUCTIVITY_UPDATE, Panel, WidgetCore, lock};
use crate::functions::formatting::percent;
use crate::services::ship_data::ShipSnapshot;
use quay_widgets::{EventHandler, WidgetError, data_from, handler};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

/// Reference rate the per-productivity-tick step is normalised against.
const REFERENCE_RATE: f64 = 150.0;

/// Deck name and share of the vessel's vehicles, in percent.
const DECK_LAYOUT: [(&str, u32); 4] = [
    ("Upper Deck", 30),
    ("Main Deck", 45),
    ("Lower Deck", 20),
    ("Cargo Hold", 5),
];

const DEFAULT_TOTALS: [u32; 4] = [450, 680, 320, 150];

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Deck {
    pub name: String,
    pub total: u32,
    pub completed: u32,
}

impl Deck {
    fn is_complete(&self) -> bool {
        self.completed >= self.total
    }
}

fn default_decks() -> Vec<Deck> {
    DECK_LAYOUT
        .iter()
        .zip(DEFAULT_TOTALS)
        .map(|((name, _), total)| Deck {
            name: name.to_string(),
            total,
            completed: 0,
        })
        .collect()
}

/// Overall completion across decks, in whole percent.
fn overall_progress(decks: &[Deck]) -> u32 {
    let total = decks.iter().map(|d| d.total).sum();
    let completed = decks.iter().map(|d| d.completed).sum();
    percent(completed, total)
}

#[derive(Clone)]
pub struct DeckProgressPanel {
    core: Arc<WidgetCore>,
    decks: Arc<Mutex<Vec<Deck>>>,
}

impl DeckProgressPanel {
    pub fn new(core: WidgetCore) -> Self {
        Self {
            core: Arc::new(core),
            decks: Arc::new(Mutex::new(default_decks())),
        }
    }

    /// Move every unfinished deck forward in proportion to the average rate.
    fn advance(&self, avg_rate: f64) {
        let step = (avg_rate / REFERENCE_RATE * 10.0).floor().max(0.0) as u32;
        for deck in lock(&self.decks).iter_mut() {
            deck.completed = deck.total.min(deck.completed + step);
        }
    }
}

impl Panel for DeckProgressPanel {
    fn core(&self) -> &WidgetCore {
        &self.core
    }

    fn apply_ship_data(&self, ship: &ShipSnapshot) {
        if ship.total_vehicles == 0 {
            return;
        }
        let progress = ship.progress();
        let mut decks = lock(&self.decks);
        for (deck, (_, share)) in decks.iter_mut().zip(DECK_LAYOUT) {
            deck.total = ship.total_vehicles * share / 100;
            deck.completed = deck.total * progress / 100;
        }
    }

    fn render(&self) -> Result<String, WidgetError> {
        let (payload, summary) = {
            let decks = lock(&self.decks);
            let total_progress = overall_progress(&decks);
            let rows: Vec<String> = decks
                .iter()
                .map(|d| {
                    let mark = if d.is_complete() { " done" } else { "" };
                    format!("{} {}/{}{}", d.name, d.completed, d.total, mark)
                })
                .collect();
            let summary = format!("{}% overall: {}", total_progress, rows.join(", "));
            let payload = data_from(json!({
                "decks": *decks,
                "totalProgress": total_progress,
            }));
            (payload, summary)
        };

        self.core.emit(DECK_UPDATE, payload);
        Ok(summary)
    }

    fn panel_handlers(&self) -> Vec<(String, EventHandler)> {
        let panel = self.clone();
        vec![(
            PRODUCTIVITY_UPDATE.to_string(),
            handler(move |event| {
                let avg_rate = event
                    .field("avgRate")
                    .and_then(Value::as_f64)
                    .ok_or_else(|| WidgetError::handler("productivity update without avgRate"))?;
                panel.advance(avg_rate);
                panel.core().refresh();
                Ok(())
            }),
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panels::dashboard::testing::capture;
    use crate::panels::dashboard::PanelWidget;
    use chrono::Utc;
    use quay_widgets::{ManagerHandle, WidgetManager};

    fn detached() -> DeckProgressPanel {
        DeckProgressPanel::new(WidgetCore::new("deck-progress", Vec::new(), true, ManagerHandle::detached()))
    }

    #[test]
    fn test_ship_data_splits_vehicles_across_decks() {
        let panel = detached();
        let mut ship = ShipSnapshot::new("MV Split", 1000, 150, Utc::now());
        ship.discharged = 500;
        panel.apply_ship_data(&ship);

        let decks = lock(&panel.decks).clone();
        let totals: Vec<u32> = decks.iter().map(|d| d.total).collect();
        let completed: Vec<u32> = decks.iter().map(|d| d.completed).collect();
        assert_eq!(totals, vec![300, 450, 200, 50]);
        assert_eq!(completed, vec![150, 225, 100, 25]);
        assert_eq!(overall_progress(&decks), 50);
    }

    #[test]
    fn test_advance_is_capped_per_deck() {
        let panel = detached();
        panel.apply_ship_data(&ShipSnapshot::new("MV Tiny", 20, 150, Utc::now()));

        // 300 cars/h is a step of 20 per deck.
        panel.advance(300.0);
        let completed: Vec<u32> = lock(&panel.decks).iter().map(|d| d.completed).collect();
        assert_eq!(completed, vec![6, 9, 4, 1]);
        assert_eq!(overall_progress(&lock(&panel.decks)), 100);
    }

    #[tokio::test]
    async fn test_productivity_update_advances_and_emits() {
        let manager = WidgetManager::default();
        let emitted = capture(&manager, DECK_UPDATE);
        let panel = DeckProgressPanel::new(WidgetCore::new(
            "deck-progress",
            Vec::new(),
            true,
            manager.handle(),
        ));
        manager.register_widget("deck-progress", Arc::new(PanelWidget(panel.clone())));

        manager.emit(PRODUCTIVITY_UPDATE, data_from(json!({ "avgRate": 150.0 })));
        manager.wait_idle().await;

        assert_eq!(
            panel.core().last_render(),
            "3% overall: Upper Deck 10/450, Main Deck 10/680, Lower Deck 10/320, Cargo Hold 10/150"
        );
        let emitted = emitted.lock().unwrap();
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].field("totalProgress"), Some(&json!(3)));
    }
}
