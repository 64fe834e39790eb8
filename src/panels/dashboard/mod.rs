//! Dashboard panels.
//!
//! Every panel shares the behaviour in this module:
//! - `widget:dataUpdate` from a dependency that propagated -> refresh
//! - `widget:broadcast` carrying `shipDataUpdate` -> apply the snapshot
//! - `widget:periodicSync` -> refresh when auto-update is on
//!
//! Rendering is a text summary, logged and kept for inspection.

use crate::services::ship_data::ShipSnapshot;
use futures_util::FutureExt;
use log::info;
use quay_widgets::event::{BROADCAST, DATA_UPDATE, PERIODIC_SYNC};
use quay_widgets::{
    EventDetail, EventHandler, ManagerHandle, UpdateFuture, Widget, WidgetData, WidgetError,
    handler,
};
use serde_json::Value;
use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod deck_progress;
pub mod events;
pub mod generic;
pub mod hourly_productivity;
pub mod hourly_tracker;
pub mod ship_data;
pub mod zone_allocation;

pub const SHIP_DATA_ID: &str = "ship-data";

/// Broadcast `type` carrying a fresh ship snapshot.
pub const SHIP_DATA_UPDATE: &str = "shipDataUpdate";

pub const PRODUCTIVITY_UPDATE: &str = "productivity:update";
pub const DECK_UPDATE: &str = "deck:update";
pub const ZONE_UPDATE: &str = "zone:update";

/// Lock a panel's state, recovering from a poisoned lock.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared by every panel.
pub struct WidgetCore {
    pub id: String,
    pub dependencies: Vec<String>,
    pub auto_update: bool,
    manager: ManagerHandle,
    last_ship_sequence: Mutex<Option<u64>>,
    last_render: Mutex<String>,
}

impl WidgetCore {
    pub fn new(id: &str, dependencies: Vec<String>, auto_update: bool, manager: ManagerHandle) -> Self {
        Self {
            id: id.to_string(),
            dependencies,
            auto_update,
            manager,
            last_ship_sequence: Mutex::new(None),
            last_render: Mutex::new(String::new()),
        }
    }

    pub fn depends_on(&self, id: &str) -> bool {
        self.dependencies.iter().any(|d| d == id)
    }

    /// Ask the manager to update this panel on the next flush.
    pub fn refresh(&self) {
        self.manager.queue_update(&self.id);
    }

    /// Emit a panel event, stamped with this panel as source.
    pub fn emit(&self, name: &str, mut data: WidgetData) {
        data.insert("source".to_string(), Value::String(self.id.clone()));
        self.manager.emit(name, data);
    }

    pub fn last_render(&self) -> String {
        lock(&self.last_render).clone()
    }

    fn record_render(&self, summary: String) {
        info!("[{}] {}", self.id, summary);
        *lock(&self.last_render) = summary;
    }

    /// Latest ship snapshot stored by the manager, if this panel depends on
    /// ship data and the snapshot is newer than the last one applied.
    fn fresh_ship_snapshot(&self) -> Option<ShipSnapshot> {
        if !self.depends_on(SHIP_DATA_ID) {
            return None;
        }
        let manager = self.manager.upgrade()?;
        let snapshot = ShipSnapshot::from_data(&manager.get_widget_data(SHIP_DATA_ID)?)?;
        self.accept_sequence(snapshot.sequence).then_some(snapshot)
    }

    fn accept_sequence(&self, sequence: u64) -> bool {
        let mut last = lock(&self.last_ship_sequence);
        if last.is_some_and(|seen| seen >= sequence) {
            return false;
        }
        *last = Some(sequence);
        true
    }

    fn force_sequence(&self, sequence: u64) {
        *lock(&self.last_ship_sequence) = Some(sequence);
    }
}

/// A dashboard panel. Wrapped in [`PanelWidget`] for registration.
pub trait Panel: Clone + Send + Sync + 'static {
    fn core(&self) -> &WidgetCore;

    /// Apply a new ship snapshot to the panel state.
    fn apply_ship_data(&self, ship: &ShipSnapshot) {
        let _ = ship;
    }

    /// Apply the panel's own stored payload.
    fn apply_data(&self, data: &WidgetData) {
        let _ = data;
    }

    /// Render the current state and return the summary.
    fn render(&self) -> Result<String, WidgetError>;

    /// Handlers on top of the shared ones.
    fn panel_handlers(&self) -> Vec<(String, EventHandler)> {
        Vec::new()
    }

    fn initial_data(&self) -> Option<WidgetData> {
        None
    }
}

/// Adapter from a [`Panel`] to the manager's widget contract.
pub struct PanelWidget<P: Panel>(pub P);

impl<P: Panel> PanelWidget<P> {
    fn base_handlers(&self) -> Vec<(String, EventHandler)> {
        let on_data = self.0.clone();
        let on_broadcast = self.0.clone();
        let on_sync = self.0.clone();

        vec![
            (
                DATA_UPDATE.to_string(),
                handler(move |event| {
                    if let EventDetail::DataUpdate {
                        widget_id,
                        propagate: true,
                        ..
                    } = &event.detail
                    {
                        if on_data.core().depends_on(widget_id) {
                            on_data.core().refresh();
                        }
                    }
                    Ok(())
                }),
            ),
            (
                BROADCAST.to_string(),
                handler(move |event| {
                    let EventDetail::Broadcast { data } = &event.detail else {
                        return Ok(());
                    };
                    if data.get("type").and_then(Value::as_str) != Some(SHIP_DATA_UPDATE) {
                        return Ok(());
                    }
                    let ship: ShipSnapshot = data
                        .get("shipData")
                        .cloned()
                        .map(serde_json::from_value::<ShipSnapshot>)
                        .transpose()
                        .map_err(|e| WidgetError::handler(format!("bad shipData: {e}")))?
                        .ok_or_else(|| WidgetError::handler("shipDataUpdate without shipData"))?;
                    on_broadcast.core().force_sequence(ship.sequence);
                    on_broadcast.apply_ship_data(&ship);
                    Ok(())
                }),
            ),
            (
                PERIODIC_SYNC.to_string(),
                handler(move |_| {
                    if on_sync.core().auto_update {
                        on_sync.core().refresh();
                    }
                    Ok(())
                }),
            ),
        ]
    }
}

impl<P: Panel> Widget for PanelWidget<P> {
    fn dependencies(&self) -> Vec<String> {
        self.0.core().dependencies.clone()
    }

    fn event_handlers(&self) -> Vec<(String, EventHandler)> {
        let mut handlers = self.base_handlers();
        handlers.extend(self.0.panel_handlers());
        handlers
    }

    fn initial_data(&self) -> Option<WidgetData> {
        self.0.initial_data()
    }

    fn update(&self, data: Option<WidgetData>) -> Option<UpdateFuture<'_>> {
        let panel = self.0.clone();
        let render = async move {
            if let Some(data) = &data {
                panel.apply_data(data);
            }
            if let Some(ship) = panel.core().fresh_ship_snapshot() {
                panel.apply_ship_data(&ship);
            }
            let summary = panel.render()?;
            panel.core().record_render(summary);
            Ok::<(), WidgetError>(())
        };
        Some(render.boxed())
    }
}
