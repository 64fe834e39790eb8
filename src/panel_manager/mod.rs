use crate::config::AppConfig;
use crate::panels::dashboard::events::DashboardEvent;
use crate::panels::dashboard::{Panel, PanelWidget, SHIP_DATA_ID, SHIP_DATA_UPDATE, WidgetCore};
use crate::services::ship_data::ShipSnapshot;
use log::{debug, info, warn};
use quay_widgets::{UpdateOptions, Widget, WidgetError, WidgetManager, handler};
use serde_json::{Value, json};
use std::sync::Arc;

pub mod factory;

pub use factory::{GENERIC_KIND, PanelContext, PanelFactory, WidgetFactory};

/// Widget-defined events forwarded into widget data: event name and target widget.
const INTEGRATIONS: [(&str, &str); 2] = [("chartUpdate", "charts"), ("formUpdate", "forms")];

/// A created panel, kept by the dashboard for inspection.
pub trait PanelInstance: Send + Sync {
    /// Last rendered summary, empty before the first render.
    fn summary(&self) -> String;

    fn into_widget(self: Arc<Self>) -> Arc<dyn Widget>;
}

impl<P: Panel> PanelInstance for PanelWidget<P> {
    fn summary(&self) -> String {
        self.0.core().last_render()
    }

    fn into_widget(self: Arc<Self>) -> Arc<dyn Widget> {
        self
    }
}

/// Coordinates the configured panels on one widget manager.
pub struct Dashboard {
    manager: WidgetManager,
    panels: Vec<(String, Arc<dyn PanelInstance>)>,
}

impl Dashboard {
    /// Create and register every panel in the configured layout. Unknown
    /// kinds fall back to the generic panel.
    pub fn build(manager: &WidgetManager, config: &AppConfig, factory: &WidgetFactory) -> Self {
        let context = PanelContext {
            target_rate: config.target_rate,
        };
        let mut panels = Vec::new();

        for layout in &config.widgets {
            let found = factory.find(&layout.kind).or_else(|| {
                warn!(
                    "Unknown widget type {} for {} (available: {}), using {}",
                    layout.kind,
                    layout.id,
                    factory.available_types().join(", "),
                    GENERIC_KIND
                );
                factory.find(GENERIC_KIND)
            });
            let Some(kind_factory) = found else {
                warn!("No factory for widget {}, skipping", layout.id);
                continue;
            };

            let dependencies = layout
                .dependencies
                .clone()
                .unwrap_or_else(|| kind_factory.default_dependencies());
            let core = WidgetCore::new(&layout.id, dependencies, layout.auto_update, manager.handle());
            let instance = kind_factory.create_instance(core, &context);

            if manager.register_widget(&layout.id, Arc::clone(&instance).into_widget()) {
                debug!("Created {} panel {}", kind_factory.kind(), layout.id);
                panels.push((layout.id.clone(), instance));
            }
        }

        info!("Dashboard ready with {} panels", panels.len());
        Self {
            manager: manager.clone(),
            panels,
        }
    }

    /// Forward `chartUpdate` and `formUpdate` payloads into the chart and
    /// form widgets. The event's `data` object is merged and propagated.
    pub fn attach_integrations(&self) {
        for (event, target) in INTEGRATIONS {
            let manager = self.manager.handle();
            self.manager.add_listener(
                event,
                handler(move |e| {
                    let data = e
                        .field("data")
                        .and_then(Value::as_object)
                        .cloned()
                        .ok_or_else(|| WidgetError::handler(format!("{event} without data")))?;
                    if !manager.update_widget_data(target, data, UpdateOptions::default()) {
                        debug!("Dropped {} for {}", event, target);
                    }
                    Ok(())
                }),
            );
        }
    }

    pub fn handle_event(&self, event: DashboardEvent) {
        match event {
            DashboardEvent::ShipData(ship) => self.apply_ship_snapshot(&ship),
        }
    }

    /// Store the snapshot on the ship-data widget and broadcast it to every
    /// panel.
    pub fn apply_ship_snapshot(&self, ship: &ShipSnapshot) {
        debug!(
            "Ship snapshot {} for {}: {}/{}",
            ship.sequence, ship.vessel, ship.discharged, ship.total_vehicles
        );
        self.manager
            .update_widget_data(SHIP_DATA_ID, ship.to_data(), UpdateOptions::default());
        self.manager.broadcast(json!({
            "type": SHIP_DATA_UPDATE,
            "shipData": ship,
        }));
    }

    /// Last rendered summary per panel, in layout order.
    pub fn summaries(&self) -> Vec<(String, String)> {
        self.panels
            .iter()
            .map(|(id, panel)| (id.clone(), panel.summary()))
            .collect()
    }
}
