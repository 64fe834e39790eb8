use crate::panels::dashboard::deck_progress::DeckProgressPanel;
use crate::panels::dashboard::generic::GenericPanel;
use crate::panels::dashboard::hourly_productivity::HourlyProductivityPanel;
use crate::panels::dashboard::hourly_tracker::HourlyTrackerPanel;
use crate::panels::dashboard::ship_data::ShipDataPanel;
use crate::panels::dashboard::zone_allocation::ZoneAllocationPanel;
use crate::panels::dashboard::{PanelWidget, SHIP_DATA_ID, WidgetCore};
use crate::panel_manager::PanelInstance;
use std::sync::Arc;

/// Kind used when a layout names a type no factory knows.
pub const GENERIC_KIND: &str = "generic";

/// Settings shared by every panel the factories build.
#[derive(Clone, Debug)]
pub struct PanelContext {
    pub target_rate: u32,
}

/// Trait that defines a factory for one kind of dashboard panel.
pub trait PanelFactory: Send + Sync {
    /// Type name used in the widget layout.
    fn kind(&self) -> &str;

    /// Dependencies used when the layout does not override them.
    fn default_dependencies(&self) -> Vec<String>;

    /// Build the widget around an already configured core.
    fn create_instance(&self, core: WidgetCore, context: &PanelContext) -> Arc<dyn PanelInstance>;
}

/// Factory for the built-in panel kinds.
struct BuiltinFactory {
    kind: &'static str,
    dependencies: &'static [&'static str],
    build: fn(WidgetCore, &PanelContext) -> Arc<dyn PanelInstance>,
}

impl PanelFactory for BuiltinFactory {
    fn kind(&self) -> &str {
        self.kind
    }

    fn default_dependencies(&self) -> Vec<String> {
        self.dependencies.iter().map(|d| d.to_string()).collect()
    }

    fn create_instance(&self, core: WidgetCore, context: &PanelContext) -> Arc<dyn PanelInstance> {
        (self.build)(core, context)
    }
}

fn ship_data(core: WidgetCore, _: &PanelContext) -> Arc<dyn PanelInstance> {
    Arc::new(PanelWidget(ShipDataPanel::new(core)))
}

fn hourly_productivity(core: WidgetCore, _: &PanelContext) -> Arc<dyn PanelInstance> {
    Arc::new(PanelWidget(HourlyProductivityPanel::new(core)))
}

fn deck_progress(core: WidgetCore, _: &PanelContext) -> Arc<dyn PanelInstance> {
    Arc::new(PanelWidget(DeckProgressPanel::new(core)))
}

fn zone_allocation(core: WidgetCore, _: &PanelContext) -> Arc<dyn PanelInstance> {
    Arc::new(PanelWidget(ZoneAllocationPanel::new(core)))
}

fn hourly_tracker(core: WidgetCore, context: &PanelContext) -> Arc<dyn PanelInstance> {
    Arc::new(PanelWidget(HourlyTrackerPanel::new(core, context.target_rate)))
}

fn generic(core: WidgetCore, _: &PanelContext) -> Arc<dyn PanelInstance> {
    Arc::new(PanelWidget(GenericPanel::new(core)))
}

fn builtin_factories() -> Vec<BuiltinFactory> {
    vec![
        BuiltinFactory {
            kind: SHIP_DATA_ID,
            dependencies: &[],
            build: ship_data,
        },
        BuiltinFactory {
            kind: "hourly-productivity",
            dependencies: &[SHIP_DATA_ID],
            build: hourly_productivity,
        },
        BuiltinFactory {
            kind: "deck-progress",
            dependencies: &[SHIP_DATA_ID, "hourly-productivity"],
            build: deck_progress,
        },
        BuiltinFactory {
            kind: "zone-allocation",
            dependencies: &[SHIP_DATA_ID, "deck-progress"],
            build: zone_allocation,
        },
        BuiltinFactory {
            kind: "hourly-tracker",
            dependencies: &["hourly-productivity", "zone-allocation"],
            build: hourly_tracker,
        },
        BuiltinFactory {
            kind: GENERIC_KIND,
            dependencies: &[],
            build: generic,
        },
    ]
}

/// Creates panels by type name.
pub struct WidgetFactory {
    factories: Vec<Box<dyn PanelFactory>>,
}

impl Default for WidgetFactory {
    fn default() -> Self {
        let mut factory = Self::new();
        for builtin in builtin_factories() {
            factory.register_factory(builtin);
        }
        factory
    }
}

impl WidgetFactory {
    pub fn new() -> Self {
        Self {
            factories: Vec::new(),
        }
    }

    /// Register a factory. A later factory for the same kind wins.
    pub fn register_factory<F: PanelFactory + 'static>(&mut self, factory: F) {
        self.factories.push(Box::new(factory));
    }

    pub fn find(&self, kind: &str) -> Option<&dyn PanelFactory> {
        self.factories
            .iter()
            .rev()
            .find(|f| f.kind() == kind)
            .map(|f| &**f)
    }

    /// Registered type names, in registration order, without duplicates.
    pub fn available_types(&self) -> Vec<String> {
        let mut kinds: Vec<String> = Vec::new();
        for factory in &self.factories {
            if !kinds.iter().any(|k| k == factory.kind()) {
                kinds.push(factory.kind().to_string());
            }
        }
        kinds
    }
}
