//! Ship data panel: the source every other panel cascades from.

use super::{Panel, WidgetCore, lock};
use crate::functions::formatting::percent;
use crate::services::ship_data::ShipSnapshot;
use quay_widgets::{WidgetData, WidgetError};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct ShipDataPanel {
    core: Arc<WidgetCore>,
    ship: Arc<Mutex<Option<ShipSnapshot>>>,
}

impl ShipDataPanel {
    pub fn new(core: WidgetCore) -> Self {
        Self {
            core: Arc::new(core),
            ship: Arc::new(Mutex::new(None)),
        }
    }
}

impl Panel for ShipDataPanel {
    fn core(&self) -> &WidgetCore {
        &self.core
    }

    fn apply_data(&self, data: &WidgetData) {
        if let Some(ship) = ShipSnapshot::from_data(data) {
            *lock(&self.ship) = Some(ship);
        }
    }

    fn apply_ship_data(&self, ship: &ShipSnapshot) {
        *lock(&self.ship) = Some(ship.clone());
    }

    fn render(&self) -> Result<String, WidgetError> {
        let guard = lock(&self.ship);
        let Some(ship) = guard.as_ref() else {
            return Ok("waiting for ship data".to_string());
        };
        Ok(format!(
            "{}: {}/{} vehicles ({}%), {} remaining",
            ship.vessel,
            ship.discharged,
            ship.total_vehicles,
            percent(ship.discharged, ship.total_vehicles),
            ship.remaining()
        ))
    }
}
