//! Generic panel: holds whatever payload it is given. Used for unknown
//! widget kinds and the chart and form integration targets.

use super::{Panel, WidgetCore, lock};
use quay_widgets::{WidgetData, WidgetError};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct GenericPanel {
    core: Arc<WidgetCore>,
    payload: Arc<Mutex<WidgetData>>,
}

impl GenericPanel {
    pub fn new(core: WidgetCore) -> Self {
        Self {
            core: Arc::new(core),
            payload: Arc::new(Mutex::new(WidgetData::new())),
        }
    }
}

impl Panel for GenericPanel {
    fn core(&self) -> &WidgetCore {
        &self.core
    }

    fn apply_data(&self, data: &WidgetData) {
        *lock(&self.payload) = data.clone();
    }

    fn render(&self) -> Result<String, WidgetError> {
        let payload = lock(&self.payload);
        if payload.is_empty() {
            return Ok("no data".to_string());
        }
        let keys: Vec<&str> = payload.keys().map(String::as_str).collect();
        Ok(format!("{} fields: {}", keys.len(), keys.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panels::dashboard::PanelWidget;
    use quay_widgets::{ManagerHandle, UpdateOptions, WidgetManager, data_from};
    use serde_json::json;

    #[test]
    fn test_empty_payload() {
        let panel = GenericPanel::new(WidgetCore::new("charts", Vec::new(), true, ManagerHandle::detached()));
        assert_eq!(panel.render().unwrap(), "no data");
    }

    #[tokio::test]
    async fn test_summarises_merged_payload() {
        let manager = WidgetManager::default();
        let panel = GenericPanel::new(WidgetCore::new("charts", Vec::new(), true, manager.handle()));
        manager.register_widget("charts", Arc::new(PanelWidget(panel.clone())));

        manager.update_widget_data("charts", data_from(json!({ "series": [1, 2] })), UpdateOptions::local());
        manager.update_widget_data("charts", data_from(json!({ "axis": "hours" })), UpdateOptions::local());
        manager.wait_idle().await;

        assert_eq!(panel.core().last_render(), "2 fields: axis, series");
    }
}
