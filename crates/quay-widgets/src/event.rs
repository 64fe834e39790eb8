//! Event envelope delivered on the bus.
//!
//! Every event carries a fixed envelope (`name`, `timestamp`, `source`) and a
//! typed `detail`. Built-in manager events have their own variants; widgets
//! are free to emit any other name with a JSON object payload.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// A widget's data payload. Merges are shallow: top-level keys overwrite.
pub type WidgetData = serde_json::Map<String, Value>;

/// Source used when an event payload does not name one.
pub const DEFAULT_SOURCE: &str = "widget-manager";

pub const DATA_UPDATE: &str = "widget:dataUpdate";
pub const DEPENDENCY_UPDATE: &str = "widget:dependencyUpdate";
pub const BROADCAST: &str = "widget:broadcast";
pub const UPDATED: &str = "widget:updated";
pub const ERROR: &str = "widget:error";
pub const PERIODIC_SYNC: &str = "widget:periodicSync";

/// Typed event payload.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EventDetail {
    DataUpdate {
        widget_id: String,
        data: WidgetData,
        propagate: bool,
    },
    DependencyUpdate {
        widget_id: String,
        source_widget_id: String,
        data: WidgetData,
    },
    Broadcast {
        data: Value,
    },
    Updated {
        widget_id: String,
    },
    Error {
        widget_id: String,
        error: String,
    },
    PeriodicSync {
        active_widgets: Vec<String>,
    },
    /// Widget-defined event (e.g. `productivity:update`).
    Custom(WidgetData),
}

impl EventDetail {
    /// Name this detail is delivered under, if it is a built-in event.
    pub fn builtin_name(&self) -> Option<&'static str> {
        match self {
            EventDetail::DataUpdate { .. } => Some(DATA_UPDATE),
            EventDetail::DependencyUpdate { .. } => Some(DEPENDENCY_UPDATE),
            EventDetail::Broadcast { .. } => Some(BROADCAST),
            EventDetail::Updated { .. } => Some(UPDATED),
            EventDetail::Error { .. } => Some(ERROR),
            EventDetail::PeriodicSync { .. } => Some(PERIODIC_SYNC),
            EventDetail::Custom(_) => None,
        }
    }
}

/// An event as seen by listeners.
#[derive(Clone, Debug, Serialize)]
pub struct Event {
    pub name: String,
    pub detail: EventDetail,
    pub timestamp: DateTime<Utc>,
    pub source: String,
}

impl Event {
    /// Build a built-in event. The name comes from the detail variant.
    pub fn builtin(detail: EventDetail, source: impl Into<String>) -> Self {
        let name = detail.builtin_name().unwrap_or("widget:custom").to_string();
        Self {
            name,
            detail,
            timestamp: Utc::now(),
            source: source.into(),
        }
    }

    /// Build a widget-defined event. A string `source` key in `data` wins
    /// over `default_source`.
    pub fn custom(name: impl Into<String>, data: WidgetData, default_source: &str) -> Self {
        let source = data
            .get("source")
            .and_then(Value::as_str)
            .unwrap_or(default_source)
            .to_string();
        Self {
            name: name.into(),
            detail: EventDetail::Custom(data),
            timestamp: Utc::now(),
            source,
        }
    }

    /// Widget the event is about, for built-in events that carry one.
    pub fn widget_id(&self) -> Option<&str> {
        match &self.detail {
            EventDetail::DataUpdate { widget_id, .. }
            | EventDetail::DependencyUpdate { widget_id, .. }
            | EventDetail::Updated { widget_id }
            | EventDetail::Error { widget_id, .. } => Some(widget_id.as_str()),
            _ => None,
        }
    }

    /// Look up a key in a custom payload.
    pub fn field(&self, key: &str) -> Option<&Value> {
        match &self.detail {
            EventDetail::Custom(data) => data.get(key),
            _ => None,
        }
    }
}

/// Build a `WidgetData` from a `json!` object literal. Non-objects yield an
/// empty payload.
pub fn data_from(value: Value) -> WidgetData {
    match value {
        Value::Object(map) => map,
        _ => WidgetData::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_custom_event_defaults_source() {
        let event = Event::custom("zone:update", data_from(json!({"total": 3})), DEFAULT_SOURCE);
        assert_eq!(event.name, "zone:update");
        assert_eq!(event.source, DEFAULT_SOURCE);
        assert_eq!(event.field("total"), Some(&json!(3)));
    }

    #[test]
    fn test_custom_event_keeps_payload_source() {
        let event = Event::custom(
            "deck:update",
            data_from(json!({"source": "deck-progress"})),
            DEFAULT_SOURCE,
        );
        assert_eq!(event.source, "deck-progress");
    }

    #[test]
    fn test_builtin_event_name_follows_variant() {
        let event = Event::builtin(
            EventDetail::Updated {
                widget_id: "a".into(),
            },
            DEFAULT_SOURCE,
        );
        assert_eq!(event.name, UPDATED);
        assert_eq!(event.widget_id(), Some("a"));
        assert_eq!(event.field("widgetId"), None);
    }

    #[test]
    fn test_detail_serializes_camel_case() {
        let detail = EventDetail::DependencyUpdate {
            widget_id: "b".into(),
            source_widget_id: "a".into(),
            data: WidgetData::new(),
        };
        let value = serde_json::to_value(&detail).unwrap();
        assert_eq!(value["kind"], "dependencyUpdate");
        assert_eq!(value["sourceWidgetId"], "a");
    }

    #[test]
    fn test_data_from_non_object_is_empty() {
        assert!(data_from(json!([1, 2])).is_empty());
    }
}
