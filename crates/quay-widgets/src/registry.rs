//! Widget registry: one record per registered widget, in registration order.

use crate::bus::ListenerId;
use crate::error::WidgetError;
use crate::event::WidgetData;
use crate::widget::Widget;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// Bookkeeping for one registered widget.
pub struct WidgetRecord {
    pub id: String,
    pub instance: Arc<dyn Widget>,
    /// Widgets this one is refreshed after. Fixed at registration.
    pub dependencies: Vec<String>,
    /// Widgets that subscribed to this one. Advisory only.
    pub subscribers: BTreeSet<String>,
    pub last_update: DateTime<Utc>,
    pub data: Option<WidgetData>,
    /// Bus attachments made on this widget's behalf.
    pub(crate) listeners: Vec<(String, ListenerId)>,
}

impl WidgetRecord {
    pub fn new(id: impl Into<String>, instance: Arc<dyn Widget>) -> Self {
        Self {
            id: id.into(),
            dependencies: instance.dependencies(),
            data: instance.initial_data(),
            instance,
            subscribers: BTreeSet::new(),
            last_update: Utc::now(),
            listeners: Vec::new(),
        }
    }

    pub fn depends_on(&self, id: &str) -> bool {
        self.dependencies.iter().any(|d| d == id)
    }

    /// Shallow merge: keys in `data` overwrite, other keys stay.
    pub fn merge(&mut self, data: WidgetData) -> &WidgetData {
        let stored = self.data.get_or_insert_with(WidgetData::new);
        stored.extend(data);
        self.last_update = Utc::now();
        stored
    }

    pub fn status(&self) -> WidgetStatus {
        WidgetStatus {
            id: self.id.clone(),
            registered: true,
            last_update: self.last_update,
            has_data: self.data.is_some(),
            subscriber_count: self.subscribers.len(),
            dependency_count: self.dependencies.len(),
        }
    }
}

/// Read-only snapshot of a record's metadata.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetStatus {
    pub id: String,
    pub registered: bool,
    pub last_update: DateTime<Utc>,
    pub has_data: bool,
    pub subscriber_count: usize,
    pub dependency_count: usize,
}

#[derive(Default)]
pub struct WidgetRegistry {
    records: HashMap<String, WidgetRecord>,
    order: Vec<String>,
}

impl WidgetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// Add a record. An existing id is never overwritten.
    pub fn insert(&mut self, record: WidgetRecord) -> Result<(), WidgetError> {
        if record.id.is_empty() {
            return Err(WidgetError::EmptyId);
        }
        if self.records.contains_key(&record.id) {
            return Err(WidgetError::AlreadyRegistered(record.id));
        }
        self.order.push(record.id.clone());
        self.records.insert(record.id.clone(), record);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Option<WidgetRecord> {
        let record = self.records.remove(id)?;
        self.order.retain(|o| o != id);
        Some(record)
    }

    pub fn get(&self, id: &str) -> Option<&WidgetRecord> {
        self.records.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut WidgetRecord> {
        self.records.get_mut(id)
    }

    /// Registered ids in registration order.
    pub fn ids(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut WidgetRecord> {
        self.records.values_mut()
    }

    /// Records in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &WidgetRecord> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    /// Widgets that declared `id` as a dependency, in registration order.
    pub fn dependents_of(&self, id: &str) -> Vec<String> {
        self.iter()
            .filter(|r| r.depends_on(id))
            .map(|r| r.id.clone())
            .collect()
    }

    pub fn all_data(&self) -> BTreeMap<String, WidgetData> {
        self.iter()
            .filter_map(|r| r.data.clone().map(|d| (r.id.clone(), d)))
            .collect()
    }

    pub fn statuses(&self) -> BTreeMap<String, WidgetStatus> {
        self.iter().map(|r| (r.id.clone(), r.status())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::data_from;
    use serde_json::json;

    struct Plain {
        deps: Vec<String>,
        initial: Option<WidgetData>,
    }

    impl Widget for Plain {
        fn dependencies(&self) -> Vec<String> {
            self.deps.clone()
        }

        fn initial_data(&self) -> Option<WidgetData> {
            self.initial.clone()
        }
    }

    fn record(id: &str, deps: &[&str]) -> WidgetRecord {
        WidgetRecord::new(
            id,
            Arc::new(Plain {
                deps: deps.iter().map(|d| d.to_string()).collect(),
                initial: None,
            }),
        )
    }

    #[test]
    fn test_duplicate_insert_keeps_original() {
        let mut registry = WidgetRegistry::new();
        registry.insert(record("a", &[])).unwrap();
        let err = registry.insert(record("a", &["x"])).unwrap_err();

        assert!(matches!(err, WidgetError::AlreadyRegistered(id) if id == "a"));
        assert_eq!(registry.len(), 1);
        assert!(registry.get("a").unwrap().dependencies.is_empty());
    }

    #[test]
    fn test_empty_id_rejected() {
        let mut registry = WidgetRegistry::new();
        assert!(matches!(
            registry.insert(record("", &[])),
            Err(WidgetError::EmptyId)
        ));
    }

    #[test]
    fn test_dependents_in_registration_order() {
        let mut registry = WidgetRegistry::new();
        registry.insert(record("c", &["a"])).unwrap();
        registry.insert(record("b", &["a", "z"])).unwrap();
        registry.insert(record("d", &["b"])).unwrap();

        assert_eq!(registry.dependents_of("a"), vec!["c", "b"]);
        assert_eq!(registry.dependents_of("z"), vec!["b"]);
        assert!(registry.dependents_of("missing").is_empty());
    }

    #[test]
    fn test_merge_is_shallow() {
        let mut rec = record("a", &[]);
        rec.merge(data_from(json!({"a": 1, "nested": {"x": 1}})));
        let merged = rec.merge(data_from(json!({"b": 2, "nested": {"y": 2}}))).clone();

        assert_eq!(
            serde_json::Value::Object(merged),
            json!({"a": 1, "b": 2, "nested": {"y": 2}})
        );
    }

    #[test]
    fn test_initial_data_and_status() {
        let rec = WidgetRecord::new(
            "seeded",
            Arc::new(Plain {
                deps: vec!["x".into(), "y".into()],
                initial: Some(data_from(json!({"v": 0}))),
            }),
        );
        let status = rec.status();
        assert!(status.has_data);
        assert_eq!(status.dependency_count, 2);
        assert_eq!(status.subscriber_count, 0);
    }

    #[test]
    fn test_remove_drops_from_order() {
        let mut registry = WidgetRegistry::new();
        registry.insert(record("a", &[])).unwrap();
        registry.insert(record("b", &[])).unwrap();
        assert!(registry.remove("a").is_some());
        assert!(registry.remove("a").is_none());
        assert_eq!(registry.ids(), vec!["b"]);
    }
}
