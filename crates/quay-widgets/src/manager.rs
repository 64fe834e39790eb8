//! Widget manager: owns the bus, the registry and the update queue.
//!
//! Data flow for `update_widget_data(id, data)`:
//! - merge `data` into the record and queue `id`
//! - emit `widget:dataUpdate`
//! - queue every widget that declared `id` as a dependency (one level only)
//!   and emit `widget:dependencyUpdate` for each
//! - a flush task drains the queue on the next tick, one widget at a time
//!
//! Nothing here fails loudly. Rejected calls return `false` and log a
//! warning; handler and update failures become logs and `widget:error`.

use crate::bus::{EventBus, EventHandler, ListenerId};
use crate::config::ManagerConfig;
use crate::error::WidgetError;
use crate::event::{Event, EventDetail, WidgetData};
use crate::queue::{QueueState, UpdateQueue};
use crate::registry::{WidgetRecord, WidgetRegistry, WidgetStatus};
use crate::widget::Widget;
use futures_util::FutureExt;
use log::{debug, error, info, warn};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Options for [`WidgetManager::update_widget_data`].
#[derive(Clone, Copy, Debug)]
pub struct UpdateOptions {
    /// Queue and notify dependents of the updated widget.
    pub propagate: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self { propagate: true }
    }
}

impl UpdateOptions {
    pub fn local() -> Self {
        Self { propagate: false }
    }
}

/// Everything the manager knows, for debugging output.
#[derive(Clone, Debug, Serialize)]
pub struct DebugSnapshot {
    pub registered: Vec<String>,
    pub data: BTreeMap<String, WidgetData>,
    pub queue: Vec<String>,
    pub queue_state: QueueState,
    pub statuses: BTreeMap<String, WidgetStatus>,
}

struct State {
    registry: WidgetRegistry,
    queue: UpdateQueue,
}

struct Inner {
    config: ManagerConfig,
    bus: EventBus,
    state: Mutex<State>,
    queue_state: watch::Sender<QueueState>,
}

/// Shared coordination point for all widgets. Cloning is cheap and every
/// clone drives the same registry.
#[derive(Clone)]
pub struct WidgetManager {
    inner: Arc<Inner>,
}

impl Default for WidgetManager {
    fn default() -> Self {
        Self::new(ManagerConfig::default())
    }
}

impl WidgetManager {
    pub fn new(config: ManagerConfig) -> Self {
        let (queue_state, _) = watch::channel(QueueState::Idle);
        info!("Widget manager initialized");
        Self {
            inner: Arc::new(Inner {
                config,
                bus: EventBus::new(),
                state: Mutex::new(State {
                    registry: WidgetRegistry::new(),
                    queue: UpdateQueue::new(),
                }),
                queue_state,
            }),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.inner.config
    }

    /// Weak handle for widgets to call back into the manager without
    /// keeping it alive.
    pub fn handle(&self) -> ManagerHandle {
        ManagerHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish the queue state. Called with the state lock held so
    /// observers never see states out of order.
    fn publish(&self, state: &State) {
        self.inner.queue_state.send_replace(state.queue.state());
    }

    // ---- registration ----

    /// Register `widget` under `id`. Returns `false` if the id is empty or
    /// already taken; the existing record is left untouched.
    pub fn register_widget(&self, id: &str, widget: Arc<dyn Widget>) -> bool {
        match self.try_register(id, widget) {
            Ok(()) => {
                info!("Widget {} registered successfully", id);
                true
            }
            Err(e) => {
                warn!("Cannot register widget: {}", e);
                false
            }
        }
    }

    fn try_register(&self, id: &str, widget: Arc<dyn Widget>) -> Result<(), WidgetError> {
        // Widget code runs outside the state lock.
        let handlers = widget.event_handlers();
        let mut record = WidgetRecord::new(id, widget);

        let mut state = self.state();
        if id.is_empty() {
            return Err(WidgetError::EmptyId);
        }
        if state.registry.contains(id) {
            return Err(WidgetError::AlreadyRegistered(id.to_string()));
        }

        for (name, handler) in handlers {
            let listener = self.inner.bus.attach(&name, handler, Some(id));
            record.listeners.push((name, listener));
        }

        state.registry.insert(record)
    }

    /// Remove a widget, its bus listeners and any pending update.
    pub fn unregister_widget(&self, id: &str) -> bool {
        let removed = {
            let mut state = self.state();
            let removed = state.registry.remove(id);
            if removed.is_some() {
                state.queue.remove(id);
                for other in state.registry.records_mut() {
                    other.subscribers.remove(id);
                }
                self.publish(&state);
            }
            removed
        };
        let Some(record) = removed else {
            warn!("Widget {} is not registered", id);
            return false;
        };

        for (name, listener) in &record.listeners {
            self.inner.bus.remove_listener(name, *listener);
        }

        info!("Widget {} unregistered successfully", id);
        true
    }

    // ---- events ----

    /// Fire a widget-defined event on the shared bus.
    pub fn emit(&self, name: &str, data: WidgetData) {
        let event = Event::custom(name, data, &self.inner.config.default_source);
        debug!("Event {} emitted from {}", event.name, event.source);
        self.inner.bus.emit(&event);
    }

    fn emit_builtin(&self, detail: EventDetail, source: &str) {
        let event = Event::builtin(detail, source);
        debug!("Event {} emitted from {}", event.name, event.source);
        self.inner.bus.emit(&event);
    }

    /// Attach a listener that is not owned by any widget.
    pub fn add_listener(&self, name: &str, handler: EventHandler) -> ListenerId {
        self.inner.bus.add_listener(name, handler)
    }

    pub fn remove_listener(&self, name: &str, id: ListenerId) -> bool {
        self.inner.bus.remove_listener(name, id)
    }

    pub fn listener_count(&self, name: &str) -> usize {
        self.inner.bus.listener_count(name)
    }

    // ---- data ----

    /// Merge `data` into the widget's payload, queue it and cascade to its
    /// direct dependents unless `options.propagate` is off.
    pub fn update_widget_data(&self, id: &str, data: WidgetData, options: UpdateOptions) -> bool {
        let merged = self
            .state()
            .registry
            .get_mut(id)
            .map(|record| record.merge(data.clone()).clone());
        let Some(merged) = merged else {
            warn!("Cannot update data: Widget {} not found", id);
            return false;
        };

        self.queue_update(id);

        self.emit_builtin(
            EventDetail::DataUpdate {
                widget_id: id.to_string(),
                data: merged,
                propagate: options.propagate,
            },
            id,
        );

        if options.propagate {
            self.update_dependent_widgets(id, &data);
        }

        debug!("Data updated for widget {}: {} keys", id, data.len());
        true
    }

    fn update_dependent_widgets(&self, source_id: &str, data: &WidgetData) {
        let dependents = self.state().registry.dependents_of(source_id);

        for dependent in dependents {
            self.queue_update(&dependent);
            self.emit_builtin(
                EventDetail::DependencyUpdate {
                    widget_id: dependent,
                    source_widget_id: source_id.to_string(),
                    data: data.clone(),
                },
                &self.inner.config.default_source,
            );
        }
    }

    /// Notify every widget and queue all of them for update.
    pub fn broadcast(&self, data: Value) {
        self.emit_builtin(
            EventDetail::Broadcast { data },
            &self.inner.config.default_source,
        );

        let ids = self.state().registry.ids();
        for id in ids {
            self.queue_update(&id);
        }
    }

    // ---- subscriptions ----

    /// Record that `subscriber_id` follows `target_id`. Bookkeeping only:
    /// updates still travel along declared dependencies.
    pub fn subscribe(&self, subscriber_id: &str, target_id: &str) -> bool {
        self.edit_subscribers(subscriber_id, target_id, true)
    }

    pub fn unsubscribe(&self, subscriber_id: &str, target_id: &str) -> bool {
        self.edit_subscribers(subscriber_id, target_id, false)
    }

    fn edit_subscribers(&self, subscriber_id: &str, target_id: &str, add: bool) -> bool {
        let outcome = {
            let mut state = self.state();
            if !state.registry.contains(subscriber_id) {
                Err(WidgetError::NotRegistered(subscriber_id.to_string()))
            } else if let Some(target) = state.registry.get_mut(target_id) {
                if add {
                    target.subscribers.insert(subscriber_id.to_string());
                } else {
                    target.subscribers.remove(subscriber_id);
                }
                Ok(())
            } else {
                Err(WidgetError::NotRegistered(target_id.to_string()))
            }
        };

        match outcome {
            Ok(()) if add => debug!("Widget {} subscribed to {}", subscriber_id, target_id),
            Ok(()) => debug!("Widget {} unsubscribed from {}", subscriber_id, target_id),
            Err(e) => {
                warn!("Cannot change subscription: {}", e);
                return false;
            }
        }
        true
    }

    // ---- introspection ----

    pub fn get_widget_data(&self, id: &str) -> Option<WidgetData> {
        self.state().registry.get(id).and_then(|r| r.data.clone())
    }

    pub fn get_all_widget_data(&self) -> BTreeMap<String, WidgetData> {
        self.state().registry.all_data()
    }

    pub fn get_widget_status(&self, id: &str) -> Option<WidgetStatus> {
        self.state().registry.get(id).map(WidgetRecord::status)
    }

    pub fn get_all_widget_statuses(&self) -> BTreeMap<String, WidgetStatus> {
        self.state().registry.statuses()
    }

    pub fn registered_widgets(&self) -> Vec<String> {
        self.state().registry.ids()
    }

    pub fn pending_updates(&self) -> Vec<String> {
        self.state().queue.pending()
    }

    pub fn queue_state(&self) -> QueueState {
        *self.inner.queue_state.borrow()
    }

    pub fn debug_snapshot(&self) -> DebugSnapshot {
        let state = self.state();
        DebugSnapshot {
            registered: state.registry.ids(),
            data: state.registry.all_data(),
            queue: state.queue.pending(),
            queue_state: state.queue.state(),
            statuses: state.registry.statuses(),
        }
    }

    pub fn log_debug_info(&self) {
        match serde_json::to_string_pretty(&self.debug_snapshot()) {
            Ok(json) => info!("Widget manager debug info:\n{}", json),
            Err(e) => warn!("Failed to serialize debug info: {}", e),
        }
    }

    // ---- update queue ----

    /// Queue `id` for update and make sure a flush is scheduled.
    pub fn queue_update(&self, id: &str) {
        let schedule = {
            let mut state = self.state();
            state.queue.push(id);
            let schedule = state.queue.request_flush();
            self.publish(&state);
            schedule
        };

        if schedule {
            self.schedule_flush();
        }
    }

    fn schedule_flush(&self) {
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let manager = self.clone();
                runtime.spawn(async move {
                    manager.flush(true).await;
                });
            }
            Err(_) => {
                let mut state = self.state();
                state.queue.clear_scheduled();
                self.publish(&state);
                drop(state);
                warn!("No async runtime, updates stay queued until a manual flush");
            }
        }
    }

    /// Drain the queue now. A no-op while another flush is running; ids
    /// queued meanwhile wait for the next flush.
    pub async fn process_update_queue(&self) {
        self.flush(false).await;
    }

    async fn flush(&self, scheduled: bool) {
        let snapshot = {
            let mut state = self.state();
            if scheduled {
                state.queue.clear_scheduled();
            }
            let snapshot = state.queue.begin_flush();
            self.publish(&state);
            snapshot
        };
        let Some(ids) = snapshot else {
            return;
        };

        let mut guard = FlushGuard {
            manager: self,
            completed: false,
        };
        debug!("Flushing {} widget updates", ids.len());
        for id in &ids {
            self.update_widget(id).await;
        }
        guard.completed = true;
    }

    /// Leave the flushing state and schedule a follow-up flush for ids
    /// queued meanwhile.
    fn end_flush(&self) {
        let reschedule = {
            let mut state = self.state();
            state.queue.finish_flush();
            let reschedule = !state.queue.is_empty() && state.queue.request_flush();
            self.publish(&state);
            reschedule
        };

        if reschedule {
            self.schedule_flush();
        }
    }

    async fn update_widget(&self, id: &str) {
        let target = {
            let state = self.state();
            state
                .registry
                .get(id)
                .map(|r| (Arc::clone(&r.instance), r.data.clone()))
        };
        let Some((instance, data)) = target else {
            return;
        };

        let future = match std::panic::catch_unwind(AssertUnwindSafe(|| instance.update(data))) {
            Ok(Some(future)) => future,
            Ok(None) => return,
            Err(payload) => {
                self.report_update_error(id, WidgetError::from_panic(payload));
                return;
            }
        };

        let guarded = AssertUnwindSafe(future).catch_unwind();
        let limit = match self.inner.config.update_timeout() {
            Some(limit) if tokio::runtime::Handle::try_current().is_err() => {
                warn!("No async runtime, updating widget {} without a {:?} timeout", id, limit);
                None
            }
            limit => limit,
        };
        let outcome = match limit {
            Some(limit) => match tokio::time::timeout(limit, guarded).await {
                Ok(caught) => caught.unwrap_or_else(|p| Err(WidgetError::from_panic(p))),
                Err(_) => Err(WidgetError::Timeout(limit)),
            },
            None => guarded
                .await
                .unwrap_or_else(|p| Err(WidgetError::from_panic(p))),
        };

        match outcome {
            Ok(()) => self.emit_builtin(
                EventDetail::Updated {
                    widget_id: id.to_string(),
                },
                &self.inner.config.default_source,
            ),
            Err(e) => self.report_update_error(id, e),
        }
    }

    fn report_update_error(&self, id: &str, e: WidgetError) {
        error!("Error updating widget {}: {}", id, e);
        self.emit_builtin(
            EventDetail::Error {
                widget_id: id.to_string(),
                error: e.to_string(),
            },
            &self.inner.config.default_source,
        );
    }

    /// Resolve once the queue is idle: nothing scheduled, nothing flushing.
    pub async fn wait_idle(&self) {
        let mut rx = self.inner.queue_state.subscribe();
        let _ = rx.wait_for(|s| *s == QueueState::Idle).await;
    }

    // ---- periodic sync ----

    pub fn emit_periodic_sync(&self) {
        let active_widgets = self.registered_widgets();
        self.emit_builtin(
            EventDetail::PeriodicSync { active_widgets },
            &self.inner.config.default_source,
        );
    }

    /// Emit `widget:periodicSync` every `interval`. The task ends once the
    /// manager is dropped.
    pub fn spawn_periodic_sync(&self, interval: Duration) -> JoinHandle<()> {
        let handle = self.handle();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(manager) = handle.upgrade() else {
                    debug!("Widget manager dropped, stopping periodic sync");
                    break;
                };
                manager.emit_periodic_sync();
            }
        })
    }
}

/// Ends a flush on every exit path. A flush future dropped mid-way (or
/// unwinding) still returns the queue to idle; its unfinished ids are dropped.
struct FlushGuard<'a> {
    manager: &'a WidgetManager,
    completed: bool,
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            warn!("Widget update flush cancelled before it finished");
        }
        self.manager.end_flush();
    }
}

/// Weak reference to a [`WidgetManager`], injected into widgets.
#[derive(Clone)]
pub struct ManagerHandle {
    inner: Weak<Inner>,
}

impl ManagerHandle {
    /// A handle that never reaches a manager.
    pub fn detached() -> Self {
        Self { inner: Weak::new() }
    }

    pub fn upgrade(&self) -> Option<WidgetManager> {
        self.inner.upgrade().map(|inner| WidgetManager { inner })
    }

    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    pub fn queue_update(&self, id: &str) -> bool {
        self.with(|m| m.queue_update(id))
    }

    pub fn emit(&self, name: &str, data: WidgetData) -> bool {
        self.with(|m| m.emit(name, data))
    }

    pub fn update_widget_data(&self, id: &str, data: WidgetData, options: UpdateOptions) -> bool {
        self.upgrade()
            .is_some_and(|m| m.update_widget_data(id, data, options))
    }

    pub fn broadcast(&self, data: Value) -> bool {
        self.with(|m| m.broadcast(data))
    }

    fn with(&self, f: impl FnOnce(&WidgetManager)) -> bool {
        match self.upgrade() {
            Some(manager) => {
                f(&manager);
                true
            }
            None => {
                debug!("{}", WidgetError::ManagerGone);
                false
            }
        }
    }
}
