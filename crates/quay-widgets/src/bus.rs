//! Event bus: named one-to-many notification channel.
//!
//! Listeners for one name run in attachment order. A failing listener (error
//! or panic) is logged and skipped; the rest still receive the event.

use crate::error::WidgetError;
use crate::event::Event;
use log::{debug, error};
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Callback attached to the bus for one event name.
pub type EventHandler = Arc<dyn Fn(&Event) -> Result<(), WidgetError> + Send + Sync>;

/// Wrap a closure as an [`EventHandler`].
pub fn handler<F>(f: F) -> EventHandler
where
    F: Fn(&Event) -> Result<(), WidgetError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Identifies one attachment, used to detach it later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Clone)]
struct Listener {
    id: ListenerId,
    /// Widget the listener was attached for, if any.
    owner: Option<String>,
    handler: EventHandler,
}

#[derive(Default)]
pub struct EventBus {
    listeners: Mutex<HashMap<String, Vec<Listener>>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<String, Vec<Listener>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attach a listener that belongs to no widget.
    pub fn add_listener(&self, name: &str, handler: EventHandler) -> ListenerId {
        self.attach(name, handler, None)
    }

    /// Attach a listener. Attaching the same handler twice under the same
    /// name for the same owner returns the existing id instead of adding a
    /// second delivery. Different owners always get their own attachment.
    pub(crate) fn attach(&self, name: &str, handler: EventHandler, owner: Option<&str>) -> ListenerId {
        let mut table = self.table();
        let entries = table.entry(name.to_string()).or_default();

        let existing = entries
            .iter()
            .find(|l| Arc::ptr_eq(&l.handler, &handler) && l.owner.as_deref() == owner);
        if let Some(existing) = existing {
            debug!("Listener for {} already attached, reusing {:?}", name, existing.id);
            return existing.id;
        }

        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        entries.push(Listener {
            id,
            owner: owner.map(str::to_string),
            handler,
        });
        id
    }

    /// Detach a listener. Returns `false` if it was not attached.
    pub fn remove_listener(&self, name: &str, id: ListenerId) -> bool {
        let mut table = self.table();
        let Some(entries) = table.get_mut(name) else {
            return false;
        };

        let before = entries.len();
        entries.retain(|l| l.id != id);
        let removed = entries.len() != before;

        if entries.is_empty() {
            table.remove(name);
        }
        removed
    }

    /// Number of listeners currently attached for `name`.
    pub fn listener_count(&self, name: &str) -> usize {
        self.table().get(name).map_or(0, Vec::len)
    }

    /// Total listeners attached on behalf of `owner`, across all names.
    pub fn owned_count(&self, owner: &str) -> usize {
        self.table()
            .values()
            .flatten()
            .filter(|l| l.owner.as_deref() == Some(owner))
            .count()
    }

    /// Deliver `event` to every listener attached for its name.
    ///
    /// The listener list is snapshotted first so handlers may attach, detach
    /// or emit while being called.
    pub fn emit(&self, event: &Event) {
        let snapshot: Vec<Listener> = match self.table().get(&event.name) {
            Some(entries) => entries.clone(),
            None => return,
        };

        for listener in snapshot {
            let outcome = catch_unwind(AssertUnwindSafe(|| (listener.handler)(event)))
                .unwrap_or_else(|payload| Err(WidgetError::from_panic(payload)));

            if let Err(e) = outcome {
                let owner = listener.owner.as_deref().unwrap_or("<external>");
                error!(
                    "Error in widget {} event handler for {}: {}",
                    owner, event.name, e
                );
            }
        }
    }
}
