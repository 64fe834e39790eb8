//! The widget contract.
//!
//! A widget renders itself from a data payload, lists the bus events it wants
//! and names the widgets it should refresh after. Every part is optional.

use crate::bus::EventHandler;
use crate::error::WidgetError;
use crate::event::WidgetData;
use futures_util::future::BoxFuture;

/// Future returned by [`Widget::update`].
pub type UpdateFuture<'a> = BoxFuture<'a, Result<(), WidgetError>>;

pub trait Widget: Send + Sync {
    /// Widget ids this widget is refreshed after. Read once at registration.
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Bus handlers to attach at registration, keyed by event name.
    fn event_handlers(&self) -> Vec<(String, EventHandler)> {
        Vec::new()
    }

    /// Payload stored before the first data update.
    fn initial_data(&self) -> Option<WidgetData> {
        None
    }

    /// Re-render from the stored payload. `None` means the widget has no
    /// update step and the queue skips it.
    fn update(&self, data: Option<WidgetData>) -> Option<UpdateFuture<'_>> {
        let _ = data;
        None
    }
}
