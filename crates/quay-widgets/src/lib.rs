//! quay-widgets - In-process widget coordination
//!
//! Features:
//! - Named event bus with per-listener failure isolation
//! - Widget registry with declared dependencies
//! - One-level dependency cascade on data updates
//! - Deduplicated update queue, flushed sequentially on the next tick
//! - Per-widget update timeout

pub mod bus;
pub mod config;
pub mod error;
pub mod event;
pub mod manager;
pub mod queue;
pub mod registry;
pub mod widget;

pub use bus::{EventBus, EventHandler, ListenerId, handler};
pub use config::ManagerConfig;
pub use error::WidgetError;
pub use event::{Event, EventDetail, WidgetData, data_from};
pub use manager::{DebugSnapshot, ManagerHandle, UpdateOptions, WidgetManager};
pub use queue::{QueueState, UpdateQueue};
pub use registry::{WidgetRecord, WidgetRegistry, WidgetStatus};
pub use widget::{UpdateFuture, Widget};
