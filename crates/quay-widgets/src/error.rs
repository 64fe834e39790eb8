//! Error types for quay-widgets

use std::time::Duration;

/// Widget coordination errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum WidgetError {
    #[error("Widget {0} is already registered")]
    AlreadyRegistered(String),

    #[error("Widget {0} is not registered")]
    NotRegistered(String),

    #[error("Widget id must not be empty")]
    EmptyId,

    #[error("Update failed: {0}")]
    Update(String),

    #[error("Update timed out after {0:?}")]
    Timeout(Duration),

    #[error("Handler failed: {0}")]
    Handler(String),

    #[error("Panicked: {0}")]
    Panic(String),

    #[error("Widget manager has been dropped")]
    ManagerGone,
}

impl WidgetError {
    /// Build an update error from anything printable.
    pub fn update(msg: impl Into<String>) -> Self {
        WidgetError::Update(msg.into())
    }

    /// Build a handler error from anything printable.
    pub fn handler(msg: impl Into<String>) -> Self {
        WidgetError::Handler(msg.into())
    }

    /// Extract a readable message from a caught panic payload.
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let msg = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        WidgetError::Panic(msg)
    }
}
