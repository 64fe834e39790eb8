//! Event bus between background services and the widget manager.
//!
//! Design principles:
//! - Broadcast channel (tokio) - every subscriber receives every event
//! - Single polling timer drains the channel into the widget manager
//! - Batch processing (drain all events per tick)
//!
//! The dashboard defines its event type in `panels::dashboard::events`.

/// Broadcast channel capacity.
/// Lagging receivers skip old events (only the latest ship state matters).
pub const CHANNEL_CAPACITY: usize = 64;

/// How often the main loop drains the channel.
pub const EVENT_POLL_INTERVAL_MS: u64 = 50;
