//! Dashboard event definitions and broadcast event bus.
//!
//! Services send here; the main loop drains the channel and hands each event
//! to the dashboard.

use crate::event_bus::CHANNEL_CAPACITY;
use crate::services::ship_data::ShipSnapshot;
use std::sync::OnceLock;
use tokio::sync::broadcast::{self, Receiver, Sender};

/// Events from background services.
#[derive(Clone, Debug)]
pub enum DashboardEvent {
    ShipData(Box<ShipSnapshot>), // Boxed to keep enum size small
}

static DASHBOARD_SENDER: OnceLock<Sender<DashboardEvent>> = OnceLock::new();

fn get_sender() -> &'static Sender<DashboardEvent> {
    DASHBOARD_SENDER.get_or_init(|| {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        tx
    })
}

/// Send an event to the dashboard. Non-blocking.
/// If no receivers, the event is dropped (expected during startup).
#[inline]
pub fn send(event: DashboardEvent) {
    let _ = get_sender().send(event);
}

#[inline]
pub fn send_ship_data(data: ShipSnapshot) {
    send(DashboardEvent::ShipData(Box::new(data)));
}

/// Subscribe to the event bus.
pub fn subscribe() -> Receiver<DashboardEvent> {
    get_sender().subscribe()
}

/// Drain all pending events, keeping only the latest. Every event carries
/// the full ship state, so older ones are superseded.
/// Handles RecvError::Lagged by continuing to drain.
pub fn drain_latest(rx: &mut Receiver<DashboardEvent>) -> Option<DashboardEvent> {
    let mut latest = None;

    loop {
        match rx.try_recv() {
            Ok(event) => latest = Some(event),
            Err(broadcast::error::TryRecvError::Empty) => break,
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(broadcast::error::TryRecvError::Closed) => break,
        }
    }

    latest
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ship(discharged: u32) -> DashboardEvent {
        let mut snapshot = ShipSnapshot::new("MV Drain", 100, 10, Utc::now());
        snapshot.discharged = discharged;
        DashboardEvent::ShipData(Box::new(snapshot))
    }

    #[test]
    fn test_drain_keeps_latest_snapshot() {
        let (tx, mut rx) = broadcast::channel(CHANNEL_CAPACITY);
        tx.send(ship(1)).unwrap();
        tx.send(ship(2)).unwrap();
        tx.send(ship(3)).unwrap();

        let Some(DashboardEvent::ShipData(snapshot)) = drain_latest(&mut rx) else {
            panic!("expected a ship snapshot");
        };
        assert_eq!(snapshot.discharged, 3);
        assert!(drain_latest(&mut rx).is_none());
    }

    #[test]
    fn test_global_channel_delivers_to_subscribers() {
        let mut rx = subscribe();
        send_ship_data(ShipSnapshot::new("MV Global", 10, 1, Utc::now()));

        let drained = drain_latest(&mut rx);
        assert!(matches!(drained, Some(DashboardEvent::ShipData(s)) if s.vessel == "MV Global"));
    }

    #[test]
    fn test_drain_survives_lag() {
        let (tx, mut rx) = broadcast::channel(2);
        for n in 0..5 {
            tx.send(ship(n)).unwrap();
        }

        let Some(DashboardEvent::ShipData(snapshot)) = drain_latest(&mut rx) else {
            panic!("expected a ship snapshot");
        };
        assert_eq!(snapshot.discharged, 4);
    }
}
