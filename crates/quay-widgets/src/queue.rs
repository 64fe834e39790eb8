//! Deduplicated update queue.
//!
//! Pending ids form an insertion-ordered set. Two flags drive the flush
//! state machine: `scheduled` (a flush task is waiting to run) and
//! `updating` (a flush is draining a snapshot right now).

use serde::Serialize;
use std::collections::HashSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum QueueState {
    Idle,
    Scheduled,
    Flushing,
}

#[derive(Debug, Default)]
pub struct UpdateQueue {
    pending: Vec<String>,
    members: HashSet<String>,
    scheduled: bool,
    updating: bool,
}

impl UpdateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `id` unless it is already pending. Returns `true` if added.
    pub fn push(&mut self, id: &str) -> bool {
        if !self.members.insert(id.to_string()) {
            return false;
        }
        self.pending.push(id.to_string());
        true
    }

    pub fn remove(&mut self, id: &str) -> bool {
        if !self.members.remove(id) {
            return false;
        }
        self.pending.retain(|p| p != id);
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending(&self) -> Vec<String> {
        self.pending.clone()
    }

    pub fn is_updating(&self) -> bool {
        self.updating
    }

    /// Mark a flush as scheduled. Returns `true` when the caller has to
    /// actually schedule one (nothing was scheduled yet).
    pub fn request_flush(&mut self) -> bool {
        if self.scheduled {
            return false;
        }
        self.scheduled = true;
        true
    }

    /// The scheduled flush started running, or could not be scheduled.
    pub fn clear_scheduled(&mut self) {
        self.scheduled = false;
    }

    /// Take the pending snapshot and enter the flushing state. `None` if a
    /// flush is already running or nothing is pending.
    pub fn begin_flush(&mut self) -> Option<Vec<String>> {
        if self.updating || self.pending.is_empty() {
            return None;
        }
        self.updating = true;
        self.members.clear();
        Some(std::mem::take(&mut self.pending))
    }

    pub fn finish_flush(&mut self) {
        self.updating = false;
    }

    pub fn state(&self) -> QueueState {
        if self.updating {
            QueueState::Flushing
        } else if self.scheduled {
            QueueState::Scheduled
        } else {
            QueueState::Idle
        }
    }
}
