//! Channel admission controller.
//!
//! Tracks the set of currently active viewing sessions against a fixed
//! capacity. The check-and-add in [`ChannelGuard::try_admit`] is a single
//! critical section under one lock, so two simultaneous admissions can never
//! both succeed when only one slot remains. Slots carry a last-seen timestamp
//! and are reclaimed by a periodic eviction task when a client disconnects
//! without releasing.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::playback::SessionStore;

/// Capacity-bounded registry of active session slots.
pub struct ChannelGuard {
    slots: Mutex<HashMap<String, DateTime<Utc>>>,
    capacity: usize,
    idle_timeout: ChronoDuration,
}

impl ChannelGuard {
    pub fn new(capacity: usize, idle_timeout: Duration) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            capacity,
            idle_timeout: ChronoDuration::from_std(idle_timeout)
                .unwrap_or_else(|_| ChronoDuration::seconds(600)),
        }
    }

    /// Admit a session, or refresh its slot if already active.
    ///
    /// Returns false only when the session holds no slot and all
    /// `capacity` slots are taken.
    pub fn try_admit(&self, session_id: &str) -> bool {
        let mut slots = self.slots.lock();

        if let Some(last_seen) = slots.get_mut(session_id) {
            *last_seen = Utc::now();
            return true;
        }

        if slots.len() >= self.capacity {
            debug!(session_id = %session_id, active = slots.len(), "Admission rejected at capacity");
            return false;
        }

        slots.insert(session_id.to_string(), Utc::now());
        info!(session_id = %session_id, active = slots.len(), "Session admitted");
        true
    }

    /// Free a session's slot. No-op when absent.
    pub fn release(&self, session_id: &str) {
        if self.slots.lock().remove(session_id).is_some() {
            info!(session_id = %session_id, "Session released");
        }
    }

    /// Refresh the last-seen timestamp of an active session.
    ///
    /// Returns false when the session holds no slot.
    pub fn touch(&self, session_id: &str) -> bool {
        match self.slots.lock().get_mut(session_id) {
            Some(last_seen) => {
                *last_seen = Utc::now();
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self, session_id: &str) -> bool {
        self.slots.lock().contains_key(session_id)
    }

    pub fn active_count(&self) -> usize {
        self.slots.lock().len()
    }

    /// Remove sessions idle longer than the timeout, returning their ids.
    pub fn evict_idle(&self) -> Vec<String> {
        let now = Utc::now();
        let mut evicted = Vec::new();

        self.slots.lock().retain(|session_id, last_seen| {
            let idle = now - *last_seen;
            if idle > self.idle_timeout {
                info!(
                    session_id = %session_id,
                    idle_secs = idle.num_seconds(),
                    "Evicting idle session"
                );
                evicted.push(session_id.clone());
                false
            } else {
                true
            }
        });

        evicted
    }
}

/// Start a background task that reclaims idle slots and drops the evicted
/// sessions' playlists.
pub fn spawn_eviction_task(
    guard: Arc<ChannelGuard>,
    playlists: Arc<SessionStore>,
    interval_secs: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            for session_id in guard.evict_idle() {
                playlists.remove(&session_id);
            }
        }
    })
}
