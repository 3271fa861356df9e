//! Per-session playback state.
//!
//! Each session owns an ordered playlist (a random permutation of all known
//! collections) and a cursor. Sessions are keyed in a [`DashMap`]; every
//! operation mutates through the map's exclusive per-key guard, so rapid
//! overlapping requests from one client (double-click skip) are serialized
//! and each sees a distinct, monotonically advancing cursor. No await points
//! occur while a guard is held.

use dashmap::DashMap;
use rand::seq::SliceRandom;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::library::{Catalog, MANIFEST_NAME};

/// Everything a caller needs to build a playable reference.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlaylistView {
    pub collection_id: String,
    pub title: String,
    pub duration_secs: f64,
    pub manifest_url: String,
}

struct PlaylistState {
    /// Permutation of the catalog ids known at initialization time.
    order: Vec<String>,
    /// Invariant: `cursor < order.len()` whenever `order` is non-empty.
    cursor: usize,
}

/// Session-keyed playlist store.
pub struct SessionStore {
    sessions: DashMap<String, PlaylistState>,
    catalog: Arc<Catalog>,
}

impl SessionStore {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            sessions: DashMap::new(),
            catalog,
        }
    }

    fn fresh_state(&self) -> PlaylistState {
        let mut order = self.catalog.ids();
        order.shuffle(&mut rand::thread_rng());
        PlaylistState { order, cursor: 0 }
    }

    fn view_at(&self, state: &PlaylistState) -> PlaylistView {
        let id = &state.order[state.cursor];
        // Ids always originate from the catalog, but fall back to bare
        // defaults rather than panic if an entry has gone missing.
        let (title, duration_secs) = match self.catalog.get(id) {
            Some(info) => (info.title, info.duration_secs),
            None => (id.clone(), 0.0),
        };
        PlaylistView {
            collection_id: id.clone(),
            title,
            duration_secs,
            manifest_url: format!("/hls/{}/{}", id, MANIFEST_NAME),
        }
    }

    /// Run `op` against the session's playlist, lazily creating it.
    ///
    /// Returns `None` only while the catalog is empty (nothing to play).
    fn with_state<F>(&self, session_id: &str, op: F) -> Option<PlaylistView>
    where
        F: FnOnce(&mut PlaylistState),
    {
        if self.catalog.is_empty() {
            return None;
        }

        let mut entry = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| self.fresh_state());
        op(&mut entry);
        Some(self.view_at(&entry))
    }

    /// Collection at the current cursor, initializing the playlist if needed.
    pub fn current(&self, session_id: &str) -> Option<PlaylistView> {
        self.with_state(session_id, |_| {})
    }

    /// Move the cursor one step forward, wrapping at the end.
    ///
    /// The playlist is cyclic and never exhausted.
    pub fn advance(&self, session_id: &str) -> Option<PlaylistView> {
        self.with_state(session_id, |state| {
            if !state.order.is_empty() {
                state.cursor = (state.cursor + 1) % state.order.len();
            }
        })
    }

    /// Set the cursor to the named collection.
    ///
    /// An id absent from the playlist is a silent no-op: the unchanged
    /// current collection is returned instead of an error.
    pub fn jump(&self, session_id: &str, collection_id: &str) -> Option<PlaylistView> {
        self.with_state(session_id, |state| {
            match state.order.iter().position(|id| id == collection_id) {
                Some(index) => state.cursor = index,
                None => {
                    debug!(
                        session_id = %session_id,
                        collection = %collection_id,
                        "Jump target not in playlist, keeping position"
                    );
                }
            }
        })
    }

    /// Replace the playlist with a fresh permutation, cursor reset to 0.
    ///
    /// Sequence and cursor are swapped as one unit under the exclusive entry
    /// guard, so no reader can observe a stale cursor against the new order.
    pub fn reshuffle(&self, session_id: &str) -> Option<PlaylistView> {
        if self.catalog.is_empty() {
            return None;
        }

        let mut entry = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| self.fresh_state());
        *entry = self.fresh_state();
        Some(self.view_at(&entry))
    }

    /// Drop a session's playlist (release or idle eviction).
    pub fn remove(&self, session_id: &str) {
        self.sessions.remove(session_id);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
