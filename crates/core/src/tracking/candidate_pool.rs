//! Bounded pool of not-yet-confirmed identities pending embedding
//! extraction.
//!
//! The pool caps how many unknown faces are forwarded to the embedding
//! model per window: one burst of up to `capacity` tracks, then nothing
//! until the whole pool is flushed. Flushing is a whole-pool reset on a
//! sliding window, not a per-entry TTL.

use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct CandidatePool {
    members: Vec<u64>,
    capacity: usize,
    window: Duration,
    window_start: Option<Instant>,
}

impl CandidatePool {
    pub fn new(capacity: usize, window: Duration) -> Self {
        Self {
            members: Vec::with_capacity(capacity),
            capacity,
            window,
            window_start: None,
        }
    }

    /// Advances the flush window. The first call only records the window
    /// start; a later call that crosses the window boundary clears the
    /// pool and restarts the window. Returns `true` when a flush
    /// happened.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.window_start {
            None => {
                self.window_start = Some(now);
                false
            }
            Some(start) if now.duration_since(start) >= self.window => {
                self.members.clear();
                self.window_start = Some(now);
                true
            }
            Some(_) => false,
        }
    }

    pub fn contains(&self, track_id: u64) -> bool {
        self.members.contains(&track_id)
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Admits a track. Returns `false` when it is already a member or
    /// the pool is at capacity.
    pub fn insert(&mut self, track_id: u64) -> bool {
        if self.contains(track_id) || self.is_full() {
            return false;
        }
        self.members.push(track_id);
        true
    }

    /// Drops a track that graduated to a confirmed identity.
    pub fn remove(&mut self, track_id: u64) -> bool {
        match self.members.iter().position(|&id| id == track_id) {
            Some(pos) => {
                self.members.remove(pos);
                true
            }
            None => false,
        }
    }
}
