//! Playback session tracking across polling cycles.
//!
//! The media server only reports what is playing right now. The tracker
//! remembers when each session key was first seen so that elapsed playback
//! time can be reported, and forgets keys as soon as a cycle no longer
//! reports them. There is no grace period: one missed poll ends a session.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A session the tracker has seen at least once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedSession {
    pub session_key: String,
    /// Set on first observation, never updated.
    pub start_time: DateTime<Utc>,
}

impl TrackedSession {
    pub fn new(session_key: impl Into<String>, start_time: DateTime<Utc>) -> Self {
        Self {
            session_key: session_key.into(),
            start_time,
        }
    }

    /// Returns the time elapsed since the session was first seen.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        now - self.start_time
    }
}

/// Map of session key to first-seen time.
#[derive(Debug, Default)]
pub struct SessionTracker {
    sessions: HashMap<String, TrackedSession>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a sighting and returns the session's start time.
    ///
    /// New keys start at `now`; known keys keep their stored start time, so
    /// repeated calls within a cycle return the same value.
    pub fn observe(&mut self, session_key: &str, now: DateTime<Utc>) -> DateTime<Utc> {
        self.sessions
            .entry(session_key.to_string())
            .or_insert_with(|| TrackedSession::new(session_key, now))
            .start_time
    }

    /// Drops every tracked key not in `observed` and returns the dropped keys.
    pub fn reconcile(&mut self, observed: &HashSet<String>) -> Vec<String> {
        let ended: Vec<String> = self
            .sessions
            .keys()
            .filter(|key| !observed.contains(*key))
            .cloned()
            .collect();

        for key in &ended {
            self.sessions.remove(key);
        }

        ended
    }

    /// Elapsed time for a tracked key at `now`.
    pub fn elapsed(&self, session_key: &str, now: DateTime<Utc>) -> Option<Duration> {
        self.sessions.get(session_key).map(|s| s.elapsed(now))
    }

    pub fn start_time(&self, session_key: &str) -> Option<DateTime<Utc>> {
        self.sessions.get(session_key).map(|s| s.start_time)
    }

    pub fn contains(&self, session_key: &str) -> bool {
        self.sessions.contains_key(session_key)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Tracked keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.sessions.keys().cloned().collect();
        keys.sort();
        keys
    }
}
