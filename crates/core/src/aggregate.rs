//! Per-cycle aggregation of session metrics into points.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

use crate::media::RawSession;
use crate::point::Point;
use crate::session::SessionTracker;
use crate::stream::{extract, ExtractedStream};

/// Measurement for one point per playing session.
pub const NOW_PLAYING: &str = "now_playing";
/// Measurement for per-host and combined stream counts.
pub const ACTIVE_STREAMS: &str = "active_streams";
/// `host` tag value of the combined point.
pub const ALL_HOSTS: &str = "All";
/// Reported in `player_state` when the player gave no state.
pub const PLAYER_STATE_UNAVAILABLE: &str = "Unavailable";

/// Builds points for each polling cycle.
#[derive(Debug, Clone, Copy)]
pub struct MetricsAggregator {
    report_combined: bool,
}

impl MetricsAggregator {
    pub fn new(report_combined: bool) -> Self {
        Self { report_combined }
    }

    pub fn report_combined(&self) -> bool {
        self.report_combined
    }

    /// Starts a cycle against the given tracker.
    pub fn begin<'a>(&self, tracker: &'a mut SessionTracker) -> CycleAggregator<'a> {
        CycleAggregator {
            tracker,
            report_combined: self.report_combined,
            observed: HashSet::new(),
            owners: HashMap::new(),
            shared_keys: Vec::new(),
            combined_streams: 0,
        }
    }
}

/// Points and counters produced for one host.
#[derive(Debug, Clone)]
pub struct HostReport {
    pub host: String,
    /// `now_playing` points followed by the host's `active_streams` point.
    pub points: Vec<Point>,
    pub active_streams: usize,
    pub video_transcodes: u32,
    pub audio_transcodes: u32,
}

/// Result of closing a cycle.
#[derive(Debug, Clone)]
pub struct CycleSummary {
    /// Present only when combined reporting is enabled.
    pub combined: Option<Point>,
    pub active_streams: usize,
    pub ended_sessions: Vec<String>,
    pub tracked_sessions: usize,
    /// Keys reported by more than one host this cycle. These share one
    /// tracker entry, so their start time is whichever host saw them first.
    pub shared_keys: Vec<String>,
}

/// One cycle in progress.
///
/// Collects the union of session keys across hosts; [`finish`](Self::finish)
/// reconciles the tracker against it.
pub struct CycleAggregator<'a> {
    tracker: &'a mut SessionTracker,
    report_combined: bool,
    observed: HashSet<String>,
    /// First host to report each key this cycle.
    owners: HashMap<String, String>,
    shared_keys: Vec<String>,
    combined_streams: usize,
}

impl CycleAggregator<'_> {
    /// Observes a host's sessions and builds its points.
    pub fn record_host(&mut self, host: &str, sessions: &[RawSession], now: DateTime<Utc>) -> HostReport {
        let mut points = Vec::with_capacity(sessions.len() + 1);
        let mut video_transcodes = 0;
        let mut audio_transcodes = 0;

        for session in sessions {
            self.observed.insert(session.session_key.clone());
            let owner = self
                .owners
                .entry(session.session_key.clone())
                .or_insert_with(|| host.to_string());
            if owner.as_str() != host && !self.shared_keys.contains(&session.session_key) {
                self.shared_keys.push(session.session_key.clone());
            }
            let start_time = self.tracker.observe(&session.session_key, now);

            let extracted = extract(session);
            video_transcodes += extracted.video_transcodes;
            audio_transcodes += extracted.audio_transcodes;

            points.push(now_playing_point(host, session, &extracted, start_time, now));
        }

        points.push(
            Point::new(ACTIVE_STREAMS)
                .tag("host", host)
                .field("active_streams", sessions.len())
                .field("video_transcodes", video_transcodes)
                .field("audio_transcodes", audio_transcodes),
        );

        self.combined_streams += sessions.len();

        HostReport {
            host: host.to_string(),
            points,
            active_streams: sessions.len(),
            video_transcodes,
            audio_transcodes,
        }
    }

    /// Ends the cycle.
    ///
    /// Reconciliation always runs; only the combined point depends on
    /// configuration.
    pub fn finish(self) -> CycleSummary {
        let ended_sessions = self.tracker.reconcile(&self.observed);

        let combined = self.report_combined.then(|| {
            Point::new(ACTIVE_STREAMS)
                .tag("host", ALL_HOSTS)
                .field("active_streams", self.combined_streams)
        });

        CycleSummary {
            combined,
            active_streams: self.combined_streams,
            ended_sessions,
            tracked_sessions: self.tracker.len(),
            shared_keys: self.shared_keys,
        }
    }
}

/// Builds the `now_playing` point for one session.
pub fn now_playing_point(
    host: &str,
    session: &RawSession,
    extracted: &ExtractedStream,
    start_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Point {
    let player = &session.player;
    let duration = (now - start_time).num_milliseconds() as f64 / 1000.0;
    let state = player.state.map(|s| s.as_str()).unwrap_or("unknown");
    let player_state = player
        .state
        .map(|s| s.as_str())
        .unwrap_or(PLAYER_STATE_UNAVAILABLE);

    let point = Point::new(NOW_PLAYING)
        .tag("host", host)
        .tag("player_address", player.address.as_str())
        .tag("session_id", session.session_key.as_str())
        .field("player", player.title.as_str())
        .field("state", state)
        .field("user", session.username.as_str())
        .field("media_type", session.kind().label())
        .field("duration", duration)
        .field("start_time", start_time.timestamp_millis() as f64 / 1000.0)
        .field("platform", player.platform.as_str())
        .field("player_state", player_state);

    extracted.metrics.write_fields(point)
}
