//! Polling loop.
//!
//! One cycle fetches every server's sessions concurrently, then processes the
//! results in configuration order against the single session tracker. The
//! tracker is reconciled exactly once per cycle, after every host has been
//! observed. Library and recently-added reports run on their own interval.

use chrono::Utc;
use collector_core::{
    CycleSummary, LibraryInventoryReporter, LibraryReport, MediaServer, MetricsAggregator,
    PointSink, RawSession, Result, SessionTracker, NOW_PLAYING,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use telemetry::{health, metrics};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::PollConfig;
use crate::writer::SinkWriter;

/// Outcome of one polling cycle.
#[derive(Debug)]
pub struct CycleReport {
    pub summary: CycleSummary,
    /// Hosts whose session fetch failed this cycle.
    pub failed_hosts: Vec<String>,
    /// Whether library and recently-added points were reported.
    pub library_reported: bool,
}

/// Drives polling cycles over a fixed set of servers.
pub struct PollLoop {
    config: PollConfig,
    servers: Vec<Arc<dyn MediaServer>>,
    writer: SinkWriter,
    tracker: SessionTracker,
    aggregator: MetricsAggregator,
    last_library_run: Option<Instant>,
}

impl PollLoop {
    pub fn new(
        config: PollConfig,
        servers: Vec<Arc<dyn MediaServer>>,
        sink: Arc<dyn PointSink>,
    ) -> Self {
        let aggregator = MetricsAggregator::new(config.report_combined);
        Self {
            config,
            servers,
            writer: SinkWriter::new(sink),
            tracker: SessionTracker::new(),
            aggregator,
            last_library_run: None,
        }
    }

    pub fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Runs cycles until `shutdown` resolves, or a single cycle in
    /// single-run mode. Shutdown is only observed between cycles.
    pub async fn run<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        if self.config.single_run {
            info!("Single run mode, running one cycle");
            self.run_once().await;
            return;
        }

        info!(
            servers = self.servers.len(),
            delay_secs = self.config.delay_secs,
            library_interval_secs = self.config.library_interval_secs,
            "Starting poll loop"
        );

        tokio::pin!(shutdown);

        loop {
            self.run_cycle().await;

            tokio::select! {
                _ = tokio::time::sleep(self.config.delay()) => {}
                _ = &mut shutdown => {
                    info!("Poll loop stopping");
                    break;
                }
            }
        }
    }

    /// Runs exactly one cycle, including the library report.
    pub async fn run_once(&mut self) -> CycleReport {
        self.last_library_run = None;
        self.run_cycle().await
    }

    /// Runs one cycle.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let start = Instant::now();

        let library_reported = self.library_due();
        if library_reported {
            self.report_library().await;
            self.last_library_run = Some(Instant::now());
        }

        let tracked_before = self.tracker.len();
        let (summary, failed_hosts) = self.report_active_streams().await;

        let started = (summary.tracked_sessions + summary.ended_sessions.len())
            .saturating_sub(tracked_before);
        let m = metrics();
        m.sessions_started.inc_by(started as u64);
        m.sessions_ended.inc_by(summary.ended_sessions.len() as u64);
        m.active_streams.set(summary.active_streams as u64);
        m.tracked_sessions.set(summary.tracked_sessions as u64);
        m.cycles_completed.inc();
        m.cycle_latency_ms.observe(start.elapsed().as_millis() as u64);

        if failed_hosts.is_empty() {
            health().plex.set_healthy();
        } else {
            health()
                .plex
                .set_unhealthy(format!("fetch failed: {}", failed_hosts.join(", ")));
        }

        if !summary.shared_keys.is_empty() {
            warn!(
                keys = ?summary.shared_keys,
                "Session keys reported by more than one server; start times may be mixed"
            );
        }

        debug!(
            active_streams = summary.active_streams,
            tracked_sessions = summary.tracked_sessions,
            ended = summary.ended_sessions.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Cycle complete"
        );
        debug!(snapshot = ?m.snapshot(), "Collector metrics");

        CycleReport {
            summary,
            failed_hosts,
            library_reported,
        }
    }

    fn library_due(&self) -> bool {
        match self.last_library_run {
            None => true,
            Some(last) => last.elapsed() >= self.config.library_interval(),
        }
    }

    async fn report_library(&self) {
        metrics().library_runs.inc();

        for server in &self.servers {
            let recent = LibraryInventoryReporter::recently_added_points(server.as_ref()).await;
            self.write_library_report(server.host(), "recently added", recent)
                .await;

            let libraries = LibraryInventoryReporter::library_points(server.as_ref()).await;
            self.write_library_report(server.host(), "library", libraries)
                .await;
        }
    }

    async fn write_library_report(&self, host: &str, kind: &str, report: Result<LibraryReport>) {
        match report {
            Ok(report) => {
                for (section, e) in &report.failures {
                    warn!(host = %host, section = %section, error = %e, "Failed to report {} section", kind);
                    metrics().library_section_errors.inc();
                }
                info!(host = %host, points = report.points.len(), "Writing {} data", kind);
                self.writer.write(&report.points).await;
            }
            Err(e) => {
                error!(host = %host, error = %e, "Failed to list library sections");
                metrics().library_section_errors.inc();
            }
        }
    }

    /// Fetches every server concurrently. Results come back in server order.
    async fn fetch_sessions(&self) -> Vec<Result<Vec<RawSession>>> {
        let mut tasks = JoinSet::new();
        for (idx, server) in self.servers.iter().enumerate() {
            let server = server.clone();
            tasks.spawn(async move { (idx, server.list_active_sessions().await) });
        }

        let mut results: Vec<Option<Result<Vec<RawSession>>>> =
            (0..self.servers.len()).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, result)) => results[idx] = Some(result),
                Err(e) => error!(error = %e, "Session fetch task failed"),
            }
        }

        results
            .into_iter()
            .zip(&self.servers)
            .map(|(result, server)| {
                result.unwrap_or_else(|| {
                    Err(collector_core::Error::server(
                        server.host(),
                        "session fetch task did not complete",
                    ))
                })
            })
            .collect()
    }

    async fn report_active_streams(&mut self) -> (CycleSummary, Vec<String>) {
        let results = self.fetch_sessions().await;
        let now = Utc::now();

        let mut failed_hosts = Vec::new();
        let mut cycle = self.aggregator.begin(&mut self.tracker);

        for (server, result) in self.servers.iter().zip(results) {
            let host = server.host();
            let sessions = match result {
                Ok(sessions) => sessions,
                Err(e) => {
                    error!(host = %host, error = %e, "Failed to fetch active sessions");
                    metrics().host_fetch_errors.inc();
                    failed_hosts.push(host.to_string());
                    continue;
                }
            };

            let report = cycle.record_host(host, &sessions, now);

            for point in report.points.iter().filter(|p| p.measurement == NOW_PLAYING) {
                debug!(
                    host = %host,
                    session_id = point.get_tag("session_id").unwrap_or_default(),
                    fields = ?point.fields,
                    "Now playing"
                );
            }
            info!(
                host = %host,
                active_streams = report.active_streams,
                video_transcodes = report.video_transcodes,
                audio_transcodes = report.audio_transcodes,
                "Writing active stream data"
            );

            self.writer.write(&report.points).await;
        }

        let summary = cycle.finish();

        for key in &summary.ended_sessions {
            debug!(session_id = %key, "Session ended");
        }

        if let Some(combined) = &summary.combined {
            info!(active_streams = summary.active_streams, "Writing combined stream data");
            self.writer.write(std::slice::from_ref(combined)).await;
        }

        (summary, failed_hosts)
    }
}
