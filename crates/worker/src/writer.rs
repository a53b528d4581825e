//! Sink write path.
//!
//! At most one retry per batch: a missing database is created and the same
//! batch written again once. Anything else is logged and the batch dropped.

use collector_core::{Point, PointSink};
use std::sync::Arc;
use std::time::Instant;
use telemetry::{health, metrics};
use tracing::{debug, error, warn};

/// What happened to a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Nothing to write.
    Skipped,
    Written(usize),
    /// Written on the retry after creating the database.
    WrittenAfterCreate(usize),
    Dropped,
}

impl WriteOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written(_) | Self::WrittenAfterCreate(_))
    }
}

/// Writes batches to a [`PointSink`].
#[derive(Clone)]
pub struct SinkWriter {
    sink: Arc<dyn PointSink>,
}

impl SinkWriter {
    pub fn new(sink: Arc<dyn PointSink>) -> Self {
        Self { sink }
    }

    pub async fn write(&self, points: &[Point]) -> WriteOutcome {
        if points.is_empty() {
            return WriteOutcome::Skipped;
        }

        let count = points.len();
        let start = Instant::now();

        let outcome = match self.sink.write_points(points).await {
            Ok(()) => WriteOutcome::Written(count),
            Err(e) if e.is_database_not_found() => {
                warn!(error = %e, "Database does not exist, attempting to create it");
                self.create_and_retry(points).await
            }
            Err(e) => {
                error!(error = %e, count = count, "Failed to write points, dropping batch");
                metrics().sink_write_errors.inc();
                WriteOutcome::Dropped
            }
        };

        metrics()
            .sink_latency_ms
            .observe(start.elapsed().as_millis() as u64);

        match outcome {
            WriteOutcome::Written(n) | WriteOutcome::WrittenAfterCreate(n) => {
                metrics().points_written.inc_by(n as u64);
                metrics().batches_written.inc();
                health().influxdb.set_healthy();
                debug!(count = n, "Batch written");
            }
            WriteOutcome::Dropped => {
                metrics().batches_dropped.inc();
                health().influxdb.set_unhealthy("last batch dropped");
            }
            WriteOutcome::Skipped => {}
        }

        outcome
    }

    async fn create_and_retry(&self, points: &[Point]) -> WriteOutcome {
        if let Err(e) = self.sink.create_database().await {
            error!(error = %e, "Failed to create database, dropping batch");
            metrics().sink_write_errors.inc();
            return WriteOutcome::Dropped;
        }
        metrics().databases_created.inc();

        match self.sink.write_points(points).await {
            Ok(()) => WriteOutcome::WrittenAfterCreate(points.len()),
            Err(e) => {
                error!(error = %e, "Retry after creating database failed, dropping batch");
                metrics().sink_write_errors.inc();
                WriteOutcome::Dropped
            }
        }
    }
}
