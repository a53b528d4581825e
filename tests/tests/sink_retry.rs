//! Write path recovery: create the missing database, retry once, then drop.

use collector_core::{MediaServer, Point, PointSink};
use integration_tests::mocks::{MockServer, MockSink, SinkMode};
use std::sync::Arc;
use worker::{PollConfig, PollLoop, SinkWriter, WriteOutcome};

fn batch() -> Vec<Point> {
    vec![
        Point::new("active_streams")
            .tag("host", "s1")
            .field("active_streams", 1i64),
    ]
}

#[tokio::test]
async fn test_missing_database_is_created_and_batch_retried() {
    let sink = MockSink::with_mode(SinkMode::MissingDatabase);
    let writer = SinkWriter::new(Arc::new(sink.clone()));

    let outcome = writer.write(&batch()).await;

    assert_eq!(outcome, WriteOutcome::WrittenAfterCreate(1));
    assert_eq!(sink.creates(), 1);
    assert_eq!(sink.write_attempts(), 2);
    assert_eq!(sink.batches(), vec![batch()]);
}

#[tokio::test]
async fn test_retry_happens_at_most_once() {
    let sink = MockSink::with_mode(SinkMode::MissingDatabaseForever);
    let writer = SinkWriter::new(Arc::new(sink.clone()));

    let outcome = writer.write(&batch()).await;

    assert_eq!(outcome, WriteOutcome::Dropped);
    assert!(!outcome.is_written());
    assert_eq!(sink.creates(), 1);
    assert_eq!(sink.write_attempts(), 2);
    assert!(sink.batches().is_empty());
}

#[tokio::test]
async fn test_other_failures_drop_without_create() {
    let sink = MockSink::with_mode(SinkMode::Fail);
    let writer = SinkWriter::new(Arc::new(sink.clone()));

    assert_eq!(writer.write(&batch()).await, WriteOutcome::Dropped);
    assert_eq!(sink.creates(), 0);
    assert_eq!(sink.write_attempts(), 1);
}

#[tokio::test]
async fn test_failed_writes_do_not_stop_the_cycle() {
    let s1 = MockServer::with_sessions("s1", &["a"]);
    let s2 = MockServer::with_sessions("s2", &["b"]);
    let sink = MockSink::with_mode(SinkMode::Fail);
    let servers: Vec<Arc<dyn MediaServer>> = vec![Arc::new(s1), Arc::new(s2)];
    let mut poll = PollLoop::new(
        PollConfig::default(),
        servers,
        Arc::new(sink.clone()) as Arc<dyn PointSink>,
    );

    let report = poll.run_cycle().await;

    // One batch per host plus the combined point, all dropped
    assert_eq!(sink.write_attempts(), 3);
    assert_eq!(report.summary.active_streams, 2);
    assert_eq!(poll.tracker().keys(), vec!["a", "b"]);

    sink.set_mode(SinkMode::Accept);
    poll.run_cycle().await;
    assert_eq!(sink.batches().len(), 3);
}
