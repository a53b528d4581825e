//! InfluxDB client against an in-process fake of the 1.x HTTP API.

use axum::http::StatusCode;
use chrono::{TimeZone, Utc};
use collector_core::{Point, PointSink};
use influx_sink::health::check_connection;
use influx_sink::InfluxClient;
use integration_tests::setup::FakeInflux;
use std::sync::Arc;
use worker::{SinkWriter, WriteOutcome};

fn now_playing() -> Point {
    Point::new("now_playing")
        .tag("host", "10.0.0.2")
        .tag("session_id", "abc123")
        .field("title", "Heat, \"Director's Cut\"")
        .field("length_ms", 10_000i64)
        .field("position_percent", 0.5)
        .timestamp(Utc.timestamp_opt(1_700_000_000, 0).unwrap())
}

#[tokio::test]
async fn test_write_sends_line_protocol() {
    let fake = FakeInflux::start(true).await;
    let client = InfluxClient::new(fake.config()).unwrap();

    client.write_points(&[now_playing()]).await.unwrap();

    let writes = fake.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].params.get("db").map(String::as_str), Some("plex_data"));
    assert_eq!(writes[0].params.get("precision").map(String::as_str), Some("ns"));
    assert_eq!(
        fake.lines(),
        vec![
            "now_playing,host=10.0.0.2,session_id=abc123 length_ms=10000i,position_percent=0.5,title=\"Heat, \\\"Director's Cut\\\"\" 1700000000000000000"
        ]
    );
}

#[tokio::test]
async fn test_missing_database_maps_to_database_not_found() {
    let fake = FakeInflux::start(false).await;
    let client = InfluxClient::new(fake.config()).unwrap();

    let err = client.write_points(&[now_playing()]).await.unwrap_err();
    assert!(err.is_database_not_found());
    assert_eq!(err.error_code(), Some("SINK_001"));
}

#[tokio::test]
async fn test_writer_creates_database_over_http() {
    let fake = FakeInflux::start(false).await;
    let client = Arc::new(InfluxClient::new(fake.config()).unwrap());
    let writer = SinkWriter::new(client);

    let outcome = writer.write(&[now_playing()]).await;

    assert_eq!(outcome, WriteOutcome::WrittenAfterCreate(1));
    assert!(fake.database_exists());
    assert_eq!(fake.queries(), vec!["CREATE DATABASE \"plex_data\""]);
    assert_eq!(fake.writes().len(), 1);
}

#[tokio::test]
async fn test_server_error_is_dropped_without_create() {
    let fake = FakeInflux::start(true).await;
    fake.force_write_status(StatusCode::INTERNAL_SERVER_ERROR);
    let client = Arc::new(InfluxClient::new(fake.config()).unwrap());
    let writer = SinkWriter::new(client);

    assert_eq!(writer.write(&[now_playing()]).await, WriteOutcome::Dropped);
    assert!(fake.queries().is_empty());
}

#[tokio::test]
async fn test_check_connection() {
    let fake = FakeInflux::start(true).await;
    let client = InfluxClient::new(fake.config()).unwrap();

    check_connection(&client).await.unwrap();
    assert_eq!(fake.queries(), vec!["SHOW DATABASES"]);
}

#[tokio::test]
async fn test_check_connection_fails_when_unreachable() {
    let fake = FakeInflux::start(true).await;
    let mut config = fake.config();
    // Nothing listens on the discard port
    config.port = 9;
    let client = InfluxClient::new(config).unwrap();

    assert!(check_connection(&client).await.is_err());
}
