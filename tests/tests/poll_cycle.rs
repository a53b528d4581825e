//! End-to-end polling cycles against mock servers and a recording sink.

use collector_core::{
    FieldValue, MediaServer, PointSink, StreamDecision, ACTIVE_STREAMS, ALL_HOSTS, NOW_PLAYING,
};
use integration_tests::fixtures;
use integration_tests::mocks::{MockServer, MockSink};
use std::sync::Arc;
use worker::{PollConfig, PollLoop};

fn poll_loop(servers: &[&MockServer], sink: &MockSink, report_combined: bool) -> PollLoop {
    let config = PollConfig {
        report_combined,
        ..Default::default()
    };
    let servers: Vec<Arc<dyn MediaServer>> = servers
        .iter()
        .map(|s| Arc::new((*s).clone()) as Arc<dyn MediaServer>)
        .collect();
    PollLoop::new(config, servers, Arc::new(sink.clone()) as Arc<dyn PointSink>)
}

fn active_streams_for(sink: &MockSink, host: &str) -> Option<i64> {
    sink.points_named(ACTIVE_STREAMS)
        .iter()
        .rev()
        .find(|p| p.get_tag("host") == Some(host))
        .and_then(|p| p.get_field("active_streams"))
        .and_then(FieldValue::as_i64)
}

/// Sessions a,b on s1 and c on s2; next cycle a on s1 and c,d on s2.
#[tokio::test]
async fn test_two_servers_track_and_reconcile() {
    let s1 = MockServer::with_sessions("s1", &["a", "b"]);
    let s2 = MockServer::with_sessions("s2", &["c"]);
    let sink = MockSink::new();
    let mut poll = poll_loop(&[&s1, &s2], &sink, true);

    let first = poll.run_cycle().await;
    assert_eq!(first.summary.active_streams, 3);
    assert!(first.summary.ended_sessions.is_empty());
    assert_eq!(poll.tracker().keys(), vec!["a", "b", "c"]);

    let a_start = poll.tracker().start_time("a").unwrap();
    let c_start = poll.tracker().start_time("c").unwrap();

    s1.set_session_keys(&["a"]);
    s2.set_session_keys(&["c", "d"]);
    sink.clear();

    let second = poll.run_cycle().await;
    assert_eq!(second.summary.ended_sessions, vec!["b"]);
    assert_eq!(poll.tracker().keys(), vec!["a", "c", "d"]);

    // Survivors keep their first-seen start time
    assert_eq!(poll.tracker().start_time("a"), Some(a_start));
    assert_eq!(poll.tracker().start_time("c"), Some(c_start));

    let now_playing = sink.points_named(NOW_PLAYING);
    let mut keys: Vec<&str> = now_playing
        .iter()
        .filter_map(|p| p.get_tag("session_id"))
        .collect();
    keys.sort();
    assert_eq!(keys, vec!["a", "c", "d"]);

    assert_eq!(active_streams_for(&sink, "s1"), Some(1));
    assert_eq!(active_streams_for(&sink, "s2"), Some(2));
    assert_eq!(active_streams_for(&sink, ALL_HOSTS), Some(3));
}

#[tokio::test]
async fn test_combined_point_sums_hosts() {
    let s1 = MockServer::with_sessions("s1", &["a", "b", "c"]);
    let s2 = MockServer::with_sessions("s2", &["d", "e"]);
    let sink = MockSink::new();
    let mut poll = poll_loop(&[&s1, &s2], &sink, true);

    let report = poll.run_cycle().await;

    let combined = report.summary.combined.expect("combined point");
    assert_eq!(combined.get_tag("host"), Some(ALL_HOSTS));
    assert_eq!(combined.get_field("active_streams"), Some(&FieldValue::Integer(5)));
    assert_eq!(active_streams_for(&sink, ALL_HOSTS), Some(5));
}

#[tokio::test]
async fn test_reconcile_runs_without_combined_reporting() {
    let s1 = MockServer::with_sessions("s1", &["a", "b"]);
    let sink = MockSink::new();
    let mut poll = poll_loop(&[&s1], &sink, false);

    poll.run_cycle().await;
    s1.set_session_keys(&["b"]);
    let report = poll.run_cycle().await;

    assert!(report.summary.combined.is_none());
    assert_eq!(report.summary.ended_sessions, vec!["a"]);
    assert_eq!(poll.tracker().keys(), vec!["b"]);
    assert_eq!(active_streams_for(&sink, ALL_HOSTS), None);
}

#[tokio::test]
async fn test_failing_host_loses_its_sessions() {
    let s1 = MockServer::with_sessions("s1", &["a"]);
    let s2 = MockServer::with_sessions("s2", &["b"]);
    let sink = MockSink::new();
    let mut poll = poll_loop(&[&s1, &s2], &sink, true);

    poll.run_cycle().await;
    s1.set_should_fail(true);
    sink.clear();

    let report = poll.run_cycle().await;
    assert_eq!(report.failed_hosts, vec!["s1"]);
    assert_eq!(report.summary.ended_sessions, vec!["a"]);
    assert_eq!(poll.tracker().keys(), vec!["b"]);

    // s2 still reported, s1 wrote nothing
    assert_eq!(active_streams_for(&sink, "s2"), Some(1));
    assert_eq!(active_streams_for(&sink, "s1"), None);

    // Recovery starts a fresh session
    s1.set_should_fail(false);
    poll.run_cycle().await;
    assert_eq!(poll.tracker().keys(), vec!["a", "b"]);
}

#[tokio::test]
async fn test_transcode_counters_per_host() {
    let s1 = MockServer::new("s1");
    s1.set_sessions(vec![
        fixtures::episode_session(
            "t1",
            Some(StreamDecision::Transcode),
            Some(StreamDecision::Transcode),
        ),
        fixtures::episode_session("t2", Some(StreamDecision::Transcode), Some(StreamDecision::Copy)),
        fixtures::movie_session("m1"),
    ]);
    let sink = MockSink::new();
    let mut poll = poll_loop(&[&s1], &sink, false);

    poll.run_cycle().await;

    let host = sink
        .points_named(ACTIVE_STREAMS)
        .into_iter()
        .find(|p| p.get_tag("host") == Some("s1"))
        .unwrap();
    assert_eq!(host.get_field("active_streams"), Some(&FieldValue::Integer(3)));
    assert_eq!(host.get_field("audio_transcodes"), Some(&FieldValue::Integer(2)));
    assert_eq!(host.get_field("video_transcodes"), Some(&FieldValue::Integer(1)));

    let t2 = sink
        .points_named(NOW_PLAYING)
        .into_iter()
        .find(|p| p.get_tag("session_id") == Some("t2"))
        .unwrap();
    assert_eq!(
        t2.get_field("transcode_summary").and_then(FieldValue::as_str),
        Some("A: Yes V: No")
    );
    assert_eq!(
        t2.get_field("position_percent").and_then(FieldValue::as_f64),
        Some(0.0313)
    );
    assert_eq!(t2.get_field("player_state").and_then(FieldValue::as_str), Some("Unavailable"));
}

#[tokio::test]
async fn test_now_playing_point_per_media_kind() {
    let s1 = MockServer::new("s1");
    s1.set_sessions(vec![fixtures::movie_session("m1"), fixtures::track_session("t1")]);
    let sink = MockSink::new();
    let mut poll = poll_loop(&[&s1], &sink, false);

    poll.run_cycle().await;

    let points = sink.points_named(NOW_PLAYING);
    // No field shares a name with a tag
    assert!(points.iter().all(|p| p.validate().is_ok()));
    let movie = points.iter().find(|p| p.get_tag("session_id") == Some("m1")).unwrap();
    assert_eq!(movie.get_tag("player_address"), Some("10.0.0.5"));
    assert_eq!(movie.get_field("media_type").and_then(FieldValue::as_str), Some("Movie"));
    assert_eq!(movie.get_field("year").and_then(FieldValue::as_str), Some("1995"));
    assert_eq!(movie.get_field("position_percent").and_then(FieldValue::as_f64), Some(0.5));
    assert_eq!(movie.get_field("transcode_video").and_then(FieldValue::as_str), Some("DirectPlay"));
    assert_eq!(movie.get_field("duration").and_then(FieldValue::as_f64), Some(0.0));

    let track = points.iter().find(|p| p.get_tag("session_id") == Some("t1")).unwrap();
    assert_eq!(track.get_field("media_type").and_then(FieldValue::as_str), Some("Music"));
    assert_eq!(track.get_field("resolution").and_then(FieldValue::as_str), Some("320Kbps"));
    assert_eq!(track.get_field("full_title").and_then(FieldValue::as_str), Some("Artist - Song"));
    assert_eq!(track.get_field("state").and_then(FieldValue::as_str), Some("paused"));
}

#[tokio::test]
async fn test_library_report_on_first_cycle_only() {
    let s1 = MockServer::with_sessions("s1", &[]).with_items_per_section(42);
    s1.set_sections(vec![fixtures::movie_section(), fixtures::show_section()]);
    s1.set_shows(fixtures::shows());
    s1.set_recent(fixtures::recent_items(12));
    let sink = MockSink::new();
    let mut poll = poll_loop(&[&s1], &sink, false);

    let first = poll.run_cycle().await;
    assert!(first.library_reported);

    let libraries = sink.points_named("libraries");
    assert_eq!(libraries.len(), 2);
    let tv = libraries
        .iter()
        .find(|p| p.get_tag("lib_name") == Some("TV Shows"))
        .unwrap();
    assert_eq!(tv.get_tag("lib_type"), Some("show"));
    assert_eq!(tv.get_field("episodes"), Some(&FieldValue::Integer(28)));
    assert_eq!(tv.get_field("seasons"), Some(&FieldValue::Integer(3)));

    // Ten per section, two sections
    assert_eq!(sink.points_named("recently_added").len(), 20);

    sink.clear();
    let second = poll.run_cycle().await;
    assert!(!second.library_reported);
    assert!(sink.points_named("libraries").is_empty());

    // Single-run always includes the library report
    let once = poll.run_once().await;
    assert!(once.library_reported);
    assert_eq!(sink.points_named("libraries").len(), 2);
}

#[tokio::test]
async fn test_single_run_mode_runs_one_cycle() {
    let s1 = MockServer::with_sessions("s1", &["a"]);
    let sink = MockSink::new();
    let config = PollConfig {
        single_run: true,
        ..Default::default()
    };
    let poll = PollLoop::new(
        config,
        vec![Arc::new(s1.clone()) as Arc<dyn MediaServer>],
        Arc::new(sink.clone()) as Arc<dyn PointSink>,
    );

    poll.run(std::future::pending()).await;

    assert_eq!(s1.session_fetches(), 1);
    assert_eq!(active_streams_for(&sink, "s1"), Some(1));
}

#[tokio::test]
async fn test_same_key_on_two_servers_is_flagged() {
    let s1 = MockServer::with_sessions("s1", &["21", "22"]);
    let s2 = MockServer::with_sessions("s2", &["21"]);
    let sink = MockSink::new();
    let mut poll = poll_loop(&[&s1, &s2], &sink, true);

    let report = poll.run_cycle().await;

    assert_eq!(report.summary.shared_keys, vec!["21"]);
    assert_eq!(report.summary.active_streams, 3);
    assert_eq!(poll.tracker().keys(), vec!["21", "22"]);
}
