//! In-process fake Plex and InfluxDB servers.
//!
//! Both bind `127.0.0.1:0` and serve from shared state the tests can inspect
//! and script, so the real HTTP clients run end to end without external
//! services.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use influx_sink::InfluxConfig;
use parking_lot::Mutex;
use plex_client::PlexConfig;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::fixtures;

/// Token the fake plex.tv hands out for `alice:secret`.
pub const FAKE_TOKEN: &str = "tok123";

async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind fake server");
    let addr = listener.local_addr().expect("Failed to read local address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });
    addr
}

/// One request received on `/write`.
#[derive(Debug, Clone)]
pub struct WriteRequest {
    pub params: HashMap<String, String>,
    pub body: String,
}

#[derive(Default)]
pub struct InfluxState {
    database_exists: Mutex<bool>,
    writes: Mutex<Vec<WriteRequest>>,
    queries: Mutex<Vec<String>>,
    /// Status every write answers with, overriding normal behavior.
    forced_write_status: Mutex<Option<StatusCode>>,
}

/// Fake InfluxDB 1.x HTTP API.
pub struct FakeInflux {
    pub addr: SocketAddr,
    state: Arc<InfluxState>,
}

impl FakeInflux {
    pub async fn start(database_exists: bool) -> Self {
        let state = Arc::new(InfluxState {
            database_exists: Mutex::new(database_exists),
            ..Default::default()
        });

        let router = Router::new()
            .route("/ping", get(|| async { StatusCode::NO_CONTENT }))
            .route("/write", post(influx_write))
            .route("/query", post(influx_query))
            .with_state(state.clone());

        let addr = serve(router).await;
        Self { addr, state }
    }

    pub fn config(&self) -> InfluxConfig {
        InfluxConfig {
            address: self.addr.ip().to_string(),
            port: self.addr.port(),
            ..Default::default()
        }
    }

    pub fn force_write_status(&self, status: StatusCode) {
        *self.state.forced_write_status.lock() = Some(status);
    }

    pub fn database_exists(&self) -> bool {
        *self.state.database_exists.lock()
    }

    /// Accepted writes.
    pub fn writes(&self) -> Vec<WriteRequest> {
        self.state.writes.lock().clone()
    }

    /// Every accepted line, across writes.
    pub fn lines(&self) -> Vec<String> {
        self.writes()
            .iter()
            .flat_map(|w| w.body.lines().map(str::to_string).collect::<Vec<_>>())
            .collect()
    }

    pub fn queries(&self) -> Vec<String> {
        self.state.queries.lock().clone()
    }
}

async fn influx_write(
    State(state): State<Arc<InfluxState>>,
    Query(params): Query<HashMap<String, String>>,
    body: String,
) -> Response {
    if let Some(status) = *state.forced_write_status.lock() {
        return (status, Json(json!({"error": "forced failure"}))).into_response();
    }

    if !*state.database_exists.lock() {
        let db = params.get("db").cloned().unwrap_or_default();
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": format!("database not found: \"{}\"", db)})),
        )
            .into_response();
    }

    state.writes.lock().push(WriteRequest { params, body });
    StatusCode::NO_CONTENT.into_response()
}

async fn influx_query(
    State(state): State<Arc<InfluxState>>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    let q = params.get("q").cloned().unwrap_or_default();
    if q.starts_with("CREATE DATABASE") {
        *state.database_exists.lock() = true;
    }
    state.queries.lock().push(q);
    (StatusCode::OK, Json(json!({"results": [{"statement_id": 0}]})))
}

#[derive(Default)]
pub struct PlexState {
    sessions: Mutex<Option<Value>>,
    fail_sessions: Mutex<bool>,
    /// `X-Plex-Token` header of every API request.
    tokens: Mutex<Vec<Option<String>>>,
    sign_ins: Mutex<usize>,
}

/// Fake Plex Media Server, plus the plex.tv sign-in endpoint.
pub struct FakePlex {
    pub addr: SocketAddr,
    state: Arc<PlexState>,
}

impl FakePlex {
    pub async fn start() -> Self {
        let state = Arc::new(PlexState {
            sessions: Mutex::new(Some(fixtures::sessions_json())),
            ..Default::default()
        });

        let router = Router::new()
            .route("/", get(|| async { StatusCode::UNAUTHORIZED }))
            .route("/status/sessions", get(plex_sessions))
            .route("/library/sections", get(plex_sections))
            .route("/library/sections/:key/all", get(plex_section_all))
            .route("/library/sections/:key/recentlyAdded", get(plex_recently_added))
            .route("/users/sign_in.json", post(plex_sign_in))
            .with_state(state.clone());

        let addr = serve(router).await;
        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn config(&self) -> PlexConfig {
        PlexConfig {
            username: "alice".into(),
            password: "secret".into(),
            servers: vec![self.addr.ip().to_string()],
            port: Some(self.addr.port()),
            sign_in_url: format!("{}/users/sign_in.json", self.base_url()),
            ..Default::default()
        }
    }

    pub fn set_sessions(&self, sessions: Value) {
        *self.state.sessions.lock() = Some(sessions);
    }

    pub fn set_fail_sessions(&self, fail: bool) {
        *self.state.fail_sessions.lock() = fail;
    }

    pub fn tokens(&self) -> Vec<Option<String>> {
        self.state.tokens.lock().clone()
    }

    pub fn sign_ins(&self) -> usize {
        *self.state.sign_ins.lock()
    }
}

fn record_token(state: &PlexState, headers: &HeaderMap) {
    let token = headers
        .get("x-plex-token")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.tokens.lock().push(token);
}

async fn plex_sessions(
    State(state): State<Arc<PlexState>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    record_token(&state, &headers);
    if *state.fail_sessions.lock() {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({})));
    }
    let sessions = state
        .sessions
        .lock()
        .clone()
        .unwrap_or_else(|| json!({"MediaContainer": {"size": 0}}));
    (StatusCode::OK, Json(sessions))
}

async fn plex_sections(State(state): State<Arc<PlexState>>, headers: HeaderMap) -> Json<Value> {
    record_token(&state, &headers);
    Json(fixtures::sections_json())
}

async fn plex_section_all(
    State(state): State<Arc<PlexState>>,
    Path(key): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Json<Value> {
    record_token(&state, &headers);

    let count_only = params.get("X-Plex-Container-Size").map(String::as_str) == Some("0");
    if count_only {
        let total = if key == "1" { 118 } else { 2 };
        return Json(json!({"MediaContainer": {"size": 0, "totalSize": total}}));
    }
    Json(fixtures::shows_json())
}

async fn plex_recently_added(
    State(state): State<Arc<PlexState>>,
    Path(_key): Path<String>,
    headers: HeaderMap,
) -> Json<Value> {
    record_token(&state, &headers);
    Json(fixtures::recently_added_json())
}

async fn plex_sign_in(
    State(state): State<Arc<PlexState>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    *state.sign_ins.lock() += 1;

    // alice:secret
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some("Basic YWxpY2U6c2VjcmV0");
    if !authorized {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "Invalid credentials"})));
    }

    (
        StatusCode::CREATED,
        Json(json!({"user": {"authToken": FAKE_TOKEN, "username": "alice"}})),
    )
}
