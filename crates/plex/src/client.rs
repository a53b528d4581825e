//! Plex HTTP client.

use async_trait::async_trait;
use collector_core::{
    Error, LibrarySection, MediaServer, RawSession, RecentItem, Result, ShowSummary,
};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::auth::{CLIENT_IDENTIFIER, PRODUCT, VERSION};
use crate::config::PlexConfig;
use crate::models::{DirectoryContainer, Envelope, Metadata, MetadataContainer};

/// Builds an HTTP client carrying the collector's identity headers.
pub fn http_client(config: &PlexConfig, token: Option<&str>) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert("x-plex-client-identifier", HeaderValue::from_static(CLIENT_IDENTIFIER));
    headers.insert("x-plex-product", HeaderValue::from_static(PRODUCT));
    headers.insert("x-plex-version", HeaderValue::from_static(VERSION));

    if let Some(token) = token {
        let mut value = HeaderValue::from_str(token)
            .map_err(|_| Error::config("Plex token contains invalid characters"))?;
        value.set_sensitive(true);
        headers.insert("x-plex-token", value);
    }

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .danger_accept_invalid_certs(!config.verify_ssl)
        .build()
        .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))
}

/// Client for one Plex Media Server.
#[derive(Clone)]
pub struct PlexClient {
    http: reqwest::Client,
    /// Server address as configured; the `host` tag value
    host: String,
    base_url: String,
}

impl PlexClient {
    /// Creates a client for the server at `host` authenticated with `token`.
    pub fn new(config: &PlexConfig, host: impl Into<String>, token: &str) -> Result<Self> {
        let host = host.into();
        Self::with_base_url(config, host.clone(), config.url(&host), token)
    }

    /// Creates a client with an explicit base URL.
    pub fn with_base_url(
        config: &PlexConfig,
        host: impl Into<String>,
        base_url: impl Into<String>,
        token: &str,
    ) -> Result<Self> {
        let host = host.into();
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = http_client(config, Some(token))?;

        info!(host = %host, url = %base_url, "Created Plex client");

        Ok(Self {
            http,
            host,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "Plex request");

        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::server(&self.base_url, format!("{}: {}", path, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::server(
                &self.base_url,
                format!("{} returned {}", path, status),
            ));
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| Error::server(&self.base_url, format!("{}: bad response: {}", path, e)))?;
        Ok(envelope.media_container)
    }

    fn page(start: usize, size: usize) -> [(&'static str, String); 2] {
        [
            ("X-Plex-Container-Start", start.to_string()),
            ("X-Plex-Container-Size", size.to_string()),
        ]
    }
}

#[async_trait]
impl MediaServer for PlexClient {
    fn host(&self) -> &str {
        &self.host
    }

    async fn list_active_sessions(&self) -> Result<Vec<RawSession>> {
        let container: MetadataContainer = self.get("/status/sessions", &[]).await?;

        let total = container.metadata.len();
        let sessions: Vec<RawSession> = container
            .metadata
            .into_iter()
            .filter_map(Metadata::into_session)
            .collect();

        if sessions.len() < total {
            warn!(
                host = %self.host,
                skipped = total - sessions.len(),
                "Skipped sessions without a session id"
            );
        }
        Ok(sessions)
    }

    async fn list_library_sections(&self) -> Result<Vec<LibrarySection>> {
        let container: DirectoryContainer = self.get("/library/sections", &[]).await?;
        Ok(container.directory.into_iter().map(LibrarySection::from).collect())
    }

    async fn count_items(&self, section: &LibrarySection) -> Result<u64> {
        let path = format!("/library/sections/{}/all", section.key);
        let container: MetadataContainer = self.get(&path, &Self::page(0, 0)).await?;
        Ok(container.count())
    }

    async fn list_shows(&self, section: &LibrarySection) -> Result<Vec<ShowSummary>> {
        let path = format!("/library/sections/{}/all", section.key);
        let container: MetadataContainer = self.get(&path, &[]).await?;

        Ok(container
            .metadata
            .into_iter()
            .map(|show| {
                debug!(show = %show.title, "Counting TV show");
                show.into_show_summary()
            })
            .collect())
    }

    async fn list_recently_added(
        &self,
        section: &LibrarySection,
        max: usize,
    ) -> Result<Vec<RecentItem>> {
        let path = format!("/library/sections/{}/recentlyAdded", section.key);
        let container: MetadataContainer = self.get(&path, &Self::page(0, max)).await?;

        Ok(container
            .metadata
            .into_iter()
            .filter_map(Metadata::into_recent_item)
            .take(max)
            .collect())
    }
}
