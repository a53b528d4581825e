//! InfluxDB HTTP client.

use async_trait::async_trait;
use collector_core::{Error, Point, PointSink, Result};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::InfluxConfig;
use crate::line::encode_batch;

/// InfluxDB 1.x client writing line protocol over HTTP.
#[derive(Clone)]
pub struct InfluxClient {
    http: reqwest::Client,
    base_url: String,
    config: InfluxConfig,
}

impl InfluxClient {
    /// Creates a new InfluxDB client.
    pub fn new(config: InfluxConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = config.base_url();

        info!(
            url = %base_url,
            database = %config.database,
            "Created InfluxDB client"
        );

        Ok(Self {
            http,
            base_url,
            config,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &InfluxConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Runs an InfluxQL statement through `/query`.
    pub async fn query(&self, statement: &str) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/query", self.base_url))
            .query(&self.config.credentials())
            .query(&[("q", statement)])
            .send()
            .await
            .map_err(|e| Error::http(format!("Query request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::auth(format!("InfluxDB rejected credentials ({})", status)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::sink(format!("Query failed ({}): {}", status, body.trim())));
        }
        Ok(())
    }
}

#[async_trait]
impl PointSink for InfluxClient {
    async fn write_points(&self, points: &[Point]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        let body = encode_batch(points)?;

        let response = self
            .http
            .post(format!("{}/write", self.base_url))
            .query(&[("db", self.config.database.as_str()), ("precision", "ns")])
            .query(&self.config.credentials())
            .body(body)
            .send()
            .await
            .map_err(|e| Error::http(format!("Write request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            debug!(count = points.len(), "Written to InfluxDB");
            return Ok(());
        }

        if status == StatusCode::NOT_FOUND {
            return Err(Error::database_not_found(self.config.database.clone()));
        }

        let body = response.text().await.unwrap_or_default();
        Err(Error::sink(format!("Write failed ({}): {}", status, body.trim())))
    }

    async fn create_database(&self) -> Result<()> {
        let statement = format!(
            "CREATE DATABASE \"{}\"",
            self.config.database.replace('"', "\\\"")
        );
        self.query(&statement).await?;
        info!(database = %self.config.database, "Created InfluxDB database");
        Ok(())
    }
}
