//! Plex server reachability checks.

use collector_core::{Error, Result};
use reqwest::StatusCode;
use tracing::{debug, warn};

/// Checks that something answers at the server's base URL.
///
/// An unauthenticated request is expected to get 401; any HTTP answer counts
/// as reachable.
pub async fn check_reachable(http: &reqwest::Client, base_url: &str) -> Result<()> {
    let response = http
        .get(base_url)
        .send()
        .await
        .map_err(|e| Error::server(base_url, format!("unreachable: {}", e)))?;

    match response.status() {
        StatusCode::UNAUTHORIZED => debug!(url = %base_url, "Plex server reachable"),
        status if status.is_success() => debug!(url = %base_url, "Plex server reachable"),
        status => warn!(url = %base_url, status = %status, "Unexpected status code from Plex server"),
    }
    Ok(())
}
