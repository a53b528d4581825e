//! plex.tv token bootstrap.

use collector_core::{Error, Result};
use reqwest::StatusCode;
use tracing::{debug, info};

use crate::models::SignInResponse;

/// Client identity sent with every request.
pub const CLIENT_IDENTIFIER: &str = "Plex InfluxDB Collector";
pub const PRODUCT: &str = "Plex InfluxDB Collector";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exchanges account credentials for an auth token.
pub async fn sign_in(
    http: &reqwest::Client,
    sign_in_url: &str,
    username: &str,
    password: &str,
) -> Result<String> {
    info!(user = %username, "Getting auth token");

    let response = http
        .post(sign_in_url)
        .basic_auth(username, Some(password))
        .header("X-Plex-Client-Identifier", CLIENT_IDENTIFIER)
        .header("X-Plex-Product", PRODUCT)
        .header("X-Plex-Version", VERSION)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| Error::http(format!("Sign-in request failed: {}", e)))?;

    match response.status() {
        status if status.is_success() => {}
        StatusCode::UNAUTHORIZED => {
            return Err(Error::auth("bad username/password"));
        }
        status => {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::auth(format!("sign-in failed ({}): {}", status, body.trim())));
        }
    }

    let body: SignInResponse = response
        .json()
        .await
        .map_err(|e| Error::auth(format!("unreadable sign-in response: {}", e)))?;

    let token = body
        .user
        .auth_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::auth("sign-in response carried no auth token"))?;

    debug!("Retrieved auth token");
    Ok(token)
}
