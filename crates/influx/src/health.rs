//! InfluxDB health checks.

use crate::client::InfluxClient;
use collector_core::{Error, Result};
use tracing::{debug, error};

/// Ping the server, then run a query to confirm the credentials work.
pub async fn check_connection(client: &InfluxClient) -> Result<()> {
    let response = client
        .http()
        .get(format!("{}/ping", client.base_url()))
        .send()
        .await
        .map_err(|e| {
            error!(url = %client.base_url(), "InfluxDB ping failed: {}", e);
            Error::http(format!("Unable to reach InfluxDB at {}: {}", client.base_url(), e))
        })?;

    if !response.status().is_success() {
        return Err(Error::sink(format!(
            "Unexpected ping status {} from {}",
            response.status(),
            client.base_url()
        )));
    }

    client.query("SHOW DATABASES").await?;

    debug!("InfluxDB connection healthy");
    Ok(())
}
