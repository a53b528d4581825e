//! Plex configuration.

use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError};

/// Plex server and account configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_credentials"))]
pub struct PlexConfig {
    /// plex.tv account used to obtain a token
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Pre-issued token; skips plex.tv sign-in when set
    #[serde(default)]
    pub token: Option<String>,
    /// Server addresses, as a list or a comma-separated string
    #[serde(default, deserialize_with = "deserialize_servers")]
    #[validate(length(min = 1, message = "no Plex servers provided"))]
    pub servers: Vec<String>,
    #[serde(default)]
    pub https: bool,
    /// Defaults to 32400, or 32469 with HTTPS
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub verify_ssl: bool,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_sign_in_url")]
    pub sign_in_url: String,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_sign_in_url() -> String {
    "https://plex.tv/users/sign_in.json".to_string()
}

fn validate_credentials(config: &PlexConfig) -> Result<(), ValidationError> {
    let has_token = config.token.as_deref().is_some_and(|t| !t.is_empty());
    if has_token || !config.username.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new("plex_credentials"))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ServerList {
    List(Vec<String>),
    Joined(String),
}

fn deserialize_servers<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let servers = match ServerList::deserialize(deserializer)? {
        ServerList::List(list) => list,
        ServerList::Joined(joined) => joined.split(',').map(str::to_string).collect(),
    };
    Ok(servers
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

impl Default for PlexConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            token: None,
            servers: Vec::new(),
            https: false,
            port: None,
            verify_ssl: false,
            timeout_secs: default_timeout_secs(),
            sign_in_url: default_sign_in_url(),
        }
    }
}

impl PlexConfig {
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(if self.https { 32469 } else { 32400 })
    }

    /// Base URL for one server address.
    pub fn url(&self, server: &str) -> String {
        let scheme = if self.https { "https" } else { "http" };
        format!("{}://{}:{}", scheme, server, self.port())
    }

    /// `(address, base url)` for every configured server.
    pub fn server_urls(&self) -> Vec<(String, String)> {
        self.servers
            .iter()
            .map(|s| (s.clone(), self.url(s)))
            .collect()
    }
}
