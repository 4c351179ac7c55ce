//! Configuration module for the Crossfade backend.
//!
//! Loads configuration from `config.toml` with environment variable overrides.

use config::{Config as ConfigLoader, Environment, File};
use serde::Deserialize;

use crate::error::AppError;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub spotify: SpotifyConfig,
    #[serde(default)]
    pub kkbox: KkboxConfig,
    #[serde(default)]
    pub lastfm: LastFmConfig,
    #[serde(default)]
    pub musicbrainz: MusicBrainzConfig,
    #[serde(default)]
    pub ytmusic: YtMusicConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub recommend: RecommendConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Listen address in `HTTP_ADDR` form (`":8080"` or `"host:port"`),
    /// taking precedence over host and port
    #[serde(default)]
    pub addr: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            addr: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Spotify client-credentials configuration
#[derive(Clone, Deserialize, Default)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

// Custom Debug implementation to avoid exposing client_secret
impl std::fmt::Debug for SpotifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpotifyConfig")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// KKBOX client-credentials configuration
#[derive(Clone, Deserialize, Default)]
pub struct KkboxConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl std::fmt::Debug for KkboxConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KkboxConfig")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Last.fm API configuration
#[derive(Clone, Deserialize, Default)]
pub struct LastFmConfig {
    pub api_key: Option<String>,
}

impl std::fmt::Debug for LastFmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LastFmConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// MusicBrainz configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MusicBrainzConfig {
    #[serde(default = "default_rate_limit")]
    pub rate_limit_ms: u64,
    /// Contact string sent in the User-Agent
    #[serde(default = "default_contact")]
    pub contact: String,
}

impl Default for MusicBrainzConfig {
    fn default() -> Self {
        Self {
            rate_limit_ms: default_rate_limit(),
            contact: default_contact(),
        }
    }
}

fn default_rate_limit() -> u64 {
    1000 // MusicBrainz requires max 1 request/second
}

fn default_contact() -> String {
    "https://github.com/crossfade-music/crossfade".to_string()
}

/// YouTube Music sidecar configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct YtMusicConfig {
    pub base_url: Option<String>,
}

/// Shared token store configuration
#[derive(Clone, Deserialize, Default)]
pub struct RedisConfig {
    pub url: Option<String>,
    pub password: Option<String>,
}

impl std::fmt::Debug for RedisConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisConfig")
            .field("url", &self.url)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Recommendation pipeline tuning
#[derive(Debug, Clone, Deserialize)]
pub struct RecommendConfig {
    /// Deadline for one recommend call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Parallel Spotify lookups per request
    #[serde(default = "default_concurrency")]
    pub spotify_concurrency: usize,
    /// Parallel Deezer lookups per request
    #[serde(default = "default_concurrency")]
    pub deezer_concurrency: usize,
    /// Also fetch MusicBrainz tags for candidates (slow: one request per second)
    #[serde(default)]
    pub candidate_musicbrainz_tags: bool,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            spotify_concurrency: default_concurrency(),
            deezer_concurrency: default_concurrency(),
            candidate_musicbrainz_tags: false,
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_concurrency() -> usize {
    15
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. Default values
    /// 2. `config.toml` in current directory (optional)
    /// 3. Environment variables with `CROSSFADE_` prefix
    /// 4. Deployment variables such as `SPOTIFY_CLIENT_ID` and `HTTP_ADDR`
    ///
    /// Environment variables use double underscore for nesting:
    /// - `CROSSFADE_SERVER__PORT=9000` sets `server.port`
    /// - `CROSSFADE_RECOMMEND__TIMEOUT_SECS=10` sets `recommend.timeout_secs`
    pub fn load() -> Result<Self, AppError> {
        Self::load_from("config.toml")
    }

    /// Load configuration from a specific file path.
    pub fn load_from(config_path: &str) -> Result<Self, AppError> {
        let env = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        let config = ConfigLoader::builder()
            // Start with defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("musicbrainz.rate_limit_ms", 1000)?
            .set_default("musicbrainz.contact", default_contact())?
            .set_default("recommend.timeout_secs", 30)?
            .set_default("recommend.spotify_concurrency", 15)?
            .set_default("recommend.deezer_concurrency", 15)?
            .set_default("recommend.candidate_musicbrainz_tags", false)?
            // Add config file (optional)
            .add_source(File::with_name(config_path).required(false))
            // CROSSFADE_SERVER__PORT=9000 -> server.port = 9000
            .add_source(
                Environment::with_prefix("CROSSFADE")
                    .separator("__")
                    .try_parsing(true),
            )
            // Plain deployment variables win over everything else
            .set_override_option("server.addr", env("HTTP_ADDR"))?
            .set_override_option("spotify.client_id", env("SPOTIFY_CLIENT_ID"))?
            .set_override_option("spotify.client_secret", env("SPOTIFY_CLIENT_SECRET"))?
            .set_override_option("kkbox.client_id", env("KKBOX_ID"))?
            .set_override_option("kkbox.client_secret", env("KKBOX_SECRET"))?
            .set_override_option("lastfm.api_key", env("LASTFM_API_KEY"))?
            .set_override_option("redis.url", env("REDIS_URL"))?
            .set_override_option("redis.password", env("REDIS_PASSWORD"))?
            .set_override_option("ytmusic.base_url", env("YTMUSIC_SIDECAR_URL"))?
            .build()?;

        let config: Config = config.try_deserialize()?;

        config.validate();

        Ok(config)
    }

    /// Warn about optional integrations that are not configured.
    fn validate(&self) {
        if !has_value(&self.lastfm.api_key) {
            tracing::warn!("Last.fm API key not configured - Last.fm candidates disabled");
        }

        if !has_value(&self.ytmusic.base_url) {
            tracing::warn!("YouTube Music sidecar not configured - YouTube Music candidates disabled");
        }

        if !has_value(&self.redis.url) {
            tracing::info!("Redis not configured - tokens are cached in process only");
        }
    }

    /// Fail unless both Spotify and KKBOX credentials are present.
    pub fn require_credentials(&self) -> Result<(), AppError> {
        let missing: Vec<&str> = [
            ("SPOTIFY_CLIENT_ID", &self.spotify.client_id),
            ("SPOTIFY_CLIENT_SECRET", &self.spotify.client_secret),
            ("KKBOX_ID", &self.kkbox.client_id),
            ("KKBOX_SECRET", &self.kkbox.client_secret),
        ]
        .into_iter()
        .filter(|(_, value)| !has_value(value))
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::Internal(format!(
                "Missing required credentials: {}",
                missing.join(", ")
            )))
        }
    }

    /// Redis connection URL with the configured password filled in.
    ///
    /// The password is only injected when the URL does not already carry
    /// credentials.
    pub fn redis_url(&self) -> Option<String> {
        let url = self.redis.url.as_deref().filter(|u| !u.is_empty())?;

        match self.redis.password.as_deref().filter(|p| !p.is_empty()) {
            Some(password) if !url.contains('@') => {
                let (scheme, rest) = url.split_once("://").unwrap_or(("redis", url));
                Some(format!("{}://:{}@{}", scheme, password, rest))
            }
            _ => Some(url.to_string()),
        }
    }

    /// Get the server socket address
    pub fn server_addr(&self) -> std::net::SocketAddr {
        use std::net::{IpAddr, Ipv4Addr, SocketAddr};

        if let Some(addr) = self.server.addr.as_deref() {
            if let Some(parsed) = parse_http_addr(addr) {
                return parsed;
            }
            tracing::warn!("Invalid HTTP_ADDR '{}', falling back to host/port", addr);
        }

        let ip: IpAddr = self.server.host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid host '{}', using 0.0.0.0", self.server.host);
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        });
        SocketAddr::new(ip, self.server.port)
    }
}

fn has_value(value: &Option<String>) -> bool {
    value.as_deref().map(|v| !v.trim().is_empty()).unwrap_or(false)
}

/// Parse `":8080"` or `"127.0.0.1:8080"`.
fn parse_http_addr(addr: &str) -> Option<std::net::SocketAddr> {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    let addr = addr.trim();
    if let Some(port) = addr.strip_prefix(':') {
        let port: u16 = port.parse().ok()?;
        return Some(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port));
    }
    addr.parse().ok()
}
