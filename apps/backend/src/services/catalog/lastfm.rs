//! Last.fm client for `track.getSimilar`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use std::sync::Arc;
use std::time::Duration;

use super::{decode_optional, transport_error, user_agent, LastFmCatalog, LastFmTrack};
use crate::error::{AppError, Result};

const LASTFM_API_URL: &str = "https://ws.audioscrobbler.com/2.0/";
const SERVICE: &str = "Last.fm";
const TIMEOUT_SECS: u64 = 10;

/// Last.fm error code for an unknown track.
const TRACK_NOT_FOUND: i64 = 6;

pub struct LastFmClient {
    client: Client,
    api_url: String,
    api_key: String,
}

impl LastFmClient {
    pub fn new(api_key: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(AppError::Internal(
                "Last.fm API key cannot be empty".to_string(),
            ));
        }

        let client = Client::builder()
            .user_agent(user_agent())
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: LASTFM_API_URL.to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn new_shared(api_key: &str) -> Result<Arc<Self>> {
        Ok(Arc::new(Self::new(api_key)?))
    }

    pub fn with_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }
}

#[async_trait]
impl LastFmCatalog for LastFmClient {
    async fn similar_tracks(
        &self,
        artist: &str,
        track: &str,
        limit: u32,
    ) -> Result<Vec<LastFmTrack>> {
        tracing::debug!(artist = %artist, track = %track, "Fetching Last.fm similar tracks");

        let mut params = vec![
            ("method", "track.getSimilar".to_string()),
            ("artist", artist.to_string()),
            ("track", track.to_string()),
            ("api_key", self.api_key.clone()),
            ("format", "json".to_string()),
            ("autocorrect", "1".to_string()),
        ];
        if limit > 0 {
            params.push(("limit", limit.to_string()));
        }

        let response = self
            .client
            .get(&self.api_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, "track.getSimilar", e))?;

        let body: Option<LfSimilarResponse> =
            decode_optional(SERVICE, "track.getSimilar", response).await?;

        match body {
            Some(body) => body.into_tracks(),
            None => Ok(Vec::new()),
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct LfSimilarResponse {
    #[serde(default)]
    pub similartracks: LfSimilarTracks,
    #[serde(default)]
    pub error: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

impl LfSimilarResponse {
    fn into_tracks(self) -> Result<Vec<LastFmTrack>> {
        match self.error {
            Some(TRACK_NOT_FOUND) => {
                tracing::debug!("Last.fm does not know the track");
                Ok(Vec::new())
            }
            Some(code) => Err(AppError::ServiceUnavailable(format!(
                "Last.fm API error {}: {}",
                code,
                self.message.unwrap_or_default()
            ))),
            None => Ok(self
                .similartracks
                .track
                .into_iter()
                .map(LastFmTrack::from)
                .collect()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LfSimilarTracks {
    #[serde(default)]
    pub track: Vec<LfTrack>,
}

#[derive(Debug, Deserialize)]
pub struct LfTrack {
    pub name: String,
    #[serde(default)]
    pub mbid: Option<String>,
    /// Sent as a string, occasionally as a number
    #[serde(rename = "match", default, deserialize_with = "lenient_f64")]
    pub match_score: f64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub artist: LfArtist,
}

#[derive(Debug, Default, Deserialize)]
pub struct LfArtist {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mbid: Option<String>,
}

impl From<LfTrack> for LastFmTrack {
    fn from(track: LfTrack) -> Self {
        Self {
            name: track.name,
            mbid: track.mbid.filter(|id| !id.is_empty()),
            match_score: track.match_score,
            url: track.url,
            artist_name: track.artist.name,
            artist_mbid: track.artist.mbid.filter(|id| !id.is_empty()),
        }
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n,
        Raw::Text(s) => s.trim().parse().unwrap_or(0.0),
    })
}
