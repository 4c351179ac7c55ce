//! Deezer public API client.
//!
//! No authentication. Deezer reports misses as an error object inside a
//! 200 response rather than with a 404.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use super::{decode_optional, transport_error, user_agent, DeezerCatalog, DeezerTrack, REQUEST_TIMEOUT_SECS};
use crate::error::{AppError, Result};

const DEEZER_API_URL: &str = "https://api.deezer.com";
const SERVICE: &str = "Deezer";

/// Deezer error code for "no data".
const NO_DATA_CODE: i64 = 800;

pub struct DeezerClient {
    client: Client,
    api_url: String,
}

impl DeezerClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent())
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: DEEZER_API_URL.to_string(),
        })
    }

    pub fn new_shared() -> Result<Arc<Self>> {
        Ok(Arc::new(Self::new()?))
    }

    pub fn with_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    async fn get_with_params<T>(&self, path: &str, params: &[(&str, String)]) -> Result<Option<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        let url = format!("{}{}", self.api_url, path);

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, path, e))?;

        decode_optional(SERVICE, path, response).await
    }
}

#[async_trait]
impl DeezerCatalog for DeezerClient {
    async fn track_by_isrc(&self, isrc: &str) -> Result<Option<DeezerTrack>> {
        let raw: Option<DzTrack> = self
            .get_with_params(&format!("/track/isrc:{}", isrc), &[])
            .await?;

        match raw {
            Some(raw) => raw.into_track(),
            None => Ok(None),
        }
    }

    async fn search_track(&self, title: &str, artist: &str) -> Result<Option<DeezerTrack>> {
        let mut query = format!("track:\"{}\"", title);
        if !artist.is_empty() {
            query.push_str(&format!(" artist:\"{}\"", artist));
        }

        let params = [("q", query), ("limit", "1".to_string())];
        let response: Option<DzSearchResponse> =
            self.get_with_params("/search/track", &params).await?;

        let Some(response) = response else {
            return Ok(None);
        };

        if let Some(error) = response.error {
            return error.into_result().map(|_| None);
        }

        match response.data.into_iter().next() {
            Some(raw) => raw.into_track(),
            None => Ok(None),
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct DzError {
    #[serde(rename = "type", default)]
    pub error_type: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: i64,
}

impl DzError {
    /// "No data" is a miss; every other error is a failure.
    fn into_result(self) -> Result<()> {
        if self.code == NO_DATA_CODE {
            return Ok(());
        }
        Err(AppError::ServiceUnavailable(format!(
            "Deezer error {} ({}): {}",
            self.code, self.error_type, self.message
        )))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DzArtist {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
}

/// Track object, or an error object in its place.
#[derive(Debug, Default, Deserialize)]
pub struct DzTrack {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub title: String,
    pub isrc: Option<String>,
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub bpm: f64,
    #[serde(default)]
    pub gain: f64,
    #[serde(default)]
    pub explicit_lyrics: bool,
    #[serde(default)]
    pub artist: DzArtist,
    pub error: Option<DzError>,
}

impl DzTrack {
    fn into_track(self) -> Result<Option<DeezerTrack>> {
        if let Some(error) = self.error {
            return error.into_result().map(|_| None);
        }

        Ok(Some(DeezerTrack {
            id: self.id,
            title: self.title,
            isrc: self.isrc.filter(|isrc| !isrc.is_empty()),
            duration: self.duration,
            bpm: self.bpm,
            gain: self.gain,
            explicit: self.explicit_lyrics,
            artist_id: self.artist.id,
            artist_name: self.artist.name,
        }))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DzSearchResponse {
    #[serde(default)]
    pub data: Vec<DzTrack>,
    pub error: Option<DzError>,
}
