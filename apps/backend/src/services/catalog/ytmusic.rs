//! Client for the YouTube Music sidecar.
//!
//! The sidecar wraps the unofficial YouTube Music API and answers
//! `GET /search?q=&limit=` and `GET /similar/{video_id}?limit=`, both with a
//! `tracks` array.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use super::{decode_optional, transport_error, user_agent, YouTubeMusicCatalog, YtMusicTrack, REQUEST_TIMEOUT_SECS};
use crate::error::{AppError, Result};

const SERVICE: &str = "YouTube Music";

pub struct YouTubeMusicClient {
    client: Client,
    base_url: String,
}

impl YouTubeMusicClient {
    /// `base_url` is the sidecar root, e.g. `http://ytmusic-sidecar:8081`.
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(AppError::Internal(
                "YouTube Music sidecar URL cannot be empty".to_string(),
            ));
        }

        let client = Client::builder()
            .user_agent(user_agent())
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    pub fn new_shared(base_url: &str) -> Result<Arc<Self>> {
        Ok(Arc::new(Self::new(base_url)?))
    }

    async fn get_tracks(&self, path: &str, params: &[(&str, String)]) -> Result<Vec<YtMusicTrack>> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, path, e))?;

        let body: Option<YtTracksResponse> = decode_optional(SERVICE, path, response).await?;
        let tracks = body.map(|b| b.tracks).unwrap_or_default();

        tracing::debug!(path = %path, count = tracks.len(), "YouTube Music sidecar response");
        Ok(tracks)
    }
}

#[async_trait]
impl YouTubeMusicCatalog for YouTubeMusicClient {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<YtMusicTrack>> {
        let params = [("q", query.to_string()), ("limit", limit.to_string())];
        self.get_tracks("/search", &params).await
    }

    async fn similar(&self, video_id: &str, limit: u32) -> Result<Vec<YtMusicTrack>> {
        if video_id.is_empty() || video_id.contains('/') {
            return Err(AppError::BadRequest(format!("Invalid video id: {}", video_id)));
        }

        let params = [("limit", limit.to_string())];
        self.get_tracks(&format!("/similar/{}", video_id), &params)
            .await
    }
}

/// Body of both sidecar endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct YtTracksResponse {
    /// Echo of the query or video id
    #[serde(default, alias = "query")]
    pub video_id: Option<String>,
    #[serde(default)]
    pub tracks: Vec<YtMusicTrack>,
}
