//! KKBOX Open API client.
//!
//! All requests use the JP territory.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::oauth::ClientCredentials;
use super::{decode_optional, user_agent, KkboxCatalog, KkboxTrack, REQUEST_TIMEOUT_SECS};
use crate::error::{AppError, Result};
use crate::services::cache::TokenCache;

const KKBOX_API_URL: &str = "https://api.kkbox.com/v1.1";
const KKBOX_TOKEN_URL: &str = "https://account.kkbox.com/oauth2/token";
const TERRITORY: &str = "JP";
const RELATED_LIMIT: u32 = 50;
const CACHE_KEY: &str = "kkbox";
const SERVICE: &str = "KKBOX";

pub struct KkboxClient {
    client: Client,
    api_url: String,
    credentials: ClientCredentials,
}

impl KkboxClient {
    pub fn new(client_id: &str, client_secret: &str, cache: Arc<TokenCache>) -> Result<Self> {
        let credentials = ClientCredentials::new(
            SERVICE,
            CACHE_KEY,
            KKBOX_TOKEN_URL,
            client_id,
            client_secret,
            cache,
        )?;

        let client = Client::builder()
            .user_agent(user_agent())
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: KKBOX_API_URL.to_string(),
            credentials,
        })
    }

    pub fn new_shared(
        client_id: &str,
        client_secret: &str,
        cache: Arc<TokenCache>,
    ) -> Result<Arc<Self>> {
        Ok(Arc::new(Self::new(client_id, client_secret, cache)?))
    }

    pub fn with_urls(mut self, api_url: impl Into<String>, token_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self.credentials.set_token_url(token_url);
        self
    }

    async fn get_with_params<T, P>(&self, path: &str, params: &[P]) -> Result<Option<T>>
    where
        T: for<'de> Deserialize<'de>,
        P: Serialize,
    {
        let url = format!("{}{}", self.api_url, path);

        let response = self
            .credentials
            .send(&self.client, path, |token| {
                self.client.get(&url).bearer_auth(token).query(params)
            })
            .await?;

        decode_optional(SERVICE, path, response).await
    }
}

#[async_trait]
impl KkboxCatalog for KkboxClient {
    async fn search_by_isrc(&self, isrc: &str) -> Result<Option<KkboxTrack>> {
        tracing::debug!(isrc = %isrc, "Searching KKBOX by ISRC");

        let params = [
            ("q", isrc.to_string()),
            ("type", "track".to_string()),
            ("territory", TERRITORY.to_string()),
            ("limit", "1".to_string()),
        ];

        let response: Option<KkSearchResponse> = self.get_with_params("/search", &params).await?;

        Ok(response
            .and_then(|r| r.tracks.data.into_iter().next())
            .map(KkboxTrack::from))
    }

    async fn recommended_tracks(&self, track_id: &str) -> Result<Vec<KkboxTrack>> {
        tracing::debug!(track_id = %track_id, "Fetching KKBOX related tracks");

        let params = [
            ("territory", TERRITORY.to_string()),
            ("limit", RELATED_LIMIT.to_string()),
        ];

        let response: Option<KkPage> = self
            .get_with_params(&format!("/tracks/{}/related-tracks", track_id), &params)
            .await?;

        Ok(response
            .map(|r| r.data.into_iter().map(KkboxTrack::from).collect())
            .unwrap_or_default())
    }

    async fn track_detail(&self, track_id: &str) -> Result<Option<KkboxTrack>> {
        let params = [("territory", TERRITORY)];

        let response: Option<KkTrack> = self
            .get_with_params(&format!("/tracks/{}", track_id), &params)
            .await?;

        Ok(response.map(KkboxTrack::from))
    }
}

// =============================================================================
// Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct KkSearchResponse {
    pub tracks: KkPage,
}

#[derive(Debug, Default, Deserialize)]
pub struct KkPage {
    #[serde(default)]
    pub data: Vec<KkTrack>,
}

#[derive(Debug, Deserialize)]
pub struct KkTrack {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub isrc: Option<String>,
    #[serde(default)]
    pub album: Option<KkAlbum>,
}

#[derive(Debug, Deserialize)]
pub struct KkAlbum {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artist: Option<KkArtist>,
}

#[derive(Debug, Deserialize)]
pub struct KkArtist {
    pub id: String,
    pub name: String,
}

impl From<KkTrack> for KkboxTrack {
    fn from(track: KkTrack) -> Self {
        Self {
            id: track.id,
            name: track.name,
            isrc: track.isrc.filter(|isrc| !isrc.is_empty()),
            artist_name: track
                .album
                .and_then(|album| album.artist)
                .map(|artist| artist.name)
                .unwrap_or_default(),
        }
    }
}
