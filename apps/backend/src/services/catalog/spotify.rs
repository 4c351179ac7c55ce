//! Spotify Web API client.
//!
//! Authenticates with the client-credentials flow; tokens are cached under
//! the `spotify` key of the shared [`TokenCache`].

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::oauth::ClientCredentials;
use super::{decode_optional, user_agent, SpotifyCatalog, REQUEST_TIMEOUT_SECS};
use crate::error::{AppError, Result};
use crate::services::cache::TokenCache;
use track_affinity::{Album, Artist, Image, SimpleTrack, Track};

const SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";
const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const CACHE_KEY: &str = "spotify";
const SERVICE: &str = "Spotify";

// =============================================================================
// Spotify Client
// =============================================================================

pub struct SpotifyClient {
    client: Client,
    api_url: String,
    credentials: ClientCredentials,
}

impl SpotifyClient {
    /// Create a new Spotify client.
    ///
    /// # Errors
    /// Returns an error if the credentials are empty or the HTTP client
    /// cannot be built.
    pub fn new(client_id: &str, client_secret: &str, cache: Arc<TokenCache>) -> Result<Self> {
        let credentials = ClientCredentials::new(
            SERVICE,
            CACHE_KEY,
            SPOTIFY_TOKEN_URL,
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
            api_url: SPOTIFY_API_URL.to_string(),
            credentials,
        })
    }

    /// Create a new Spotify client wrapped in Arc for shared access.
    pub fn new_shared(
        client_id: &str,
        client_secret: &str,
        cache: Arc<TokenCache>,
    ) -> Result<Arc<Self>> {
        Ok(Arc::new(Self::new(client_id, client_secret, cache)?))
    }

    /// Point the client at other API and token endpoints.
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

    async fn search(&self, query: &str, limit: u32) -> Result<Vec<SpTrack>> {
        tracing::debug!(query = %query, limit, "Searching Spotify tracks");

        let params = [
            ("q", query.to_string()),
            ("type", "track".to_string()),
            ("limit", limit.to_string()),
        ];

        let response: Option<SpSearchResponse> = self.get_with_params("/search", &params).await?;
        Ok(response.map(|r| r.tracks.items).unwrap_or_default())
    }
}

#[async_trait]
impl SpotifyCatalog for SpotifyClient {
    async fn track(&self, id: &str) -> Result<Track> {
        tracing::debug!(id = %id, "Fetching Spotify track");

        let track: Option<SpTrack> = self
            .get_with_params::<_, (&str, &str)>(&format!("/tracks/{}", id), &[])
            .await?;

        track
            .map(Track::from)
            .ok_or_else(|| AppError::NotFound(format!("Spotify track {} not found", id)))
    }

    async fn artist(&self, id: &str) -> Result<Artist> {
        tracing::debug!(id = %id, "Fetching Spotify artist");

        let artist: Option<SpArtist> = self
            .get_with_params::<_, (&str, &str)>(&format!("/artists/{}", id), &[])
            .await?;

        artist
            .map(Artist::from)
            .ok_or_else(|| AppError::NotFound(format!("Spotify artist {} not found", id)))
    }

    async fn album(&self, id: &str) -> Result<Album> {
        tracing::debug!(id = %id, "Fetching Spotify album");

        let album: Option<SpAlbum> = self
            .get_with_params::<_, (&str, &str)>(&format!("/albums/{}", id), &[])
            .await?;

        album
            .map(Album::from)
            .ok_or_else(|| AppError::NotFound(format!("Spotify album {} not found", id)))
    }

    async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<Track>> {
        let items = self.search(query, limit).await?;
        Ok(items.into_iter().map(Track::from).collect())
    }

    async fn track_by_isrc(&self, isrc: &str) -> Result<Option<Track>> {
        let items = self.search(&format!("isrc:{}", isrc), 1).await?;
        Ok(items.into_iter().next().map(Track::from))
    }

    async fn artist_genres(&self, artist_id: &str) -> Result<Vec<String>> {
        let artist: Option<SpArtist> = self
            .get_with_params::<_, (&str, &str)>(&format!("/artists/{}", artist_id), &[])
            .await?;
        Ok(artist.map(|a| a.genres).unwrap_or_default())
    }
}

// =============================================================================
// Response Types
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ExternalUrls {
    #[serde(default)]
    pub spotify: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExternalIds {
    pub isrc: Option<String>,
    pub upc: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SpImage {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SpFollowers {
    pub total: Option<u64>,
}

/// Full or simplified artist object.
#[derive(Debug, Deserialize)]
pub struct SpArtist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    pub followers: Option<SpFollowers>,
    pub popularity: Option<u32>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub images: Vec<SpImage>,
}

/// Track object; `album` is absent on album track listings.
#[derive(Debug, Deserialize)]
pub struct SpTrack {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    #[serde(default)]
    pub external_ids: ExternalIds,
    #[serde(default)]
    pub track_number: u32,
    #[serde(default)]
    pub disc_number: u32,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub explicit: bool,
    pub popularity: Option<u32>,
    #[serde(default)]
    pub artists: Vec<SpArtist>,
    pub album: Option<SpAlbum>,
}

#[derive(Debug, Deserialize)]
pub struct SpPage<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

/// Full or simplified album object.
#[derive(Debug, Deserialize)]
pub struct SpAlbum {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub images: Vec<SpImage>,
    #[serde(default)]
    pub artists: Vec<SpArtist>,
    pub tracks: Option<SpPage<SpTrack>>,
    #[serde(default)]
    pub external_ids: ExternalIds,
    pub popularity: Option<u32>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub total_tracks: u32,
}

#[derive(Debug, Deserialize)]
pub struct SpSearchResponse {
    pub tracks: SpPage<SpTrack>,
}

// =============================================================================
// Conversions
// =============================================================================

fn known_popularity(popularity: Option<u32>) -> Option<u32> {
    popularity.filter(|p| *p > 0)
}

impl From<SpImage> for Image {
    fn from(image: SpImage) -> Self {
        Self {
            url: image.url,
            width: image.width.unwrap_or(0),
            height: image.height.unwrap_or(0),
        }
    }
}

impl From<SpArtist> for Artist {
    fn from(artist: SpArtist) -> Self {
        Self {
            id: artist.id,
            name: artist.name,
            url: artist.external_urls.spotify,
            followers: artist.followers.and_then(|f| f.total),
            popularity: known_popularity(artist.popularity),
            genres: artist.genres,
            images: artist.images.into_iter().map(Image::from).collect(),
        }
    }
}

impl From<SpTrack> for SimpleTrack {
    fn from(track: SpTrack) -> Self {
        Self {
            id: track.id,
            name: track.name,
            url: track.external_urls.spotify,
            track_number: track.track_number,
            duration_ms: track.duration_ms,
            artists: track.artists.into_iter().map(Artist::from).collect(),
        }
    }
}

impl From<SpAlbum> for Album {
    fn from(album: SpAlbum) -> Self {
        Self {
            id: album.id,
            name: album.name,
            url: album.external_urls.spotify,
            release_date: album.release_date,
            images: album.images.into_iter().map(Image::from).collect(),
            artists: album.artists.into_iter().map(Artist::from).collect(),
            tracks: album
                .tracks
                .map(|page| page.items.into_iter().map(SimpleTrack::from).collect())
                .unwrap_or_default(),
            upc: album.external_ids.upc,
            popularity: known_popularity(album.popularity),
            genres: album.genres,
            total_tracks: album.total_tracks,
        }
    }
}

impl From<SpTrack> for Track {
    fn from(track: SpTrack) -> Self {
        Self {
            id: track.id,
            name: track.name,
            url: track.external_urls.spotify,
            isrc: track.external_ids.isrc.filter(|isrc| !isrc.is_empty()),
            track_number: track.track_number,
            disc_number: track.disc_number,
            duration_ms: track.duration_ms,
            explicit: track.explicit,
            popularity: known_popularity(track.popularity),
            artists: track.artists.into_iter().map(Artist::from).collect(),
            album: track.album.map(Album::from).unwrap_or_default(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
