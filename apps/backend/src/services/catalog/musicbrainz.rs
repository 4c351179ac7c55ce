//! MusicBrainz service client.
//!
//! Provides ISRC lookups, artist relations and artist recording browsing.
//! Includes rate limiting to comply with MusicBrainz's 1 request/second limit.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::{decode_optional, transport_error, MusicBrainzCatalog, MusicBrainzRecording, REQUEST_TIMEOUT_SECS};
use crate::error::{AppError, Result};
use track_affinity::{ArtistInfo, ArtistRelation};

const MB_BASE_URL: &str = "https://musicbrainz.org/ws/2";
const SERVICE: &str = "MusicBrainz";
const DEFAULT_BROWSE_LIMIT: u32 = 25;
const MAX_BROWSE_LIMIT: u32 = 100;

// =============================================================================
// Rate Limiter
// =============================================================================

/// Rate limiter to enforce MusicBrainz's 1 request per second limit.
///
/// Dropping a `wait` future gives up the slot without touching the clock.
pub(crate) struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval,
        }
    }

    /// Wait until the rate limit allows another request.
    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

// =============================================================================
// MusicBrainz Client
// =============================================================================

/// MusicBrainz API client.
pub struct MusicBrainzClient {
    client: Client,
    base_url: String,
    rate_limiter: RateLimiter,
}

impl MusicBrainzClient {
    /// Create a new MusicBrainz client.
    ///
    /// MusicBrainz requires a proper User-Agent header with application name,
    /// version, and contact information.
    ///
    /// # Arguments
    /// * `app_name` - Application name (e.g., "crossfade")
    /// * `app_version` - Application version (e.g., "0.1.0")
    /// * `contact` - Contact email or URL
    /// * `rate_limit_ms` - Minimum interval between requests in milliseconds
    ///
    /// # Errors
    /// Returns an error if any of the required parameters are empty or if the
    /// rate limit is too high (max 60000ms).
    pub fn new(
        app_name: &str,
        app_version: &str,
        contact: &str,
        rate_limit_ms: u64,
    ) -> Result<Self> {
        for (field, value) in [
            ("app name", app_name),
            ("app version", app_version),
            ("contact information", contact),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::Internal(format!(
                    "MusicBrainz {} cannot be empty",
                    field
                )));
            }
        }

        if rate_limit_ms < 1000 {
            tracing::warn!(
                "Rate limit {}ms is below MusicBrainz minimum of 1000ms, this may result in rate limiting",
                rate_limit_ms
            );
        }

        if rate_limit_ms > 60_000 {
            return Err(AppError::Internal(format!(
                "Rate limit {}ms is unreasonably high (max 60000ms)",
                rate_limit_ms
            )));
        }

        let user_agent = format!("{}/{} ({})", app_name, app_version, contact);

        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: MB_BASE_URL.to_string(),
            rate_limiter: RateLimiter::new(Duration::from_millis(rate_limit_ms)),
        })
    }

    /// Create a new MusicBrainz client wrapped in Arc for shared access.
    pub fn new_shared(
        app_name: &str,
        app_version: &str,
        contact: &str,
        rate_limit_ms: u64,
    ) -> Result<Arc<Self>> {
        Ok(Arc::new(Self::new(
            app_name,
            app_version,
            contact,
            rate_limit_ms,
        )?))
    }

    pub fn with_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// GET with query parameters after waiting for the rate limiter.
    async fn get_with_params<T>(&self, path: &str, params: &[(&str, String)]) -> Result<Option<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        self.rate_limiter.wait().await;

        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(params)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, path, e))?;

        decode_optional(SERVICE, path, response).await
    }
}

#[async_trait]
impl MusicBrainzCatalog for MusicBrainzClient {
    async fn recording_by_isrc(&self, isrc: &str) -> Result<Option<MusicBrainzRecording>> {
        tracing::debug!(isrc = %isrc, "Looking up MusicBrainz recording by ISRC");

        let params = [
            ("inc", "recordings+artists+tags".to_string()),
            ("fmt", "json".to_string()),
        ];

        let response: Option<MbIsrcResponse> = self
            .get_with_params(&format!("/isrc/{}", isrc), &params)
            .await?;

        Ok(response
            .and_then(|r| r.recordings.into_iter().next())
            .map(|recording| recording.into_recording(Some(isrc.to_string()))))
    }

    async fn artist_info(&self, mbid: &str) -> Result<Option<ArtistInfo>> {
        tracing::debug!(mbid = %mbid, "Fetching MusicBrainz artist relations");

        let params = [
            ("inc", "tags+artist-rels".to_string()),
            ("fmt", "json".to_string()),
        ];

        let response: Option<MbArtistDetails> = self
            .get_with_params(&format!("/artist/{}", mbid), &params)
            .await?;

        Ok(response.map(ArtistInfo::from))
    }

    async fn artist_recordings(
        &self,
        mbid: &str,
        limit: u32,
    ) -> Result<Vec<MusicBrainzRecording>> {
        if mbid.trim().is_empty() {
            return Err(AppError::BadRequest("Artist MBID is required".to_string()));
        }

        let limit = match limit {
            0 => DEFAULT_BROWSE_LIMIT,
            n => n.min(MAX_BROWSE_LIMIT),
        };

        let params = [
            ("artist", mbid.to_string()),
            ("inc", "isrcs+tags".to_string()),
            ("limit", limit.to_string()),
            ("fmt", "json".to_string()),
        ];

        let response: Option<MbBrowseRecordings> =
            self.get_with_params("/recording", &params).await?;

        let recordings: Vec<MusicBrainzRecording> = response
            .map(|r| r.recordings)
            .unwrap_or_default()
            .into_iter()
            .map(|recording| {
                let isrc = recording.isrcs.first().cloned();
                let mut converted = recording.into_recording(isrc);
                converted.artist_mbid = Some(mbid.to_string());
                converted
            })
            .collect();

        tracing::debug!(mbid = %mbid, count = recordings.len(), "MusicBrainz artist recordings");
        Ok(recordings)
    }

    async fn recording_with_tags(&self, mbid: &str) -> Result<Option<MusicBrainzRecording>> {
        let params = [
            ("inc", "tags+artists+isrcs".to_string()),
            ("fmt", "json".to_string()),
        ];

        let response: Option<MbRecording> = self
            .get_with_params(&format!("/recording/{}", mbid), &params)
            .await?;

        Ok(response.map(|recording| {
            let isrc = recording.isrcs.first().cloned();
            recording.into_recording(isrc)
        }))
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// Response of the ISRC lookup.
#[derive(Debug, Deserialize)]
pub struct MbIsrcResponse {
    #[serde(default)]
    pub isrc: String,
    #[serde(default)]
    pub recordings: Vec<MbRecording>,
}

/// Response of the recording browse request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MbBrowseRecordings {
    /// Total recordings credited to the artist
    #[serde(default)]
    pub recording_count: u32,
    #[serde(default)]
    pub recordings: Vec<MbRecording>,
}

/// Recording (unique performance).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MbRecording {
    /// MusicBrainz ID (UUID)
    pub id: String,
    /// Recording title
    pub title: String,
    /// Recording length in milliseconds
    pub length: Option<u64>,
    /// Artist credits for this recording
    #[serde(default)]
    pub artist_credit: Vec<ArtistCredit>,
    /// Folksonomy tags
    #[serde(default)]
    pub tags: Vec<MbTag>,
    /// ISRCs, present when requested with `inc=isrcs`
    #[serde(default)]
    pub isrcs: Vec<String>,
}

impl MbRecording {
    fn into_recording(self, isrc: Option<String>) -> MusicBrainzRecording {
        let (artist_mbid, artist_name) = match self.artist_credit.into_iter().next() {
            Some(credit) => (Some(credit.artist.id), credit.artist.name),
            None => (None, String::new()),
        };

        MusicBrainzRecording {
            mbid: self.id,
            title: self.title,
            isrc: isrc.filter(|isrc| !isrc.is_empty()),
            length_ms: self.length,
            artist_mbid,
            artist_name,
            tags: sorted_tag_names(self.tags),
        }
    }
}

/// Artist credit for a recording.
#[derive(Debug, Deserialize)]
pub struct ArtistCredit {
    /// The artist
    pub artist: MbArtistRef,
    /// Credited name, may differ from the artist name
    #[serde(default)]
    pub name: Option<String>,
    /// Join phrase to next artist (e.g., " & ", " feat. ")
    pub joinphrase: Option<String>,
}

/// Minimal artist reference.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MbArtistRef {
    /// MusicBrainz ID (UUID)
    pub id: String,
    /// Artist name
    pub name: String,
    /// Sort name
    pub sort_name: Option<String>,
}

/// Tag with its vote count.
#[derive(Debug, Deserialize)]
pub struct MbTag {
    pub name: String,
    #[serde(default)]
    pub count: i64,
}

/// Artist with tags and relations.
#[derive(Debug, Deserialize)]
pub struct MbArtistDetails {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<MbTag>,
    #[serde(default)]
    pub relations: Vec<MbRelation>,
}

/// Relation to another entity; `artist` is set for artist-to-artist relations.
#[derive(Debug, Deserialize)]
pub struct MbRelation {
    #[serde(rename = "type")]
    pub relation_type: String,
    /// "forward" or "backward"
    pub direction: Option<String>,
    pub artist: Option<MbArtistRef>,
}

impl From<MbArtistDetails> for ArtistInfo {
    fn from(artist: MbArtistDetails) -> Self {
        Self {
            spotify_id: None,
            mbid: Some(artist.id),
            name: artist.name,
            tags: sorted_tag_names(artist.tags),
            relations: artist
                .relations
                .into_iter()
                .filter_map(|rel| {
                    let target = rel.artist?;
                    Some(ArtistRelation::new(rel.relation_type, target.id, target.name))
                })
                .collect(),
        }
    }
}

/// Tag names ordered by vote count, highest first.
fn sorted_tag_names(mut tags: Vec<MbTag>) -> Vec<String> {
    tags.sort_by(|a, b| b.count.cmp(&a.count));
    tags.into_iter().map(|t| t.name).collect()
}

// =============================================================================
// Tests
// =============================================================================
