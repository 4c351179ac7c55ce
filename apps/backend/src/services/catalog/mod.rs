//! External music catalogs.
//!
//! Each catalog is a trait so the pipeline can run against any implementation;
//! every trait has exactly one HTTP client in production. Clients depend on
//! the [`TokenCache`](crate::services::TokenCache) at most, never on each other.

pub mod deezer;
pub mod kkbox;
pub mod lastfm;
pub mod musicbrainz;
pub mod oauth;
pub mod spotify;
pub mod ytmusic;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::{header::RETRY_AFTER, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::{timeout_at, Instant};

use crate::error::{AppError, Result};
use track_affinity::{Album, Artist, ArtistInfo, Track};

pub use deezer::DeezerClient;
pub use kkbox::KkboxClient;
pub use lastfm::LastFmClient;
pub use musicbrainz::MusicBrainzClient;
pub use spotify::SpotifyClient;
pub use ytmusic::YouTubeMusicClient;

pub(crate) const REQUEST_TIMEOUT_SECS: u64 = 30;

/// User agent sent by every catalog client.
pub(crate) fn user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

// =============================================================================
// Catalog records
// =============================================================================

/// Track as known to KKBOX.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KkboxTrack {
    pub id: String,
    pub name: String,
    pub isrc: Option<String>,
    pub artist_name: String,
}

/// Track as known to Deezer, including its audio measurements.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeezerTrack {
    pub id: u64,
    pub title: String,
    pub isrc: Option<String>,
    /// Seconds
    pub duration: u32,
    /// Zero when unknown
    pub bpm: f64,
    /// Zero when unknown
    pub gain: f64,
    pub explicit: bool,
    pub artist_id: u64,
    pub artist_name: String,
}

/// Recording as known to MusicBrainz.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MusicBrainzRecording {
    pub mbid: String,
    pub title: String,
    pub isrc: Option<String>,
    pub length_ms: Option<u64>,
    pub artist_mbid: Option<String>,
    pub artist_name: String,
    /// Sorted by vote count, highest first
    pub tags: Vec<String>,
}

/// Similar track reported by Last.fm.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LastFmTrack {
    pub name: String,
    pub mbid: Option<String>,
    /// Similarity in [0, 1]
    pub match_score: f64,
    pub url: String,
    pub artist_name: String,
    pub artist_mbid: Option<String>,
}

/// Track returned by the YouTube Music sidecar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YtMusicTrack {
    pub video_id: String,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub artist_id: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub album_id: Option<String>,
    #[serde(default)]
    pub duration_seconds: Option<u32>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub is_explicit: bool,
}

// =============================================================================
// Catalog traits
// =============================================================================

/// Spotify Web API.
#[async_trait]
pub trait SpotifyCatalog: Send + Sync {
    /// Fetch a track. Unknown ids are `AppError::NotFound`.
    async fn track(&self, id: &str) -> Result<Track>;

    async fn artist(&self, id: &str) -> Result<Artist>;

    async fn album(&self, id: &str) -> Result<Album>;

    async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<Track>>;

    /// First track carrying `isrc`, if any.
    async fn track_by_isrc(&self, isrc: &str) -> Result<Option<Track>>;

    /// Genres of an artist; empty when the artist is unknown.
    async fn artist_genres(&self, artist_id: &str) -> Result<Vec<String>>;
}

/// KKBOX Open API.
#[async_trait]
pub trait KkboxCatalog: Send + Sync {
    async fn search_by_isrc(&self, isrc: &str) -> Result<Option<KkboxTrack>>;

    async fn recommended_tracks(&self, track_id: &str) -> Result<Vec<KkboxTrack>>;

    async fn track_detail(&self, track_id: &str) -> Result<Option<KkboxTrack>>;
}

/// Deezer public API.
#[async_trait]
pub trait DeezerCatalog: Send + Sync {
    async fn track_by_isrc(&self, isrc: &str) -> Result<Option<DeezerTrack>>;

    async fn search_track(&self, title: &str, artist: &str) -> Result<Option<DeezerTrack>>;

    /// Look up many ISRCs with at most `concurrency` requests in flight.
    ///
    /// Misses and failures are left out of the result. Lookups still running
    /// at the deadline are dropped; finished ones are kept.
    async fn tracks_by_isrc_batch(
        &self,
        isrcs: &[String],
        concurrency: usize,
        deadline: Instant,
    ) -> HashMap<String, DeezerTrack> {
        let mut lookups = stream::iter(isrcs.iter().cloned())
            .map(|isrc| async move {
                match self.track_by_isrc(&isrc).await {
                    Ok(found) => found.map(|track| (isrc, track)),
                    Err(e) => {
                        tracing::debug!(isrc = %isrc, error = %e, "Deezer ISRC lookup failed");
                        None
                    }
                }
            })
            .buffer_unordered(concurrency.max(1));

        let mut found = HashMap::new();
        loop {
            match timeout_at(deadline, lookups.next()).await {
                Ok(Some(Some((isrc, track)))) => {
                    found.insert(isrc, track);
                }
                Ok(Some(None)) => {}
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(found = found.len(), total = isrcs.len(), "Deezer batch hit the deadline");
                    break;
                }
            }
        }
        found
    }
}

/// MusicBrainz web service.
#[async_trait]
pub trait MusicBrainzCatalog: Send + Sync {
    async fn recording_by_isrc(&self, isrc: &str) -> Result<Option<MusicBrainzRecording>>;

    /// Artist profile with its artist-to-artist relations.
    async fn artist_info(&self, mbid: &str) -> Result<Option<ArtistInfo>>;

    /// Recordings credited to an artist. `limit` is capped at 100.
    async fn artist_recordings(
        &self,
        mbid: &str,
        limit: u32,
    ) -> Result<Vec<MusicBrainzRecording>>;

    async fn recording_with_tags(&self, mbid: &str) -> Result<Option<MusicBrainzRecording>>;

    /// Look up many ISRCs one after another.
    ///
    /// Stops at the deadline and returns what was found by then.
    async fn recordings_by_isrc_batch(
        &self,
        isrcs: &[String],
        deadline: Instant,
    ) -> HashMap<String, MusicBrainzRecording> {
        let mut found = HashMap::new();
        for isrc in isrcs {
            match timeout_at(deadline, self.recording_by_isrc(isrc)).await {
                Ok(Ok(Some(recording))) => {
                    found.insert(isrc.clone(), recording);
                }
                Ok(Ok(None)) => {}
                Ok(Err(e)) => {
                    tracing::debug!(isrc = %isrc, error = %e, "MusicBrainz ISRC lookup failed");
                }
                Err(_) => {
                    tracing::warn!(found = found.len(), total = isrcs.len(), "MusicBrainz batch hit the deadline");
                    break;
                }
            }
        }
        found
    }
}

/// Last.fm similar-track API.
#[async_trait]
pub trait LastFmCatalog: Send + Sync {
    async fn similar_tracks(
        &self,
        artist: &str,
        track: &str,
        limit: u32,
    ) -> Result<Vec<LastFmTrack>>;
}

/// YouTube Music sidecar service.
#[async_trait]
pub trait YouTubeMusicCatalog: Send + Sync {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<YtMusicTrack>>;

    async fn similar(&self, video_id: &str, limit: u32) -> Result<Vec<YtMusicTrack>>;
}

/// The catalogs a request may consult. Last.fm and YouTube Music are optional.
#[derive(Clone)]
pub struct Catalogs {
    pub spotify: Arc<dyn SpotifyCatalog>,
    pub kkbox: Arc<dyn KkboxCatalog>,
    pub deezer: Arc<dyn DeezerCatalog>,
    pub musicbrainz: Arc<dyn MusicBrainzCatalog>,
    pub lastfm: Option<Arc<dyn LastFmCatalog>>,
    pub ytmusic: Option<Arc<dyn YouTubeMusicCatalog>>,
}

// =============================================================================
// Response handling shared by the HTTP clients
// =============================================================================

/// Map a non-success status to the matching error.
///
/// 404 is not handled here; callers decide whether it means `None` or
/// `NotFound`.
pub(crate) fn status_error(service: &str, path: &str, response: &Response) -> AppError {
    let status = response.status();

    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(1);
            AppError::RateLimited(retry_after)
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Unauthorized(service.to_string()),
        _ => AppError::ServiceUnavailable(format!(
            "{} {} returned error status: {}",
            service, path, status
        )),
    }
}

/// Decode a JSON body, treating 404 as `None`.
pub(crate) async fn decode_optional<T>(service: &str, path: &str, response: Response) -> Result<Option<T>>
where
    T: for<'de> Deserialize<'de>,
{
    let status = response.status();

    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }

    if !status.is_success() {
        return Err(status_error(service, path, &response));
    }

    response.json::<T>().await.map(Some).map_err(|e| {
        AppError::ServiceUnavailable(format!(
            "Failed to parse {} response from {}: {}",
            service, path, e
        ))
    })
}

/// Map a transport failure.
pub(crate) fn transport_error(service: &str, path: &str, e: reqwest::Error) -> AppError {
    AppError::ServiceUnavailable(format!("{} request to {} failed: {}", service, path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingDeezer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DeezerCatalog for CountingDeezer {
        async fn track_by_isrc(&self, isrc: &str) -> Result<Option<DeezerTrack>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match isrc {
                "FAIL" => Err(AppError::ServiceUnavailable("down".to_string())),
                "MISS" => Ok(None),
                _ => Ok(Some(DeezerTrack {
                    isrc: Some(isrc.to_string()),
                    bpm: 120.0,
                    ..Default::default()
                })),
            }
        }

        async fn search_track(&self, _title: &str, _artist: &str) -> Result<Option<DeezerTrack>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_deezer_batch_skips_misses_and_failures() {
        let deezer = CountingDeezer {
            calls: AtomicUsize::new(0),
        };
        let isrcs: Vec<String> = ["A", "MISS", "FAIL", "B"].iter().map(|s| s.to_string()).collect();

        let deadline = Instant::now() + Duration::from_secs(5);
        let found = deezer.tracks_by_isrc_batch(&isrcs, 2, deadline).await;

        assert_eq!(deezer.calls.load(Ordering::SeqCst), 4);
        assert_eq!(found.len(), 2);
        assert!(found.contains_key("A"));
        assert!(found.contains_key("B"));
    }

    /// One rate-limited request per second, like the real client.
    struct SlowMusicBrainz;

    #[async_trait]
    impl MusicBrainzCatalog for SlowMusicBrainz {
        async fn recording_by_isrc(&self, isrc: &str) -> Result<Option<MusicBrainzRecording>> {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(Some(MusicBrainzRecording {
                isrc: Some(isrc.to_string()),
                tags: vec!["anime".to_string()],
                ..Default::default()
            }))
        }

        async fn artist_info(&self, _mbid: &str) -> Result<Option<ArtistInfo>> {
            Ok(None)
        }

        async fn artist_recordings(
            &self,
            _mbid: &str,
            _limit: u32,
        ) -> Result<Vec<MusicBrainzRecording>> {
            Ok(Vec::new())
        }

        async fn recording_with_tags(&self, _mbid: &str) -> Result<Option<MusicBrainzRecording>> {
            Ok(None)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_musicbrainz_batch_keeps_results_at_deadline() {
        let isrcs: Vec<String> = (1..=40).map(|i| format!("JPAB000000{:02}", i)).collect();
        let deadline = Instant::now() + Duration::from_millis(2500);

        let found = SlowMusicBrainz.recordings_by_isrc_batch(&isrcs, deadline).await;

        assert_eq!(found.len(), 2);
        assert!(found.contains_key("JPAB00000001"));
        assert!(found.contains_key("JPAB00000002"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deezer_batch_keeps_results_at_deadline() {
        struct SlowDeezer;

        #[async_trait]
        impl DeezerCatalog for SlowDeezer {
            async fn track_by_isrc(&self, isrc: &str) -> Result<Option<DeezerTrack>> {
                let delay = if isrc == "SLOW" { 60 } else { 1 };
                tokio::time::sleep(Duration::from_secs(delay)).await;
                Ok(Some(DeezerTrack::default()))
            }

            async fn search_track(&self, _title: &str, _artist: &str) -> Result<Option<DeezerTrack>> {
                Ok(None)
            }
        }

        let isrcs: Vec<String> = ["A", "SLOW", "B"].iter().map(|s| s.to_string()).collect();
        let deadline = Instant::now() + Duration::from_secs(10);

        let found = SlowDeezer.tracks_by_isrc_batch(&isrcs, 3, deadline).await;

        assert_eq!(found.len(), 2);
        assert!(!found.contains_key("SLOW"));
    }

    #[test]
    fn test_user_agent() {
        assert!(user_agent().starts_with("crossfade/"));
    }
}
