//! Test infrastructure for crossfade integration tests.
//!
//! Provides a `TestApp` wrapper around `axum_test::TestServer` backed by
//! in-memory catalogs, so tests drive the real router and the real
//! recommendation pipeline without network access.

#![allow(dead_code)]

use async_trait::async_trait;
use axum_test::TestServer;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossfade::config::Config;
use crossfade::error::{AppError, Result};
use crossfade::services::catalog::{
    Catalogs, DeezerCatalog, DeezerTrack, KkboxCatalog, KkboxTrack, LastFmCatalog, LastFmTrack,
    MusicBrainzCatalog, MusicBrainzRecording, SpotifyCatalog, YouTubeMusicCatalog, YtMusicTrack,
};
use crossfade::services::{RecommendService, RecommendSettings, TokenCache};
use crossfade::{api, AppState};
use track_affinity::{Album, Artist, ArtistInfo, Track};

// =============================================================================
// Fake catalogs
// =============================================================================

#[derive(Default)]
pub struct FakeSpotify {
    pub tracks: HashMap<String, Track>,
    pub artists: HashMap<String, Artist>,
    pub albums: HashMap<String, Album>,
    pub genres: HashMap<String, Vec<String>>,
    pub searches: HashMap<String, Vec<Track>>,
    /// Every seed fetch fails with a 503-style error
    pub unavailable: bool,
    pub isrc_lookups: AtomicUsize,
}

impl FakeSpotify {
    pub fn add_track(&mut self, track: Track) {
        self.tracks.insert(track.id.clone(), track);
    }

    pub fn set_genres(&mut self, artist_id: &str, genres: &[&str]) {
        self.genres.insert(
            artist_id.to_string(),
            genres.iter().map(|g| g.to_string()).collect(),
        );
    }
}

#[async_trait]
impl SpotifyCatalog for FakeSpotify {
    async fn track(&self, id: &str) -> Result<Track> {
        if self.unavailable {
            return Err(AppError::ServiceUnavailable("spotify down".to_string()));
        }
        self.tracks
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Track {} not found", id)))
    }

    async fn artist(&self, id: &str) -> Result<Artist> {
        self.artists
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Artist {} not found", id)))
    }

    async fn album(&self, id: &str) -> Result<Album> {
        self.albums
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Album {} not found", id)))
    }

    async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<Track>> {
        Ok(self
            .searches
            .get(query)
            .map(|tracks| tracks.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default())
    }

    async fn track_by_isrc(&self, isrc: &str) -> Result<Option<Track>> {
        self.isrc_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .tracks
            .values()
            .find(|track| track.isrc() == Some(isrc))
            .cloned())
    }

    async fn artist_genres(&self, artist_id: &str) -> Result<Vec<String>> {
        Ok(self.genres.get(artist_id).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct FakeKkbox {
    pub by_isrc: HashMap<String, KkboxTrack>,
    pub related: HashMap<String, Vec<KkboxTrack>>,
    pub details: HashMap<String, KkboxTrack>,
    /// Every ISRC search fails
    pub failing: bool,
}

#[async_trait]
impl KkboxCatalog for FakeKkbox {
    async fn search_by_isrc(&self, isrc: &str) -> Result<Option<KkboxTrack>> {
        if self.failing {
            return Err(AppError::ServiceUnavailable("kkbox down".to_string()));
        }
        Ok(self.by_isrc.get(isrc).cloned())
    }

    async fn recommended_tracks(&self, track_id: &str) -> Result<Vec<KkboxTrack>> {
        Ok(self.related.get(track_id).cloned().unwrap_or_default())
    }

    async fn track_detail(&self, track_id: &str) -> Result<Option<KkboxTrack>> {
        Ok(self.details.get(track_id).cloned())
    }
}

#[derive(Default)]
pub struct FakeDeezer {
    pub tracks: HashMap<String, DeezerTrack>,
    /// Keyed by `title|artist`
    pub searches: HashMap<String, DeezerTrack>,
}

impl FakeDeezer {
    pub fn add(&mut self, isrc: &str, bpm: f64, duration: u32, gain: f64) {
        self.tracks.insert(
            isrc.to_string(),
            DeezerTrack {
                isrc: Some(isrc.to_string()),
                bpm,
                duration,
                gain,
                ..Default::default()
            },
        );
    }
}

#[async_trait]
impl DeezerCatalog for FakeDeezer {
    async fn track_by_isrc(&self, isrc: &str) -> Result<Option<DeezerTrack>> {
        Ok(self.tracks.get(isrc).cloned())
    }

    async fn search_track(&self, title: &str, artist: &str) -> Result<Option<DeezerTrack>> {
        Ok(self.searches.get(&format!("{}|{}", title, artist)).cloned())
    }
}

#[derive(Default)]
pub struct FakeMusicBrainz {
    pub recordings: HashMap<String, MusicBrainzRecording>,
    pub artists: HashMap<String, ArtistInfo>,
    pub artist_recordings: HashMap<String, Vec<MusicBrainzRecording>>,
    /// Full recordings by MBID, when they differ from the ISRC lookup
    pub by_mbid: HashMap<String, MusicBrainzRecording>,
    /// ISRC lookups that take this long before answering
    pub slow_isrcs: HashMap<String, Duration>,
}

impl FakeMusicBrainz {
    pub fn add_recording(&mut self, isrc: &str, tags: &[&str], artist_mbid: Option<&str>) {
        self.recordings.insert(
            isrc.to_string(),
            MusicBrainzRecording {
                mbid: format!("rec-{}", isrc),
                isrc: Some(isrc.to_string()),
                artist_mbid: artist_mbid.map(str::to_string),
                tags: tags.iter().map(|t| t.to_string()).collect(),
                ..Default::default()
            },
        );
    }
}

#[async_trait]
impl MusicBrainzCatalog for FakeMusicBrainz {
    async fn recording_by_isrc(&self, isrc: &str) -> Result<Option<MusicBrainzRecording>> {
        if let Some(delay) = self.slow_isrcs.get(isrc) {
            tokio::time::sleep(*delay).await;
        }
        Ok(self.recordings.get(isrc).cloned())
    }

    async fn artist_info(&self, mbid: &str) -> Result<Option<ArtistInfo>> {
        Ok(self.artists.get(mbid).cloned())
    }

    async fn artist_recordings(
        &self,
        mbid: &str,
        limit: u32,
    ) -> Result<Vec<MusicBrainzRecording>> {
        Ok(self
            .artist_recordings
            .get(mbid)
            .map(|r| r.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default())
    }

    async fn recording_with_tags(&self, mbid: &str) -> Result<Option<MusicBrainzRecording>> {
        if let Some(found) = self.by_mbid.get(mbid) {
            return Ok(Some(found.clone()));
        }
        Ok(self.recordings.values().find(|r| r.mbid == mbid).cloned())
    }
}

#[derive(Default)]
pub struct FakeLastFm {
    pub similar: Vec<LastFmTrack>,
    /// Wait this long before answering
    pub delay: Option<Duration>,
}

#[async_trait]
impl LastFmCatalog for FakeLastFm {
    async fn similar_tracks(
        &self,
        _artist: &str,
        _track: &str,
        limit: u32,
    ) -> Result<Vec<LastFmTrack>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.similar.iter().take(limit as usize).cloned().collect())
    }
}

#[derive(Default)]
pub struct FakeYtMusic {
    pub searches: HashMap<String, Vec<YtMusicTrack>>,
    pub similar: HashMap<String, Vec<YtMusicTrack>>,
    /// `(query, limit)` of every search
    pub search_calls: Mutex<Vec<(String, u32)>>,
}

#[async_trait]
impl YouTubeMusicCatalog for FakeYtMusic {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<YtMusicTrack>> {
        if let Ok(mut calls) = self.search_calls.lock() {
            calls.push((query.to_string(), limit));
        }
        Ok(self
            .searches
            .get(query)
            .map(|tracks| tracks.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default())
    }

    async fn similar(&self, video_id: &str, limit: u32) -> Result<Vec<YtMusicTrack>> {
        Ok(self
            .similar
            .get(video_id)
            .map(|tracks| tracks.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default())
    }
}

/// Contents of every fake catalog for one test.
#[derive(Default)]
pub struct Fixture {
    pub spotify: FakeSpotify,
    pub kkbox: FakeKkbox,
    pub deezer: FakeDeezer,
    pub musicbrainz: FakeMusicBrainz,
    pub lastfm: Option<FakeLastFm>,
    pub ytmusic: Option<Arc<FakeYtMusic>>,
}

// =============================================================================
// Builders
// =============================================================================

/// A Spotify track with one artist.
pub fn track(id: &str, name: &str, artist_id: &str, artist: &str, isrc: Option<&str>) -> Track {
    Track {
        id: id.to_string(),
        name: name.to_string(),
        url: format!("https://open.spotify.com/track/{}", id),
        isrc: isrc.map(str::to_string),
        track_number: 1,
        disc_number: 1,
        duration_ms: 240_000,
        artists: vec![Artist::reference(
            artist_id,
            artist,
            format!("https://open.spotify.com/artist/{}", artist_id),
        )],
        album: Album {
            id: format!("album-{}", id),
            name: format!("{} (Single)", name),
            release_date: "2020-01-01".to_string(),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn kkbox_track(id: &str, name: &str, artist: &str, isrc: Option<&str>) -> KkboxTrack {
    KkboxTrack {
        id: id.to_string(),
        name: name.to_string(),
        isrc: isrc.map(str::to_string),
        artist_name: artist.to_string(),
    }
}

pub fn video(video_id: &str, title: &str, artist: &str) -> YtMusicTrack {
    YtMusicTrack {
        video_id: video_id.to_string(),
        title: title.to_string(),
        artist: artist.to_string(),
        ..Default::default()
    }
}

pub fn track_url(id: &str) -> String {
    format!("https://open.spotify.com/track/{}", id)
}

// =============================================================================
// Test application
// =============================================================================

/// Test application wrapper around axum_test::TestServer.
pub struct TestApp {
    server: TestServer,
    spotify: Arc<FakeSpotify>,
}

impl TestApp {
    /// Create a test application with empty catalogs.
    pub async fn new() -> Self {
        Self::with_fixture(Fixture::default()).await
    }

    /// Create a test application over the given catalog contents.
    pub async fn with_fixture(fixture: Fixture) -> Self {
        Self::with_settings(fixture, RecommendSettings::default()).await
    }

    /// Create a test application with explicit pipeline settings.
    pub async fn with_settings(fixture: Fixture, settings: RecommendSettings) -> Self {
        let spotify = Arc::new(fixture.spotify);

        let catalogs = Catalogs {
            spotify: spotify.clone(),
            kkbox: Arc::new(fixture.kkbox),
            deezer: Arc::new(fixture.deezer),
            musicbrainz: Arc::new(fixture.musicbrainz),
            lastfm: fixture
                .lastfm
                .map(|lastfm| Arc::new(lastfm) as Arc<dyn LastFmCatalog>),
            ytmusic: fixture
                .ytmusic
                .map(|ytmusic| ytmusic as Arc<dyn YouTubeMusicCatalog>),
        };

        let state = AppState {
            config: Arc::new(Config::default()),
            catalogs: catalogs.clone(),
            token_cache: TokenCache::new_shared(None),
            recommend_service: RecommendService::new_shared(catalogs, settings),
            start_time: std::time::Instant::now(),
        };

        let server = TestServer::new(api::router(state)).expect("Failed to create test server");

        Self { server, spotify }
    }

    /// Get a reference to the test server.
    ///
    /// ```ignore
    /// let response = app.server().get("/healthz").await;
    /// ```
    pub fn server(&self) -> &TestServer {
        &self.server
    }

    /// Spotify ISRC lookups made so far.
    pub fn spotify_isrc_lookups(&self) -> usize {
        self.spotify.isrc_lookups.load(Ordering::SeqCst)
    }

    /// GET /v1/track/recommend for a seed id.
    pub async fn recommend(&self, seed_id: &str, mode: Option<&str>) -> serde_json::Value {
        let mut request = self
            .server
            .get("/v1/track/recommend")
            .add_query_param("url", track_url(seed_id));
        if let Some(mode) = mode {
            request = request.add_query_param("mode", mode);
        }

        let response = request.await;
        response.assert_status_ok();
        response.json()
    }
}
