//! API endpoint handlers for the crossfade backend.

pub mod albums;
pub mod artists;
pub mod health;
pub mod recommend;
pub mod tracks;

use axum::{response::Json, routing::get, Router};
use serde::{Deserialize, Serialize};

use crate::AppState;
use track_affinity::{Artist, Image, Track};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let v1 = Router::new()
        .route("/track/fetch", get(tracks::fetch_track))
        .route("/track/search", get(tracks::search_tracks))
        .route("/track/similar", get(tracks::similar_tracks))
        .route("/track/recommend", get(recommend::recommend_tracks))
        .route("/artist/fetch", get(artists::fetch_artist))
        .route("/album/fetch", get(albums::fetch_album));

    Router::new()
        .route("/healthz", get(health::health_check))
        .nest("/v1", v1)
        .with_state(state)
}

// =============================================================================
// Shared Request/Response Types
// =============================================================================

/// Success envelope: `{"status": 200, "result": ...}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub result: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(result: T) -> Json<Self> {
        Json(Self {
            status: 200,
            result,
        })
    }
}

/// `?url=` of the fetch endpoints.
#[derive(Debug, Deserialize)]
pub struct UrlQuery {
    #[serde(default)]
    pub url: String,
}

/// List result: `{"items": [...]}`.
#[derive(Debug, Serialize)]
pub struct Items<T> {
    pub items: Vec<T>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtistRef {
    pub id: String,
    pub name: String,
    pub url: String,
}

impl From<&Artist> for ArtistRef {
    fn from(artist: &Artist) -> Self {
        Self {
            id: artist.id.clone(),
            name: artist.name.clone(),
            url: artist.url.clone(),
        }
    }
}

/// Album as embedded in a track.
#[derive(Debug, Clone, Serialize)]
pub struct AlbumRef {
    pub id: String,
    pub name: String,
    pub url: String,
    pub release_date: String,
    pub images: Vec<Image>,
    pub artists: Vec<ArtistRef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackResponse {
    pub id: String,
    pub name: String,
    pub url: String,
    pub isrc: Option<String>,
    pub track_number: u32,
    pub disc_number: u32,
    pub duration_ms: u64,
    pub explicit: bool,
    pub popularity: Option<u32>,
    pub artists: Vec<ArtistRef>,
    pub album: AlbumRef,
}

impl From<&Track> for AlbumRef {
    fn from(track: &Track) -> Self {
        let album = &track.album;
        Self {
            id: album.id.clone(),
            name: album.name.clone(),
            url: album.url.clone(),
            release_date: album.release_date.clone(),
            images: album.images.clone(),
            artists: album.artists.iter().map(ArtistRef::from).collect(),
        }
    }
}

impl From<Track> for TrackResponse {
    fn from(track: Track) -> Self {
        let album = AlbumRef::from(&track);
        let artists = track.artists.iter().map(ArtistRef::from).collect();
        Self {
            isrc: track.isrc().map(str::to_string),
            id: track.id,
            name: track.name,
            url: track.url,
            track_number: track.track_number,
            disc_number: track.disc_number,
            duration_ms: track.duration_ms,
            explicit: track.explicit,
            popularity: track.popularity,
            artists,
            album,
        }
    }
}
