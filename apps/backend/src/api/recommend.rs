//! Recommendation endpoint.

use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};

use super::{AlbumRef, ApiResponse, ArtistRef};
use crate::error::Result;
use crate::services::recommend::{clamp_limit, RecommendResult, DEFAULT_LIMIT};
use crate::spotify_url;
use crate::AppState;
use track_affinity::{RecommendMode, RecommendedTrack, TrackFeatures};

#[derive(Debug, Deserialize)]
pub struct RecommendQuery {
    #[serde(default)]
    pub url: String,
    pub mode: Option<String>,
    /// Kept as text so that garbage falls back to the default
    pub limit: Option<String>,
}

/// Absent or unparseable limits give the default; others are clamped.
pub fn parse_limit(raw: Option<&str>) -> usize {
    match raw.map(str::trim).and_then(|v| v.parse::<i64>().ok()) {
        Some(n) if n < 1 => 1,
        Some(n) => clamp_limit(usize::try_from(n).unwrap_or(usize::MAX)),
        None => DEFAULT_LIMIT,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AudioFeatures {
    pub bpm: Option<f64>,
    pub duration_seconds: Option<u32>,
    pub gain: Option<f64>,
    pub tags: Vec<String>,
}

impl From<TrackFeatures> for AudioFeatures {
    fn from(features: TrackFeatures) -> Self {
        Self {
            bpm: features.bpm,
            duration_seconds: features.duration_seconds,
            gain: features.gain,
            tags: features.tags,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SeedTrack {
    pub id: String,
    pub name: String,
    pub artists: Vec<ArtistRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_features: Option<AudioFeatures>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RecommendItem {
    pub id: String,
    pub name: String,
    pub artists: Vec<ArtistRef>,
    pub album: AlbumRef,
    pub url: String,
    pub isrc: Option<String>,
    pub popularity: Option<u32>,
    pub similarity_score: f64,
    /// Product of every bonus factor
    pub genre_bonus: f64,
    pub final_score: f64,
    pub match_reasons: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_features: Option<AudioFeatures>,
}

impl From<RecommendedTrack> for RecommendItem {
    fn from(item: RecommendedTrack) -> Self {
        let track = item.track;
        Self {
            artists: track.artists.iter().map(ArtistRef::from).collect(),
            album: AlbumRef::from(&track),
            isrc: track.isrc().map(str::to_string),
            id: track.id,
            name: track.name,
            url: track.url,
            popularity: track.popularity,
            similarity_score: item.similarity_score,
            genre_bonus: item.bonus,
            final_score: item.final_score,
            match_reasons: item.match_reasons,
            audio_features: item.features.map(AudioFeatures::from),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub seed_track: SeedTrack,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_features: Option<AudioFeatures>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub seed_genres: Vec<String>,
    pub items: Vec<RecommendItem>,
    pub mode: RecommendMode,
}

impl From<RecommendResult> for RecommendResponse {
    fn from(result: RecommendResult) -> Self {
        let seed = result.seed;
        let seed_features = seed.features.map(AudioFeatures::from);

        Self {
            seed_track: SeedTrack {
                id: seed.track.id.clone(),
                name: seed.track.name.clone(),
                artists: seed.track.artists.iter().map(ArtistRef::from).collect(),
                audio_features: seed_features.clone(),
                genres: result.seed_genres.clone(),
            },
            seed_features,
            seed_genres: result.seed_genres,
            items: result.items.into_iter().map(RecommendItem::from).collect(),
            mode: result.mode,
        }
    }
}

/// GET /v1/track/recommend?url=&mode=&limit=
pub async fn recommend_tracks(
    State(state): State<AppState>,
    Query(query): Query<RecommendQuery>,
) -> Result<Json<ApiResponse<RecommendResponse>>> {
    let id = spotify_url::track_id(&query.url)?;
    let mode = RecommendMode::parse(query.mode.as_deref().unwrap_or_default());
    let limit = parse_limit(query.limit.as_deref());

    let result = state.recommend_service().recommend(&id, mode, limit).await?;

    Ok(ApiResponse::ok(result.into()))
}
