//! Track endpoints: fetch, search and KKBOX similar tracks.

use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;

use super::{ApiResponse, Items, TrackResponse, UrlQuery};
use crate::error::{AppError, Result};
use crate::spotify_url;
use crate::AppState;

/// Results returned by a track search.
pub const SEARCH_LIMIT: u32 = 20;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// GET /v1/track/fetch?url=
pub async fn fetch_track(
    State(state): State<AppState>,
    Query(query): Query<UrlQuery>,
) -> Result<Json<ApiResponse<TrackResponse>>> {
    let id = spotify_url::track_id(&query.url)?;
    let track = state.catalogs().spotify.track(&id).await?;

    Ok(ApiResponse::ok(track.into()))
}

/// GET /v1/track/search?q=
pub async fn search_tracks(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Items<TrackResponse>>>> {
    let q = query.q.trim();
    if q.is_empty() {
        return Err(AppError::EmptyQuery);
    }

    let tracks = state.catalogs().spotify.search_tracks(q, SEARCH_LIMIT).await?;

    Ok(ApiResponse::ok(Items {
        items: tracks.into_iter().map(TrackResponse::from).collect(),
    }))
}

/// GET /v1/track/similar?url=
pub async fn similar_tracks(
    State(state): State<AppState>,
    Query(query): Query<UrlQuery>,
) -> Result<Json<ApiResponse<Items<TrackResponse>>>> {
    let id = spotify_url::track_id(&query.url)?;
    let tracks = state.recommend_service().similar_tracks(&id).await?;

    Ok(ApiResponse::ok(Items {
        items: tracks.into_iter().map(TrackResponse::from).collect(),
    }))
}
