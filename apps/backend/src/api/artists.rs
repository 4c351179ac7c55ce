//! Artist endpoint.

use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Serialize;

use super::{ApiResponse, UrlQuery};
use crate::error::Result;
use crate::spotify_url;
use crate::AppState;
use track_affinity::{Artist, Image};

#[derive(Debug, Serialize)]
pub struct ArtistResponse {
    pub id: String,
    pub name: String,
    pub url: String,
    /// Follower count as a decimal string
    pub followers: String,
    pub genres: Vec<String>,
    pub images: Vec<Image>,
    pub popularity: Option<u32>,
}

impl From<Artist> for ArtistResponse {
    fn from(artist: Artist) -> Self {
        Self {
            id: artist.id,
            name: artist.name,
            url: artist.url,
            followers: artist.followers.unwrap_or(0).to_string(),
            genres: artist.genres,
            images: artist.images,
            popularity: artist.popularity,
        }
    }
}

/// GET /v1/artist/fetch?url=
pub async fn fetch_artist(
    State(state): State<AppState>,
    Query(query): Query<UrlQuery>,
) -> Result<Json<ApiResponse<ArtistResponse>>> {
    let id = spotify_url::artist_id(&query.url)?;
    let artist = state.catalogs().spotify.artist(&id).await?;

    Ok(ApiResponse::ok(artist.into()))
}
