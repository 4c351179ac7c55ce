//! Album endpoint.

use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Serialize;

use super::{ApiResponse, ArtistRef, Items, UrlQuery};
use crate::error::Result;
use crate::spotify_url;
use crate::AppState;
use track_affinity::{Album, Image, SimpleTrack};

#[derive(Debug, Serialize)]
pub struct AlbumResponse {
    pub id: String,
    pub name: String,
    pub url: String,
    pub release_date: String,
    pub images: Vec<Image>,
    pub artists: Vec<ArtistRef>,
    pub tracks: Items<AlbumTrack>,
    pub popularity: Option<u32>,
    pub upc: Option<String>,
    pub genres: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AlbumTrack {
    pub id: String,
    pub name: String,
    pub url: String,
    pub track_number: u32,
    pub duration_ms: u64,
    pub artists: Vec<ArtistRef>,
}

impl From<SimpleTrack> for AlbumTrack {
    fn from(track: SimpleTrack) -> Self {
        Self {
            artists: track.artists.iter().map(ArtistRef::from).collect(),
            id: track.id,
            name: track.name,
            url: track.url,
            track_number: track.track_number,
            duration_ms: track.duration_ms,
        }
    }
}

impl From<Album> for AlbumResponse {
    fn from(album: Album) -> Self {
        Self {
            artists: album.artists.iter().map(ArtistRef::from).collect(),
            tracks: Items {
                items: album.tracks.into_iter().map(AlbumTrack::from).collect(),
            },
            id: album.id,
            name: album.name,
            url: album.url,
            release_date: album.release_date,
            images: album.images,
            popularity: album.popularity,
            upc: album.upc,
            genres: album.genres,
        }
    }
}

/// GET /v1/album/fetch?url=
pub async fn fetch_album(
    State(state): State<AppState>,
    Query(query): Query<UrlQuery>,
) -> Result<Json<ApiResponse<AlbumResponse>>> {
    let id = spotify_url::album_id(&query.url)?;
    let album = state.catalogs().spotify.album(&id).await?;

    Ok(ApiResponse::ok(album.into()))
}
