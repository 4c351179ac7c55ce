//! Liveness endpoint.

use axum::{extract::State, response::Json};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub services: ServiceStatus,
}

/// "enabled" or "disabled" per collaborator.
#[derive(Debug, Serialize)]
pub struct ServiceStatus {
    pub spotify: &'static str,
    pub kkbox: &'static str,
    pub deezer: &'static str,
    pub musicbrainz: &'static str,
    pub lastfm: &'static str,
    pub youtube_music: &'static str,
    pub redis: &'static str,
}

fn flag(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}

/// GET /healthz
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let catalogs = state.catalogs();

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.start_time().elapsed().as_secs(),
        services: ServiceStatus {
            spotify: flag(true),
            kkbox: flag(true),
            deezer: flag(true),
            musicbrainz: flag(true),
            lastfm: flag(catalogs.lastfm.is_some()),
            youtube_music: flag(catalogs.ytmusic.is_some()),
            redis: flag(state.token_cache().has_shared_store()),
        },
    })
}
