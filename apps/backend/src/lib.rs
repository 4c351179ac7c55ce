//! Crossfade backend library
//!
//! Music recommendation service that fuses candidates and features from
//! Spotify, KKBOX, Deezer, MusicBrainz, Last.fm and YouTube Music.
//! This library exposes modules for use in integration tests.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod spotify_url;

use config::Config;
use services::{Catalogs, RecommendService, TokenCache};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalogs: Catalogs,
    pub token_cache: Arc<TokenCache>,
    pub recommend_service: Arc<RecommendService>,
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Get a reference to the configured catalogs.
    pub fn catalogs(&self) -> &Catalogs {
        &self.catalogs
    }

    /// Get a reference to the token cache.
    pub fn token_cache(&self) -> &TokenCache {
        &self.token_cache
    }

    /// Get a reference to the recommendation service.
    pub fn recommend_service(&self) -> &RecommendService {
        &self.recommend_service
    }

    /// Get the start time of the application.
    pub fn start_time(&self) -> std::time::Instant {
        self.start_time
    }
}
