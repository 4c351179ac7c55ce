//! Recommendation pipeline.
//!
//! [`RecommendService::recommend`] drives one request through its stages in
//! order: seed fetch, seed features, candidate fan-out, resolution to
//! Spotify, candidate features, genre filter, scoring. The whole call shares
//! one deadline. Only the seed fetch is fatal; every later stage degrades to
//! fewer candidates.

pub mod aggregator;
pub mod features;
pub mod resolver;
pub mod similar;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};

use crate::config::RecommendConfig;
use crate::error::{AppError, Result};
use crate::services::catalog::Catalogs;
use track_affinity::{genre_bonus, RecommendMode, RecommendedTrack, Scorer, SeedProfile, Track, TrackFeatures};

/// Items returned when the caller gives no usable limit.
pub const DEFAULT_LIMIT: usize = 20;

/// Upper bound on returned items.
pub const MAX_LIMIT: usize = 30;

/// Candidates kept by the genre filter.
pub const GENRE_FILTER_CAP: usize = 50;

/// Candidates whose genre bonus falls below this are dropped before scoring.
const MIN_GENRE_BONUS: f64 = 1.0;

/// Tuning knobs of the pipeline.
#[derive(Debug, Clone)]
pub struct RecommendSettings {
    pub timeout: Duration,
    pub spotify_concurrency: usize,
    pub deezer_concurrency: usize,
    pub candidate_musicbrainz_tags: bool,
}

impl Default for RecommendSettings {
    fn default() -> Self {
        Self::from(&RecommendConfig::default())
    }
}

impl From<&RecommendConfig> for RecommendSettings {
    fn from(config: &RecommendConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs),
            spotify_concurrency: config.spotify_concurrency.max(1),
            deezer_concurrency: config.deezer_concurrency.max(1),
            candidate_musicbrainz_tags: config.candidate_musicbrainz_tags,
        }
    }
}

/// Outcome of one recommend call.
#[derive(Debug, Clone)]
pub struct RecommendResult {
    pub seed: SeedProfile,
    /// Spotify genres of the seed's primary artist
    pub seed_genres: Vec<String>,
    /// Sorted by final score, highest first
    pub items: Vec<RecommendedTrack>,
    pub mode: RecommendMode,
}

/// Clamp a requested item count to `[1, MAX_LIMIT]`.
pub fn clamp_limit(limit: usize) -> usize {
    limit.clamp(1, MAX_LIMIT)
}

/// Recommendation pipeline over a set of catalogs.
pub struct RecommendService {
    catalogs: Catalogs,
    settings: RecommendSettings,
}

impl RecommendService {
    pub fn new(catalogs: Catalogs, settings: RecommendSettings) -> Self {
        Self { catalogs, settings }
    }

    /// Create a recommend service wrapped in Arc for shared access.
    pub fn new_shared(catalogs: Catalogs, settings: RecommendSettings) -> Arc<Self> {
        Arc::new(Self::new(catalogs, settings))
    }

    pub fn catalogs(&self) -> &Catalogs {
        &self.catalogs
    }

    pub fn settings(&self) -> &RecommendSettings {
        &self.settings
    }

    /// Recommend up to `limit` tracks for a Spotify seed track.
    ///
    /// # Errors
    /// - `NotFound` when Spotify does not know the seed
    /// - `Timeout` when the deadline passes before the seed is fetched
    /// - an upstream error when the seed fetch fails otherwise
    pub async fn recommend(
        &self,
        seed_id: &str,
        mode: RecommendMode,
        limit: usize,
    ) -> Result<RecommendResult> {
        let limit = clamp_limit(limit);
        let deadline = Instant::now() + self.settings.timeout;

        tracing::info!(seed = %seed_id, mode = %mode, limit, "Recommend request");

        let seed = self.fetch_seed(seed_id, deadline).await?;

        let (profile, seed_genres) =
            match timeout_at(deadline, features::seed_profile(&self.catalogs, &seed)).await {
                Ok(found) => found,
                Err(_) => {
                    tracing::warn!(seed = %seed.id, "Seed features hit the deadline");
                    let profile = SeedProfile {
                        track: seed.clone(),
                        ..Default::default()
                    };
                    (profile, Vec::new())
                }
            };

        let seed_artist_mbid = profile
            .features
            .as_ref()
            .and_then(|f| f.artist_mbid.clone())
            .or_else(|| profile.artist.as_ref().and_then(|a| a.mbid.clone()));

        let candidates = aggregator::gather(
            &self.catalogs,
            &seed,
            seed_artist_mbid.as_deref(),
            deadline,
        )
        .await;

        let mut result = RecommendResult {
            seed: profile,
            seed_genres,
            items: Vec::new(),
            mode,
        };

        if candidates.is_empty() {
            return Ok(result);
        }

        let resolved = resolver::resolve_all(
            self.catalogs.spotify.as_ref(),
            candidates,
            self.settings.spotify_concurrency,
            deadline,
        )
        .await;
        let tracks = unique_excluding_seed(&seed, resolved);

        if tracks.is_empty() {
            return Ok(result);
        }

        let mut features =
            features::candidate_features(&self.catalogs, &tracks, &self.settings, deadline).await;

        let kept = genre_filter(result.seed.tags(), tracks, &features);
        tracing::debug!(seed = %seed.id, kept = kept.len(), "Genre filter applied");

        let scorer = Scorer::new(mode);
        let mut items: Vec<RecommendedTrack> = kept
            .into_iter()
            .map(|track| {
                let found = features.remove(&track.id);
                scorer.score(&result.seed, track, found)
            })
            .collect();

        items.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
        items.truncate(limit);

        tracing::info!(seed = %seed.id, items = items.len(), "Recommend finished");

        result.items = items;
        Ok(result)
    }

    /// Fetch the seed track; the only stage whose failure fails the request.
    pub(crate) async fn fetch_seed(&self, seed_id: &str, deadline: Instant) -> Result<Track> {
        match timeout_at(deadline, self.catalogs.spotify.track(seed_id)).await {
            Ok(Ok(track)) => Ok(track),
            Ok(Err(AppError::NotFound(message))) => Err(AppError::NotFound(message)),
            Ok(Err(e)) if e.is_upstream() => Err(e),
            Ok(Err(e)) => Err(AppError::ServiceUnavailable(format!(
                "Spotify seed fetch failed: {}",
                e
            ))),
            Err(_) => Err(AppError::Timeout(format!(
                "Seed track {} not fetched before the deadline",
                seed_id
            ))),
        }
    }
}

/// Drop the seed and repeats, comparing by track id and by ISRC.
fn unique_excluding_seed(seed: &Track, tracks: Vec<Track>) -> Vec<Track> {
    let mut ids: HashSet<String> = HashSet::from([seed.id.clone()]);
    let mut isrcs: HashSet<String> = seed.isrc().map(str::to_uppercase).into_iter().collect();

    tracks
        .into_iter()
        .filter(|track| {
            if !ids.insert(track.id.clone()) {
                return false;
            }
            match track.isrc() {
                Some(isrc) => isrcs.insert(isrc.to_uppercase()),
                None => true,
            }
        })
        .collect()
}

/// Keep candidates whose genre bonus is at least neutral, up to the cap.
///
/// Without seed tags every candidate is neutral, so the first ones are kept.
fn genre_filter(
    seed_tags: &[String],
    tracks: Vec<Track>,
    features: &HashMap<String, TrackFeatures>,
) -> Vec<Track> {
    let empty: Vec<String> = Vec::new();

    tracks
        .into_iter()
        .filter(|track| {
            let tags = features.get(&track.id).map(|f| &f.tags).unwrap_or(&empty);
            genre_bonus(seed_tags, tags.as_slice()) >= MIN_GENRE_BONUS
        })
        .take(GENRE_FILTER_CAP)
        .collect()
}
