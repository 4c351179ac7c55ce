//! KKBOX-only similar tracks.
//!
//! Unlike [`RecommendService::recommend`] this performs no scoring: the seed
//! is located on KKBOX by ISRC, KKBOX's related tracks are mapped back to
//! Spotify by ISRC, and the result is ordered by popularity.

use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use tokio::time::{timeout_at, Instant};

use super::{RecommendService, MAX_LIMIT};
use crate::error::{AppError, Result};
use crate::services::catalog::KkboxTrack;
use track_affinity::Track;

impl RecommendService {
    /// Tracks KKBOX relates to the seed, as Spotify tracks.
    ///
    /// # Errors
    /// - `IsrcNotFound` when the seed has no ISRC
    /// - `NotFound` when KKBOX does not know the seed
    pub async fn similar_tracks(&self, seed_id: &str) -> Result<Vec<Track>> {
        let deadline = Instant::now() + self.settings.timeout;
        let seed = self.fetch_seed(seed_id, deadline).await?;

        match timeout_at(deadline, self.kkbox_similar(&seed)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout(format!(
                "Similar tracks for {} not gathered before the deadline",
                seed.id
            ))),
        }
    }

    async fn kkbox_similar(&self, seed: &Track) -> Result<Vec<Track>> {
        let isrc = seed.isrc().ok_or(AppError::IsrcNotFound)?;

        let kkbox = self.catalogs.kkbox.as_ref();
        let found = kkbox
            .search_by_isrc(isrc)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No KKBOX track for ISRC {}", isrc)))?;

        let related = kkbox.recommended_tracks(&found.id).await?;
        tracing::debug!(seed = %seed.id, related = related.len(), "KKBOX related tracks");

        let concurrency = self.settings.spotify_concurrency;

        // Related listings may omit ISRCs; the track detail carries them
        let isrcs: Vec<String> = stream::iter(related)
            .map(|track| async move { self.isrc_of(track).await })
            .buffer_unordered(concurrency)
            .filter_map(|isrc| async move { isrc })
            .collect()
            .await;

        let spotify = self.catalogs.spotify.as_ref();
        let resolved: Vec<Track> = stream::iter(isrcs)
            .map(|isrc| async move {
                match spotify.track_by_isrc(&isrc).await {
                    Ok(found) => found,
                    Err(e) => {
                        tracing::debug!(isrc = %isrc, error = %e, "Spotify ISRC lookup failed");
                        None
                    }
                }
            })
            .buffer_unordered(concurrency)
            .filter_map(|track| async move { track })
            .collect()
            .await;

        let mut seen = HashSet::from([seed.id.clone()]);
        let mut tracks: Vec<Track> = resolved
            .into_iter()
            .filter(|track| seen.insert(track.id.clone()))
            .collect();

        tracks.sort_by(|a, b| b.popularity.unwrap_or(0).cmp(&a.popularity.unwrap_or(0)));
        tracks.truncate(MAX_LIMIT);

        Ok(tracks)
    }

    async fn isrc_of(&self, track: KkboxTrack) -> Option<String> {
        if track.isrc.is_some() {
            return track.isrc;
        }

        match self.catalogs.kkbox.track_detail(&track.id).await {
            Ok(detail) => detail.and_then(|d| d.isrc),
            Err(e) => {
                tracing::debug!(track = %track.id, error = %e, "KKBOX track detail failed");
                None
            }
        }
    }
}
