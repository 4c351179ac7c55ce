//! Maps candidates onto Spotify tracks.
//!
//! Candidates with an ISRC are looked up directly. The rest go through a
//! search cascade that loosens the query step by step.

use futures::stream::{self, StreamExt};
use tokio::time::{timeout_at, Instant};

use super::aggregator::Candidate;
use crate::error::Result;
use crate::services::catalog::SpotifyCatalog;
use track_affinity::text::{fuzzy_match_artist, sanitize, simplify};
use track_affinity::Track;

/// Results requested for free-text searches.
const FREE_TEXT_LIMIT: u32 = 5;

/// Shortest simplified title worth searching for.
const MIN_SIMPLIFIED_CHARS: usize = 3;

/// Resolve candidates with at most `concurrency` lookups in flight.
///
/// Tracks resolved before the deadline are kept; lookups still running at
/// the deadline are dropped.
pub async fn resolve_all(
    spotify: &dyn SpotifyCatalog,
    candidates: Vec<Candidate>,
    concurrency: usize,
    deadline: Instant,
) -> Vec<Track> {
    let total = candidates.len();

    let mut lookups = stream::iter(candidates)
        .map(|candidate| async move {
            match resolve(spotify, &candidate).await {
                Ok(found) => found,
                Err(e) => {
                    tracing::debug!(
                        candidate = %candidate.name,
                        source = %candidate.source,
                        error = %e,
                        "Candidate lookup failed"
                    );
                    None
                }
            }
        })
        .buffer_unordered(concurrency.max(1));

    let mut resolved = Vec::new();
    loop {
        match timeout_at(deadline, lookups.next()).await {
            Ok(Some(Some(track))) => resolved.push(track),
            Ok(Some(None)) => {}
            Ok(None) => break,
            Err(_) => {
                tracing::warn!(resolved = resolved.len(), total, "Resolution hit the deadline");
                break;
            }
        }
    }

    tracing::debug!(resolved = resolved.len(), total, "Resolved candidates");
    resolved
}

/// Resolve one candidate, by ISRC when it has one.
pub async fn resolve(spotify: &dyn SpotifyCatalog, candidate: &Candidate) -> Result<Option<Track>> {
    match candidate.isrc.as_deref().filter(|isrc| !isrc.is_empty()) {
        Some(isrc) => {
            let found = spotify.track_by_isrc(isrc).await?;
            // A search hit must carry the ISRC it was found by
            Ok(found.filter(|track| {
                track
                    .isrc()
                    .is_some_and(|found| found.eq_ignore_ascii_case(isrc))
            }))
        }
        None => Ok(search_by_name(spotify, &candidate.name, &candidate.artist).await),
    }
}

/// Search Spotify by title and artist.
///
/// 1. `track:<title> artist:<artist>`
/// 2. the same with the simplified title
/// 3. free text `<artist> <title>`, preferring a matching first artist
/// 4. free text with the simplified title
///
/// A step that fails counts as a miss and the next one runs.
pub async fn search_by_name(spotify: &dyn SpotifyCatalog, title: &str, artist: &str) -> Option<Track> {
    let clean_title = sanitize(title);
    let clean_artist = sanitize(artist);
    if clean_title.is_empty() {
        return None;
    }

    let simplified = simplify(title);
    let simplified = (simplified.chars().count() >= MIN_SIMPLIFIED_CHARS
        && simplified != clean_title)
        .then_some(simplified);

    let found = fielded_search(spotify, &clean_title, &clean_artist).await;
    if let Some(track) = recovered("fielded", found) {
        return Some(track);
    }

    if let Some(title) = simplified.as_deref() {
        let found = fielded_search(spotify, title, &clean_artist).await;
        if let Some(track) = recovered("fielded simplified", found) {
            return Some(track);
        }
    }

    let found = free_text_search(spotify, &clean_title, &clean_artist).await;
    if let Some(track) = recovered("free text", found) {
        return Some(track);
    }

    match simplified.as_deref() {
        Some(title) => {
            let found = free_text_search(spotify, title, &clean_artist).await;
            recovered("free text simplified", found)
        }
        None => None,
    }
}

fn recovered(step: &'static str, result: Result<Option<Track>>) -> Option<Track> {
    match result {
        Ok(found) => found,
        Err(e) => {
            tracing::debug!(step, error = %e, "Spotify search step failed");
            None
        }
    }
}

async fn fielded_search(spotify: &dyn SpotifyCatalog, title: &str, artist: &str) -> Result<Option<Track>> {
    let query = if artist.is_empty() {
        format!("track:{}", title)
    } else {
        format!("track:{} artist:{}", title, artist)
    };

    Ok(spotify.search_tracks(&query, 1).await?.into_iter().next())
}

async fn free_text_search(spotify: &dyn SpotifyCatalog, title: &str, artist: &str) -> Result<Option<Track>> {
    let query = format!("{} {}", artist, title);
    let results = spotify.search_tracks(query.trim(), FREE_TEXT_LIMIT).await?;

    if artist.is_empty() {
        return Ok(results.into_iter().next());
    }

    let preferred = results
        .iter()
        .position(|track| fuzzy_match_artist(track.primary_artist_name(), artist))
        .unwrap_or(0);

    Ok(results.into_iter().nth(preferred))
}
