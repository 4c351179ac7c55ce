//! Candidate fan-out across the similarity sources.
//!
//! Every source runs concurrently under the request deadline. A source's
//! candidates are committed to the shared pool the moment it returns, so a
//! deadline that cuts off a slow source keeps what the fast ones found.

use futures::future::{join_all, BoxFuture, FutureExt};
use std::collections::HashSet;
use std::fmt;
use std::sync::Mutex;
use tokio::time::{timeout_at, Instant};

use crate::error::Result;
use crate::services::catalog::{
    Catalogs, KkboxCatalog, LastFmCatalog, MusicBrainzCatalog, YouTubeMusicCatalog,
};
use track_affinity::Track;

pub const KKBOX_LIMIT: usize = 30;
pub const LASTFM_LIMIT: u32 = 30;
pub const MUSICBRAINZ_LIMIT: u32 = 20;
pub const YTMUSIC_LIMIT: u32 = 25;

/// Where a candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
    Kkbox,
    LastFm,
    MusicBrainz,
    YouTubeMusic,
}

impl CandidateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateSource::Kkbox => "kkbox",
            CandidateSource::LastFm => "lastfm",
            CandidateSource::MusicBrainz => "musicbrainz",
            CandidateSource::YouTubeMusic => "ytmusic",
        }
    }
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A track proposed by a source, before it is resolved to Spotify.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub name: String,
    pub artist: String,
    pub isrc: Option<String>,
    pub source: CandidateSource,
}

impl Candidate {
    /// ISRC when known, otherwise the lowercased name and artist.
    pub fn dedup_key(&self) -> String {
        match self.isrc.as_deref().filter(|isrc| !isrc.is_empty()) {
            Some(isrc) => isrc.to_uppercase(),
            None => format!("{}|{}", self.name.to_lowercase(), self.artist.to_lowercase()),
        }
    }
}

#[derive(Default)]
struct PoolInner {
    seen: HashSet<String>,
    candidates: Vec<Candidate>,
}

/// Deduplicated candidates shared by the concurrent sources.
pub struct CandidatePool {
    inner: Mutex<PoolInner>,
}

impl CandidatePool {
    /// The seed ISRC is marked as seen up front.
    pub fn new(seed_isrc: Option<&str>) -> Self {
        let mut inner = PoolInner::default();
        if let Some(isrc) = seed_isrc.filter(|isrc| !isrc.is_empty()) {
            inner.seen.insert(isrc.to_uppercase());
        }
        Self {
            inner: Mutex::new(inner),
        }
    }

    /// Append unseen candidates, returning how many were added.
    pub fn commit(&self, candidates: Vec<Candidate>) -> usize {
        let mut guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let inner = &mut *guard;

        let mut added = 0;
        for candidate in candidates {
            if inner.seen.insert(candidate.dedup_key()) {
                inner.candidates.push(candidate);
                added += 1;
            }
        }
        added
    }

    pub fn len(&self) -> usize {
        match self.inner.lock() {
            Ok(guard) => guard.candidates.len(),
            Err(poisoned) => poisoned.into_inner().candidates.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_candidates(self) -> Vec<Candidate> {
        match self.inner.into_inner() {
            Ok(inner) => inner.candidates,
            Err(poisoned) => poisoned.into_inner().candidates,
        }
    }
}

/// Query every applicable source and pool their candidates.
///
/// Sources that fail or miss the deadline contribute nothing.
pub async fn gather(
    catalogs: &Catalogs,
    seed: &Track,
    seed_artist_mbid: Option<&str>,
    deadline: Instant,
) -> Vec<Candidate> {
    let pool = CandidatePool::new(seed.isrc());
    let artist = seed.primary_artist_name();

    let mut sources: Vec<(CandidateSource, BoxFuture<'_, Result<Vec<Candidate>>>)> = Vec::new();

    if let Some(isrc) = seed.isrc() {
        sources.push((
            CandidateSource::Kkbox,
            from_kkbox(catalogs.kkbox.as_ref(), isrc).boxed(),
        ));
    }

    if let Some(lastfm) = catalogs.lastfm.as_deref() {
        sources.push((
            CandidateSource::LastFm,
            from_lastfm(lastfm, artist, &seed.name).boxed(),
        ));
    }

    if let Some(mbid) = seed_artist_mbid {
        sources.push((
            CandidateSource::MusicBrainz,
            from_musicbrainz(catalogs.musicbrainz.as_ref(), mbid, seed.isrc()).boxed(),
        ));
    }

    if let Some(ytmusic) = catalogs.ytmusic.as_deref() {
        sources.push((
            CandidateSource::YouTubeMusic,
            from_ytmusic(ytmusic, artist, &seed.name).boxed(),
        ));
    }

    if sources.is_empty() {
        tracing::debug!(seed = %seed.id, "No candidate source applies to seed");
        return Vec::new();
    }

    let pool_ref = &pool;
    let runs = sources.into_iter().map(|(source, fetch)| async move {
        match timeout_at(deadline, fetch).await {
            Ok(Ok(candidates)) => {
                let found = candidates.len();
                let added = pool_ref.commit(candidates);
                tracing::debug!(source = %source, found, added, "Candidate source finished");
            }
            Ok(Err(e)) => {
                tracing::warn!(source = %source, error = %e, "Candidate source failed");
            }
            Err(_) => {
                tracing::warn!(source = %source, "Candidate source hit the deadline");
            }
        }
    });

    join_all(runs).await;

    let candidates = pool.into_candidates();
    tracing::info!(seed = %seed.id, count = candidates.len(), "Gathered candidates");
    candidates
}

async fn from_kkbox(kkbox: &dyn KkboxCatalog, isrc: &str) -> Result<Vec<Candidate>> {
    let Some(found) = kkbox.search_by_isrc(isrc).await? else {
        tracing::debug!(isrc = %isrc, "Seed not on KKBOX");
        return Ok(Vec::new());
    };

    let related = kkbox.recommended_tracks(&found.id).await?;

    Ok(related
        .into_iter()
        .take(KKBOX_LIMIT)
        .map(|track| Candidate {
            name: track.name,
            artist: track.artist_name,
            isrc: track.isrc,
            source: CandidateSource::Kkbox,
        })
        .collect())
}

async fn from_lastfm(lastfm: &dyn LastFmCatalog, artist: &str, name: &str) -> Result<Vec<Candidate>> {
    let similar = lastfm.similar_tracks(artist, name, LASTFM_LIMIT).await?;

    Ok(similar
        .into_iter()
        .map(|track| Candidate {
            name: track.name,
            artist: track.artist_name,
            isrc: None,
            source: CandidateSource::LastFm,
        })
        .collect())
}

async fn from_musicbrainz(
    musicbrainz: &dyn MusicBrainzCatalog,
    artist_mbid: &str,
    seed_isrc: Option<&str>,
) -> Result<Vec<Candidate>> {
    let recordings = musicbrainz
        .artist_recordings(artist_mbid, MUSICBRAINZ_LIMIT)
        .await?;

    Ok(recordings
        .into_iter()
        .filter_map(|recording| {
            let isrc = recording.isrc?;
            if seed_isrc.is_some_and(|seed| seed.eq_ignore_ascii_case(&isrc)) {
                return None;
            }
            Some(Candidate {
                name: recording.title,
                artist: recording.artist_name,
                isrc: Some(isrc),
                source: CandidateSource::MusicBrainz,
            })
        })
        .collect())
}

async fn from_ytmusic(
    ytmusic: &dyn YouTubeMusicCatalog,
    artist: &str,
    name: &str,
) -> Result<Vec<Candidate>> {
    let query = format!("{} {}", artist, name);
    let Some(seed_video) = ytmusic.search(query.trim(), 1).await?.into_iter().next() else {
        return Ok(Vec::new());
    };

    let similar = ytmusic.similar(&seed_video.video_id, YTMUSIC_LIMIT).await?;

    Ok(similar
        .into_iter()
        .filter(|track| track.video_id != seed_video.video_id)
        .map(|track| Candidate {
            name: track.title,
            artist: track.artist,
            isrc: None,
            source: CandidateSource::YouTubeMusic,
        })
        .collect())
}
