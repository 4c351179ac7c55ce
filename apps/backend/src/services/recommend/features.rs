//! Feature gathering for the seed and for resolved candidates.

use futures::future::join;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use tokio::time::{timeout_at, Instant};

use super::RecommendSettings;
use crate::services::catalog::{Catalogs, DeezerTrack, MusicBrainzRecording, SpotifyCatalog};
use track_affinity::{ArtistInfo, SeedProfile, Track, TrackFeatures};

/// Seed profile with audio features, tags and artist relations.
///
/// Every lookup is best effort; failures leave the matching field unknown.
pub async fn seed_profile(catalogs: &Catalogs, seed: &Track) -> (SeedProfile, Vec<String>) {
    let mut features = TrackFeatures::new(&seed.id);
    features.isrc = seed.isrc().map(str::to_string);

    let mut on_deezer = false;
    if let Some(isrc) = seed.isrc() {
        let (deezer, musicbrainz) = join(
            catalogs.deezer.track_by_isrc(isrc),
            catalogs.musicbrainz.recording_by_isrc(isrc),
        )
        .await;

        match deezer {
            Ok(Some(track)) => {
                apply_deezer(&mut features, &track);
                on_deezer = true;
            }
            Ok(None) => tracing::debug!(isrc = %isrc, "Seed not on Deezer by ISRC"),
            Err(e) => tracing::warn!(isrc = %isrc, error = %e, "Deezer seed lookup failed"),
        }

        match musicbrainz {
            Ok(Some(recording)) => {
                let recording = with_recording_tags(catalogs, recording).await;
                apply_musicbrainz(&mut features, &recording);
            }
            Ok(None) => tracing::debug!(isrc = %isrc, "Seed not on MusicBrainz"),
            Err(e) => tracing::warn!(isrc = %isrc, error = %e, "MusicBrainz seed lookup failed"),
        }

        // Name search only backs up an ISRC miss
        if !on_deezer {
            if let Some(track) = deezer_by_name(catalogs, seed).await {
                apply_deezer(&mut features, &track);
            }
        }
    }

    let mut artist = match features.artist_mbid.as_deref() {
        Some(mbid) => match catalogs.musicbrainz.artist_info(mbid).await {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!(mbid = %mbid, error = %e, "MusicBrainz artist lookup failed");
                None
            }
        },
        None => None,
    };

    let mut genres = Vec::new();
    if let Some(primary) = seed.primary_artist() {
        match catalogs.spotify.artist_genres(&primary.id).await {
            Ok(found) => genres = found,
            Err(e) => {
                tracing::warn!(artist = %primary.id, error = %e, "Spotify artist genres failed")
            }
        }
        features.merge_tags(&genres);

        let info = artist.get_or_insert_with(|| ArtistInfo {
            name: primary.name.clone(),
            ..Default::default()
        });
        info.spotify_id = Some(primary.id.clone()).filter(|id| !id.is_empty());
        if info.mbid.is_none() {
            info.mbid = features.artist_mbid.clone();
        }
    }

    tracing::debug!(
        seed = %seed.id,
        tags = features.tags.len(),
        bpm = ?features.bpm,
        "Seed features gathered"
    );

    let profile = SeedProfile {
        track: seed.clone(),
        features: (!features.is_empty()).then_some(features),
        artist,
    };

    (profile, genres)
}

/// Features of resolved candidates, keyed by track id.
///
/// Deezer audio and Spotify artist genres are fetched concurrently, then the
/// optional MusicBrainz tags. Each batch keeps what it found before the
/// deadline. Tracks with nothing known are left out.
pub async fn candidate_features(
    catalogs: &Catalogs,
    tracks: &[Track],
    settings: &RecommendSettings,
    deadline: Instant,
) -> HashMap<String, TrackFeatures> {
    let isrcs: Vec<String> = tracks
        .iter()
        .filter_map(|t| t.isrc().map(str::to_string))
        .collect();

    let mut artist_ids: Vec<String> = Vec::new();
    let mut seen = HashSet::new();
    for track in tracks {
        if let Some(artist) = track.primary_artist() {
            if !artist.id.is_empty() && seen.insert(artist.id.clone()) {
                artist_ids.push(artist.id.clone());
            }
        }
    }

    let (deezer, genres) = join(
        catalogs
            .deezer
            .tracks_by_isrc_batch(&isrcs, settings.deezer_concurrency, deadline),
        artist_genres_batch(
            catalogs.spotify.as_ref(),
            artist_ids,
            settings.spotify_concurrency,
            deadline,
        ),
    )
    .await;

    let musicbrainz = if settings.candidate_musicbrainz_tags && !isrcs.is_empty() {
        catalogs
            .musicbrainz
            .recordings_by_isrc_batch(&isrcs, deadline)
            .await
    } else {
        HashMap::new()
    };

    tracing::debug!(
        tracks = tracks.len(),
        deezer = deezer.len(),
        musicbrainz = musicbrainz.len(),
        artists = genres.len(),
        "Candidate features gathered"
    );

    let mut by_track = HashMap::new();
    for track in tracks {
        let mut features = TrackFeatures::new(&track.id);
        features.isrc = track.isrc().map(str::to_string);

        if let Some(isrc) = track.isrc() {
            if let Some(found) = deezer.get(isrc) {
                apply_deezer(&mut features, found);
            }
            if let Some(found) = musicbrainz.get(isrc) {
                apply_musicbrainz(&mut features, found);
            }
        }

        if let Some(found) = track.primary_artist().and_then(|a| genres.get(&a.id)) {
            features.merge_tags(found);
        }

        if !features.is_empty() {
            by_track.insert(track.id.clone(), features);
        }
    }

    by_track
}

/// Genres for each artist id, with at most `concurrency` lookups in flight.
async fn artist_genres_batch(
    spotify: &dyn SpotifyCatalog,
    artist_ids: Vec<String>,
    concurrency: usize,
    deadline: Instant,
) -> HashMap<String, Vec<String>> {
    let total = artist_ids.len();
    let mut lookups = stream::iter(artist_ids)
        .map(|id| async move {
            match spotify.artist_genres(&id).await {
                Ok(genres) if !genres.is_empty() => Some((id, genres)),
                Ok(_) => None,
                Err(e) => {
                    tracing::debug!(artist = %id, error = %e, "Artist genre lookup failed");
                    None
                }
            }
        })
        .buffer_unordered(concurrency.max(1));

    let mut genres = HashMap::new();
    loop {
        match timeout_at(deadline, lookups.next()).await {
            Ok(Some(Some((id, found)))) => {
                genres.insert(id, found);
            }
            Ok(Some(None)) => {}
            Ok(None) => break,
            Err(_) => {
                tracing::warn!(found = genres.len(), total, "Artist genre batch hit the deadline");
                break;
            }
        }
    }
    genres
}

/// Deezer search by title and primary artist.
async fn deezer_by_name(catalogs: &Catalogs, seed: &Track) -> Option<DeezerTrack> {
    let artist = seed.primary_artist_name();
    if seed.name.trim().is_empty() || artist.trim().is_empty() {
        return None;
    }

    match catalogs.deezer.search_track(&seed.name, artist).await {
        Ok(found) => found,
        Err(e) => {
            tracing::debug!(seed = %seed.id, error = %e, "Deezer seed search failed");
            None
        }
    }
}

/// ISRC lookups sometimes come back without tags; the recording itself has them.
async fn with_recording_tags(
    catalogs: &Catalogs,
    recording: MusicBrainzRecording,
) -> MusicBrainzRecording {
    if !recording.tags.is_empty() || recording.mbid.is_empty() {
        return recording;
    }

    match catalogs.musicbrainz.recording_with_tags(&recording.mbid).await {
        Ok(Some(full)) => MusicBrainzRecording {
            tags: full.tags,
            artist_mbid: recording.artist_mbid.or(full.artist_mbid),
            ..recording
        },
        Ok(None) => recording,
        Err(e) => {
            tracing::debug!(mbid = %recording.mbid, error = %e, "MusicBrainz recording lookup failed");
            recording
        }
    }
}

fn apply_deezer(features: &mut TrackFeatures, track: &DeezerTrack) {
    features.set_audio(track.bpm, track.duration, track.gain);
}

fn apply_musicbrainz(features: &mut TrackFeatures, recording: &MusicBrainzRecording) {
    features.merge_tags(&recording.tags);
    if features.artist_mbid.is_none() {
        features.artist_mbid = recording.artist_mbid.clone();
    }
}
