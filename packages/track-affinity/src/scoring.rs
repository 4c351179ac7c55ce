//! Candidate scoring.
//!
//! `final = base_similarity * genre * artist_relation * same_artist * franchise`
//!
//! The base similarity is a weighted mean over the features known on both
//! the seed and the candidate. Every bonus is a multiplicative factor of at
//! least 0.3.

use std::collections::HashSet;

use crate::franchise::{self, FRANCHISE_BONUS};
use crate::genre::{common_tags, genre_bonus};
use crate::model::{ArtistInfo, RecommendMode, RecommendedTrack, Track, TrackFeatures};

/// Base similarity when no feature is known on both sides.
pub const NEUTRAL_SIMILARITY: f64 = 0.5;
/// Factor when a candidate shares an artist with the seed.
pub const SAME_ARTIST_BONUS: f64 = 2.5;

const MAX_BPM: f64 = 250.0;
const MAX_DURATION_DIFF: f64 = 600.0;
const MAX_GAIN_DIFF: f64 = 20.0;

const SIMILAR_BPM_DELTA: f64 = 15.0;
const SIMILAR_DURATION_DELTA: u32 = 30;
const SIMILAR_GAIN_DELTA: f64 = 3.0;

const SAME_ARTIST_IDENTITY: f64 = 1.5;
const GROUP_RELATION: f64 = 1.3;
const VOICE_RELATION: f64 = 1.2;
const COLLABORATION_RELATION: f64 = 1.2;

const GROUP_TYPES: &[&str] = &["member of band", "member of"];
const VOICE_TYPES: &[&str] = &["voice actor", "vocal"];
const COLLABORATION_TYPES: &[&str] = &["collaboration", "collaborator"];

// =============================================================================
// Weights
// =============================================================================

/// Per-feature weights of the base similarity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    pub bpm: f64,
    pub duration: f64,
    pub gain: f64,
    pub tags: f64,
}

impl Weights {
    pub fn for_mode(mode: RecommendMode) -> Self {
        match mode {
            RecommendMode::Similar => Self {
                bpm: 2.0,
                duration: 0.8,
                gain: 1.5,
                tags: 1.0,
            },
            RecommendMode::Related => Self {
                bpm: 0.5,
                duration: 0.3,
                gain: 0.5,
                tags: 3.0,
            },
            RecommendMode::Balanced => Self {
                bpm: 1.5,
                duration: 0.5,
                gain: 1.2,
                tags: 2.0,
            },
        }
    }
}

// =============================================================================
// Scorer
// =============================================================================

/// Everything known about the seed track.
#[derive(Debug, Clone, Default)]
pub struct SeedProfile {
    pub track: Track,
    pub features: Option<TrackFeatures>,
    pub artist: Option<ArtistInfo>,
}

impl SeedProfile {
    /// Fused seed tags, empty when no features are known.
    pub fn tags(&self) -> &[String] {
        self.features.as_ref().map(|f| f.tags.as_slice()).unwrap_or(&[])
    }
}

/// Mode-parameterized candidate scorer.
#[derive(Debug, Clone, Copy)]
pub struct Scorer {
    weights: Weights,
}

impl Scorer {
    pub fn new(mode: RecommendMode) -> Self {
        Self::with_weights(Weights::for_mode(mode))
    }

    pub fn with_weights(weights: Weights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> Weights {
        self.weights
    }

    /// Weighted mean of per-feature similarities over features known on both sides.
    pub fn base_similarity(
        &self,
        seed: Option<&TrackFeatures>,
        candidate: Option<&TrackFeatures>,
    ) -> f64 {
        let (Some(seed), Some(candidate)) = (seed, candidate) else {
            return NEUTRAL_SIMILARITY;
        };

        let mut weighted_sum = 0.0;
        let mut total_weight = 0.0;

        if let (Some(a), Some(b)) = (seed.bpm, candidate.bpm) {
            weighted_sum += self.weights.bpm * bpm_similarity(a, b);
            total_weight += self.weights.bpm;
        }

        if let (Some(a), Some(b)) = (seed.duration_seconds, candidate.duration_seconds) {
            weighted_sum += self.weights.duration * duration_similarity(a, b);
            total_weight += self.weights.duration;
        }

        if let (Some(a), Some(b)) = (seed.gain, candidate.gain) {
            weighted_sum += self.weights.gain * gain_similarity(a, b);
            total_weight += self.weights.gain;
        }

        if !seed.tags.is_empty() && !candidate.tags.is_empty() {
            weighted_sum += self.weights.tags * tag_similarity(&seed.tags, &candidate.tags);
            total_weight += self.weights.tags;
        }

        if total_weight == 0.0 {
            return NEUTRAL_SIMILARITY;
        }

        weighted_sum / total_weight
    }

    /// Score one candidate against the seed.
    pub fn score(
        &self,
        seed: &SeedProfile,
        candidate: Track,
        features: Option<TrackFeatures>,
    ) -> RecommendedTrack {
        let seed_features = seed.features.as_ref();
        let base = self.base_similarity(seed_features, features.as_ref());
        let mut reasons = feature_reasons(seed_features, features.as_ref());

        let candidate_tags = features.as_ref().map(|f| f.tags.as_slice()).unwrap_or(&[]);
        let genre = genre_bonus(seed.tags(), candidate_tags);
        if genre > 1.0 {
            reasons.push("genre_match".to_string());
        }

        let relation = match (&seed.artist, candidate_artist_info(&candidate, features.as_ref())) {
            (Some(seed_artist), Some(candidate_artist)) => {
                artist_relation_bonus(seed_artist, &candidate_artist)
            }
            _ => 1.0,
        };
        if relation > 1.0 {
            reasons.push("artist_relation".to_string());
        }

        let same_artist = if shares_artist(&seed.track, &candidate) {
            reasons.push("same_artist".to_string());
            SAME_ARTIST_BONUS
        } else {
            1.0
        };

        let series = match franchise::shared_franchise(&seed.track.name, &candidate.name) {
            Some(found) => {
                reasons.push(format!("same_series:{}", found.name));
                FRANCHISE_BONUS
            }
            None => 1.0,
        };

        let bonus = genre * relation * same_artist * series;

        RecommendedTrack {
            track: candidate,
            similarity_score: base,
            bonus,
            final_score: base * bonus,
            match_reasons: reasons,
            features,
        }
    }
}

// =============================================================================
// Feature similarities
// =============================================================================

pub fn bpm_similarity(a: f64, b: f64) -> f64 {
    (1.0 - (a - b).abs() / MAX_BPM).clamp(0.0, 1.0)
}

pub fn duration_similarity(a: u32, b: u32) -> f64 {
    let diff = (f64::from(a) - f64::from(b)).abs().min(MAX_DURATION_DIFF);
    1.0 - diff / MAX_DURATION_DIFF
}

pub fn gain_similarity(a: f64, b: f64) -> f64 {
    let diff = (a - b).abs().min(MAX_GAIN_DIFF);
    1.0 - diff / MAX_GAIN_DIFF
}

/// Jaccard index of two tag sets; 0.5 when both are empty.
pub fn tag_similarity<A: AsRef<str>, B: AsRef<str>>(a: &[A], b: &[B]) -> f64 {
    let set_a: HashSet<String> = a.iter().map(|t| t.as_ref().to_lowercase()).collect();
    let set_b: HashSet<String> = b.iter().map(|t| t.as_ref().to_lowercase()).collect();

    let union = set_a.union(&set_b).count();
    if union == 0 {
        return NEUTRAL_SIMILARITY;
    }

    set_a.intersection(&set_b).count() as f64 / union as f64
}

/// Match reasons contributed by audio measurements and shared tags.
pub fn feature_reasons(
    seed: Option<&TrackFeatures>,
    candidate: Option<&TrackFeatures>,
) -> Vec<String> {
    let (Some(seed), Some(candidate)) = (seed, candidate) else {
        return Vec::new();
    };

    let mut reasons = Vec::new();

    if let (Some(a), Some(b)) = (seed.bpm, candidate.bpm) {
        if (a - b).abs() <= SIMILAR_BPM_DELTA {
            reasons.push("similar_bpm".to_string());
        }
    }

    if let (Some(a), Some(b)) = (seed.duration_seconds, candidate.duration_seconds) {
        if a.abs_diff(b) <= SIMILAR_DURATION_DELTA {
            reasons.push("similar_duration".to_string());
        }
    }

    if let (Some(a), Some(b)) = (seed.gain, candidate.gain) {
        if (a - b).abs() <= SIMILAR_GAIN_DELTA {
            reasons.push("similar_loudness".to_string());
        }
    }

    for tag in common_tags(&seed.tags, &candidate.tags) {
        reasons.push(format!("same_tag:{}", tag));
    }

    reasons
}

// =============================================================================
// Artist bonuses
// =============================================================================

/// Whether any candidate artist matches a seed artist by id or case-insensitive name.
pub fn shares_artist(seed: &Track, candidate: &Track) -> bool {
    candidate.artists.iter().any(|c| {
        seed.artists.iter().any(|s| {
            (!s.id.is_empty() && s.id == c.id)
                || (!s.name.is_empty() && s.name.to_lowercase() == c.name.to_lowercase())
        })
    })
}

/// Artist profile of a candidate from its primary artist and features.
///
/// Candidates carry no relations of their own, so only the seed's relations
/// can link the two artists.
pub fn candidate_artist_info(track: &Track, features: Option<&TrackFeatures>) -> Option<ArtistInfo> {
    let artist = track.primary_artist()?;
    Some(ArtistInfo {
        spotify_id: Some(artist.id.clone()).filter(|id| !id.is_empty()),
        mbid: features.and_then(|f| f.artist_mbid.clone()),
        name: artist.name.clone(),
        tags: features.map(|f| f.tags.clone()).unwrap_or_default(),
        relations: Vec::new(),
    })
}

/// Relation factor between two artist profiles.
///
/// - 1.5 same Spotify id or MBID
/// - 1.3 group membership linking the two, or a shared group
/// - 1.2 shared voice actor / vocalist
/// - 1.2 direct collaboration
pub fn artist_relation_bonus(seed: &ArtistInfo, candidate: &ArtistInfo) -> f64 {
    if same_value(&seed.spotify_id, &candidate.spotify_id) || same_value(&seed.mbid, &candidate.mbid)
    {
        return SAME_ARTIST_IDENTITY;
    }

    if points_to(seed, candidate, GROUP_TYPES)
        || points_to(candidate, seed, GROUP_TYPES)
        || shares_target(seed, candidate, GROUP_TYPES)
    {
        return GROUP_RELATION;
    }

    if shares_target(seed, candidate, VOICE_TYPES) {
        return VOICE_RELATION;
    }

    if points_to(seed, candidate, COLLABORATION_TYPES)
        || points_to(candidate, seed, COLLABORATION_TYPES)
    {
        return COLLABORATION_RELATION;
    }

    1.0
}

fn same_value(a: &Option<String>, b: &Option<String>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if !a.is_empty() && a == b)
}

/// `from` has a relation of one of `types` whose target is `to`.
fn points_to(from: &ArtistInfo, to: &ArtistInfo, types: &[&str]) -> bool {
    from.relations
        .iter()
        .filter(|r| types.contains(&r.relation_type.as_str()))
        .any(|r| {
            let by_mbid = matches!(&to.mbid, Some(mbid) if !mbid.is_empty() && *mbid == r.target_mbid);
            let by_name = !to.name.is_empty() && r.target_name.eq_ignore_ascii_case(&to.name);
            by_mbid || by_name
        })
}

/// Both artists have a relation of one of `types` to the same target.
fn shares_target(a: &ArtistInfo, b: &ArtistInfo, types: &[&str]) -> bool {
    let targets: HashSet<String> = a
        .relations
        .iter()
        .filter(|r| types.contains(&r.relation_type.as_str()))
        .flat_map(|r| [r.target_mbid.clone(), r.target_name.to_lowercase()])
        .filter(|t| !t.is_empty())
        .collect();

    b.relations
        .iter()
        .filter(|r| types.contains(&r.relation_type.as_str()))
        .any(|r| {
            (!r.target_mbid.is_empty() && targets.contains(&r.target_mbid))
                || (!r.target_name.is_empty() && targets.contains(&r.target_name.to_lowercase()))
        })
}
