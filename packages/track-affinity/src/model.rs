//! Catalog-neutral music records.
//!
//! Every adapter in the service converts its own JSON into these types, so the
//! scorer never sees a catalog-specific shape.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cover or profile image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

/// Artist as reported by a catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    /// Catalog-specific identifier
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub followers: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub popularity: Option<u32>,
    /// Free-form lowercase genre tokens
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<Image>,
}

impl Artist {
    /// Minimal artist reference with only identity fields set.
    pub fn reference(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Track listing entry embedded in an album.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimpleTrack {
    pub id: String,
    pub name: String,
    pub url: String,
    pub track_number: u32,
    pub duration_ms: u64,
    pub artists: Vec<Artist>,
}

/// Album with optional listing and catalog metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub name: String,
    pub url: String,
    pub release_date: String,
    pub images: Vec<Image>,
    pub artists: Vec<Artist>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tracks: Vec<SimpleTrack>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub popularity: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,
    #[serde(default)]
    pub total_tracks: u32,
}

/// Unified track identity.
///
/// When present, the ISRC is the key used to match the same recording across
/// catalogs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub url: String,
    pub isrc: Option<String>,
    pub track_number: u32,
    pub disc_number: u32,
    pub duration_ms: u64,
    pub explicit: bool,
    pub popularity: Option<u32>,
    pub artists: Vec<Artist>,
    pub album: Album,
}

impl Track {
    /// First credited artist, if any.
    pub fn primary_artist(&self) -> Option<&Artist> {
        self.artists.first()
    }

    /// Name of the first credited artist, or an empty string.
    pub fn primary_artist_name(&self) -> &str {
        self.primary_artist().map(|a| a.name.as_str()).unwrap_or("")
    }

    /// ISRC if present and non-empty.
    pub fn isrc(&self) -> Option<&str> {
        self.isrc.as_deref().filter(|isrc| !isrc.is_empty())
    }
}

/// Per-track features gathered from Deezer, MusicBrainz and Spotify.
///
/// Each field is individually optional; a zero BPM, zero gain or zero
/// duration from a catalog means "unknown" and is stored as `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackFeatures {
    pub track_id: String,
    pub isrc: Option<String>,
    pub bpm: Option<f64>,
    pub duration_seconds: Option<u32>,
    pub gain: Option<f64>,
    pub tags: Vec<String>,
    pub artist_mbid: Option<String>,
}

impl TrackFeatures {
    pub fn new(track_id: impl Into<String>) -> Self {
        Self {
            track_id: track_id.into(),
            ..Default::default()
        }
    }

    /// Record the audio measurements of a catalog, treating zeros as unknown.
    pub fn set_audio(&mut self, bpm: f64, duration_seconds: u32, gain: f64) {
        self.bpm = (bpm > 0.0).then_some(bpm);
        self.duration_seconds = (duration_seconds > 0).then_some(duration_seconds);
        self.gain = (gain != 0.0).then_some(gain);
    }

    /// Append tags in order, lowercased, skipping blanks and duplicates.
    pub fn merge_tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for tag in tags {
            let tag = tag.as_ref().trim().to_lowercase();
            if !tag.is_empty() && !self.tags.contains(&tag) {
                self.tags.push(tag);
            }
        }
    }

    /// True when no measurement or tag is known.
    pub fn is_empty(&self) -> bool {
        self.bpm.is_none()
            && self.duration_seconds.is_none()
            && self.gain.is_none()
            && self.tags.is_empty()
    }
}

/// A typed relation from an artist to another artist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistRelation {
    #[serde(rename = "type")]
    pub relation_type: String,
    pub target_mbid: String,
    pub target_name: String,
}

impl ArtistRelation {
    pub fn new(
        relation_type: impl Into<String>,
        target_mbid: impl Into<String>,
        target_name: impl Into<String>,
    ) -> Self {
        Self {
            relation_type: relation_type.into(),
            target_mbid: target_mbid.into(),
            target_name: target_name.into(),
        }
    }
}

/// Extended artist profile joining Spotify and MusicBrainz identities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtistInfo {
    pub spotify_id: Option<String>,
    pub mbid: Option<String>,
    pub name: String,
    pub tags: Vec<String>,
    pub relations: Vec<ArtistRelation>,
}

/// Ranking strategy selected by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendMode {
    /// Favour close audio measurements
    Similar,
    /// Favour shared tags and genres
    Related,
    #[default]
    Balanced,
}

impl RecommendMode {
    /// Parse a mode name; anything unrecognised becomes `Balanced`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "similar" => Self::Similar,
            "related" => Self::Related,
            _ => Self::Balanced,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Similar => "similar",
            Self::Related => "related",
            Self::Balanced => "balanced",
        }
    }
}

impl fmt::Display for RecommendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scored candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendedTrack {
    pub track: Track,
    /// Weighted feature similarity in [0, 1]
    pub similarity_score: f64,
    /// Product of every multiplicative bonus
    pub bonus: f64,
    /// `similarity_score * bonus`
    pub final_score: f64,
    pub match_reasons: Vec<String>,
    pub features: Option<TrackFeatures>,
}
