//! Extraction of Spotify resource ids from user-supplied URLs.
//!
//! Accepts both `open.spotify.com` share links (optionally with an
//! `intl-xx/` locale segment) and `api.spotify.com/v1` URLs.

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

/// Kind of Spotify resource a URL should point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Track,
    Artist,
    Album,
}

impl ResourceKind {
    const ALL: [ResourceKind; 3] = [Self::Track, Self::Artist, Self::Album];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Track => "track",
            Self::Artist => "artist",
            Self::Album => "album",
        }
    }

    fn open_pattern(&self) -> &'static Regex {
        match self {
            Self::Track => &OPEN_TRACK,
            Self::Artist => &OPEN_ARTIST,
            Self::Album => &OPEN_ALBUM,
        }
    }

    fn api_pattern(&self) -> &'static Regex {
        match self {
            Self::Track => &API_TRACK,
            Self::Artist => &API_ARTIST,
            Self::Album => &API_ALBUM,
        }
    }
}

/// Rejection reasons for the `url` query parameter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UrlError {
    #[error("The url parameter is empty")]
    Empty,

    #[error("Not a Spotify URL")]
    NotSpotify,

    #[error("Spotify URL points at a {found}, expected a {expected}")]
    DifferentResource {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Could not read a Spotify id from the URL")]
    Invalid,
}

impl UrlError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Empty => "EMPTY_PARAM",
            Self::NotSpotify => "NOT_SPOTIFY_URL",
            Self::DifferentResource { .. } => "DIFFERENT_SPOTIFY_URL",
            Self::Invalid => "INVALID_URL",
        }
    }
}

fn open_regex(kind: &str) -> Regex {
    Regex::new(&format!(
        r"open\.spotify\.com/(?:intl-[a-z]{{2}}/)?{}/([A-Za-z0-9]+)",
        kind
    ))
    .expect("valid open.spotify.com pattern")
}

fn api_regex(kind: &str) -> Regex {
    Regex::new(&format!(
        r"api\.spotify\.com/v1/{}s/([A-Za-z0-9]+)",
        kind
    ))
    .expect("valid api.spotify.com pattern")
}

lazy_static! {
    static ref OPEN_TRACK: Regex = open_regex("track");
    static ref OPEN_ARTIST: Regex = open_regex("artist");
    static ref OPEN_ALBUM: Regex = open_regex("album");
    static ref API_TRACK: Regex = api_regex("track");
    static ref API_ARTIST: Regex = api_regex("artist");
    static ref API_ALBUM: Regex = api_regex("album");
}

/// Pull the id of a `kind` resource out of `url`.
pub fn extract_id(url: &str, kind: ResourceKind) -> Result<String, UrlError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(UrlError::Empty);
    }

    if !url.contains("spotify.com") {
        return Err(UrlError::NotSpotify);
    }

    // A URL naming another resource kind is rejected before parsing
    if !url.contains(&format!("/{}", kind.as_str())) {
        if let Some(other) = ResourceKind::ALL
            .iter()
            .filter(|k| **k != kind)
            .find(|k| url.contains(&format!("/{}", k.as_str())))
        {
            return Err(UrlError::DifferentResource {
                expected: kind.as_str(),
                found: other.as_str(),
            });
        }
    }

    kind.open_pattern()
        .captures(url)
        .or_else(|| kind.api_pattern().captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or(UrlError::Invalid)
}

pub fn track_id(url: &str) -> Result<String, UrlError> {
    extract_id(url, ResourceKind::Track)
}

pub fn artist_id(url: &str) -> Result<String, UrlError> {
    extract_id(url, ResourceKind::Artist)
}

pub fn album_id(url: &str) -> Result<String, UrlError> {
    extract_id(url, ResourceKind::Album)
}
