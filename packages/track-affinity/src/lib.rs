//! Track affinity scoring.
//!
//! Pure, synchronous building blocks for ranking recommendation candidates
//! against a seed track:
//!
//! - [`model`]: catalog-neutral track, artist and feature records
//! - [`genre`]: static genre taxonomy and the pairwise genre bonus
//! - [`franchise`]: anime/game/VTuber series detection from track titles
//! - [`text`]: title sanitizing and fuzzy artist matching for catalog search
//! - [`scoring`]: weighted feature similarity combined with all bonuses
//!
//! Nothing in this crate performs I/O. Callers gather features from external
//! catalogs and hand them to [`scoring::Scorer`].

pub mod franchise;
pub mod genre;
pub mod model;
pub mod scoring;
pub mod text;

pub use genre::{genre_bonus, GenreGroup};
pub use model::{
    Album, Artist, ArtistInfo, ArtistRelation, Image, RecommendMode, RecommendedTrack,
    SimpleTrack, Track, TrackFeatures,
};
pub use scoring::{Scorer, SeedProfile, Weights};
