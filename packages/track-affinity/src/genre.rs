//! Genre taxonomy and pairwise genre affinity.
//!
//! Canonical genre strings (as reported by Spotify and MusicBrainz) are
//! bucketed into a handful of coarse groups. Two tag lists are compared first
//! by exact overlap, then by group, then by group relatedness.

use lazy_static::lazy_static;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Coarse genre bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenreGroup {
    Otaku,
    Jpop,
    Rock,
    Kpop,
    Idol,
    Other,
}

/// Bonus when the two tag lists share a tag.
pub const EXACT_MATCH_BONUS: f64 = 2.0;
/// Bonus when both lists resolve to the same group.
pub const SAME_GROUP_BONUS: f64 = 1.5;
/// Neutral factor: unknown tags, both `other`, or related groups.
pub const NEUTRAL_BONUS: f64 = 1.0;
/// Penalty for unrelated groups.
pub const MISMATCH_PENALTY: f64 = 0.3;

/// Tie-break order when tags map to several groups.
const PRIORITY: [GenreGroup; 5] = [
    GenreGroup::Otaku,
    GenreGroup::Idol,
    GenreGroup::Jpop,
    GenreGroup::Rock,
    GenreGroup::Kpop,
];

const OTAKU_GENRES: &[&str] = &[
    "anime",
    "anime rock",
    "anime score",
    "anison",
    "japanese vgm",
    "vgm",
    "video game music",
    "otacore",
    "vocaloid",
    "japanese vocaloid",
    "utaite",
    "denpa",
    "touhou",
    "doujin",
    "j-pixie",
    "japanese electropop",
    "seiyu",
    "virtual idol",
];

const IDOL_GENRES: &[&str] = &[
    "idol",
    "japanese idol",
    "japanese idol pop",
    "idol rock",
    "johnnys",
    "akb-group",
    "hello project",
    "46g",
    "japanese girl group",
    "japanese boy group",
];

const JPOP_GENRES: &[&str] = &[
    "j-pop",
    "jpop",
    "japanese pop",
    "japanese teen pop",
    "city pop",
    "shibuya-kei",
    "japanese r&b",
    "japanese soul",
    "japanese singer-songwriter",
    "kayokyoku",
    "japanese hip hop",
    "j-rap",
    "japanese electronic",
    "japanese dance pop",
];

const ROCK_GENRES: &[&str] = &[
    "j-rock",
    "jrock",
    "japanese rock",
    "visual kei",
    "alternative rock",
    "japanese alternative rock",
    "japanese metal",
    "j-metal",
    "japanese punk",
    "japanese indie rock",
    "japanese emo",
    "japanese post-rock",
    "indie rock",
    "pop punk",
    "metalcore",
    "rock",
];

const KPOP_GENRES: &[&str] = &[
    "k-pop",
    "kpop",
    "korean pop",
    "k-pop boy group",
    "k-pop girl group",
    "korean r&b",
    "k-rap",
    "korean hip hop",
    "korean indie",
    "k-indie",
    "korean ost",
    "k-ballad",
];

/// Related group pairs; relatedness is symmetric.
const RELATED: [(GenreGroup, GenreGroup); 5] = [
    (GenreGroup::Otaku, GenreGroup::Jpop),
    (GenreGroup::Otaku, GenreGroup::Rock),
    (GenreGroup::Jpop, GenreGroup::Rock),
    (GenreGroup::Jpop, GenreGroup::Idol),
    (GenreGroup::Kpop, GenreGroup::Idol),
];

lazy_static! {
    static ref GENRE_TO_GROUP: HashMap<&'static str, GenreGroup> = {
        let mut map = HashMap::new();
        for group in PRIORITY {
            for genre in group.genres() {
                map.insert(*genre, group);
            }
        }
        map
    };
}

impl GenreGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Otaku => "otaku",
            Self::Jpop => "jpop",
            Self::Rock => "rock",
            Self::Kpop => "kpop",
            Self::Idol => "idol",
            Self::Other => "other",
        }
    }

    /// Canonical genres belonging to this group.
    pub fn genres(&self) -> &'static [&'static str] {
        match self {
            Self::Otaku => OTAKU_GENRES,
            Self::Jpop => JPOP_GENRES,
            Self::Rock => ROCK_GENRES,
            Self::Kpop => KPOP_GENRES,
            Self::Idol => IDOL_GENRES,
            Self::Other => &[],
        }
    }

    /// Whether two distinct groups are listed as related. `Other` relates to nothing.
    pub fn is_related_to(&self, other: GenreGroup) -> bool {
        RELATED
            .iter()
            .any(|&(a, b)| (a == *self && b == other) || (a == other && b == *self))
    }
}

/// Group of a single genre string, if it is in the taxonomy.
pub fn group_of(genre: &str) -> Option<GenreGroup> {
    GENRE_TO_GROUP.get(genre.trim().to_lowercase().as_str()).copied()
}

/// Resolve a tag list to a single group.
///
/// When tags fall into several groups the highest-priority one wins:
/// otaku, idol, jpop, rock, kpop.
pub fn classify<S: AsRef<str>>(tags: &[S]) -> GenreGroup {
    let found: HashSet<GenreGroup> = tags.iter().filter_map(|t| group_of(t.as_ref())).collect();

    PRIORITY
        .into_iter()
        .find(|group| found.contains(group))
        .unwrap_or(GenreGroup::Other)
}

/// Tags present in both lists, case-insensitively, in `b`'s order.
pub fn common_tags<A: AsRef<str>, B: AsRef<str>>(a: &[A], b: &[B]) -> Vec<String> {
    let set_a: HashSet<String> = a.iter().map(|t| t.as_ref().to_lowercase()).collect();
    let mut seen = HashSet::new();

    b.iter()
        .map(|t| t.as_ref().to_lowercase())
        .filter(|t| set_a.contains(t) && seen.insert(t.clone()))
        .collect()
}

/// Pairwise genre affinity factor.
///
/// - either list empty: 1.0
/// - any shared tag: 2.0
/// - both `other`: 1.0
/// - same group: 1.5
/// - related groups: 1.0
/// - otherwise: 0.3
pub fn genre_bonus<A: AsRef<str>, B: AsRef<str>>(seed_tags: &[A], candidate_tags: &[B]) -> f64 {
    if seed_tags.is_empty() || candidate_tags.is_empty() {
        return NEUTRAL_BONUS;
    }

    if !common_tags(seed_tags, candidate_tags).is_empty() {
        return EXACT_MATCH_BONUS;
    }

    let seed_group = classify(seed_tags);
    let candidate_group = classify(candidate_tags);

    if seed_group == GenreGroup::Other && candidate_group == GenreGroup::Other {
        return NEUTRAL_BONUS;
    }

    if seed_group == candidate_group {
        return SAME_GROUP_BONUS;
    }

    if seed_group.is_related_to(candidate_group) {
        return NEUTRAL_BONUS;
    }

    MISMATCH_PENALTY
}
