//! Title and artist normalization for cross-catalog search.

use lazy_static::lazy_static;
use regex::Regex;

/// Titles shorter than this after simplification keep their previous form.
const MIN_SIMPLIFIED_CHARS: usize = 3;

lazy_static! {
    static ref SPECIAL_CHARS: Regex = Regex::new(
        r#"[～〜「」『』【】（）()\[\]<>《》、。・"'：:；;！!？?＆&＃#＄$％%＠@＊*＋+＝=｜|＼\\／/]"#
    )
    .expect("valid special character pattern");
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("valid whitespace pattern");
    static ref SUBTITLE_PATTERNS: Vec<Regex> = [
        // everything from the first opening bracket
        r"\s*[\(（【\[].*$",
        // everything from the first dash
        r"\s*[-－–—]\s*.*$",
        // featured artist credits
        r"(?i)\s+(?:feat|ft)\b.*$",
        // remix and version markers
        r"(?i)\s*\b(?:remix|ver|version)\b\.?",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid subtitle pattern"))
    .collect();
}

/// Replace brackets, quotes and punctuation with spaces and collapse whitespace.
pub fn sanitize(value: &str) -> String {
    let replaced = SPECIAL_CHARS.replace_all(value, " ");
    WHITESPACE.replace_all(&replaced, " ").trim().to_string()
}

/// Strip subtitles, featured credits and remix markers from a track title.
///
/// Each rule is applied in turn and kept only when what remains is still at
/// least three characters long. The result is sanitized.
pub fn simplify(title: &str) -> String {
    let mut result = title.to_string();

    for pattern in SUBTITLE_PATTERNS.iter() {
        let simplified = pattern.replace_all(&result, "");
        if simplified.trim().chars().count() >= MIN_SIMPLIFIED_CHARS {
            result = simplified.into_owned();
        }
    }

    sanitize(&result)
}

/// Whether two artist names plausibly refer to the same artist.
///
/// Case-insensitive equality, containment in either direction, or equality
/// after dropping "the" and spelling out "&".
pub fn fuzzy_match_artist(a: &str, b: &str) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();

    if a.is_empty() || b.is_empty() {
        return false;
    }

    if a == b || a.contains(&b) || b.contains(&a) {
        return true;
    }

    normalize_artist(&a) == normalize_artist(&b)
}

fn normalize_artist(name: &str) -> String {
    let name = name.replace('&', " and ").replace('＆', " and ");
    let words: Vec<&str> = name
        .split_whitespace()
        .filter(|word| *word != "the")
        .collect();
    words.join(" ")
}
