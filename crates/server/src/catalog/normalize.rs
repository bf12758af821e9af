//! Raw upstream record → [`CanonicalRecord`].
//!
//! Upstream payloads are loosely typed: fields go missing, numbers arrive as
//! strings, titles carry HTML entities. Nothing in here fails; every field
//! that cannot be read becomes an empty string (or zero).

use common::{CanonicalRecord, RecordExtra};
use serde_json::Value;

/// Artwork size tokens the upstream CDN serves by default.
const LOW_RES_TOKENS: [&str; 2] = ["150x150", "50x50"];

/// Size token substituted for any of [`LOW_RES_TOKENS`].
pub const HIGH_RES_TOKEN: &str = "500x500";

/// Label used when a search result carries no artist information at all.
pub const UNKNOWN_ARTIST: &str = "Unknown";

/// Which upstream record shape is being normalized.
///
/// Song and search-result records both produce song records but resolve
/// their artist line through different fallback chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawKind {
    /// Playlist entries and new releases.
    Song,
    /// Entries returned by catalog search.
    SearchResult,
    Album,
    Artist,
}

/// Map one raw upstream record into the canonical shape.
pub fn normalize(raw: &Value, kind: RawKind) -> CanonicalRecord {
    let (name, primary_artists, extra) = match kind {
        RawKind::Song => (
            text(raw, "title"),
            song_artists(raw),
            RecordExtra::Song {
                download_url: text(raw, "perma_url"),
            },
        ),
        RawKind::SearchResult => (
            text(raw, "title"),
            search_artists(raw),
            RecordExtra::Song {
                download_url: text(raw, "perma_url"),
            },
        ),
        RawKind::Album => (
            text(raw, "title"),
            album_artists(raw),
            RecordExtra::Album {
                url: text(raw, "perma_url"),
                year: text(raw, "year"),
            },
        ),
        RawKind::Artist => (
            first_non_empty([text(raw, "name"), text(raw, "title")]),
            String::new(),
            RecordExtra::Artist {
                url: text(raw, "perma_url"),
                follower_count: count(raw.get("follower_count")),
            },
        ),
    };

    let id = match kind {
        RawKind::Artist => first_non_empty([text(raw, "id"), text(raw, "artistid")]),
        _ => text(raw, "id"),
    };

    CanonicalRecord {
        id,
        name: decode(&name),
        primary_artists: decode(&primary_artists),
        image: high_res_image(&text(raw, "image")),
        extra,
    }
}

/// Rewrite a low-resolution artwork URL to the high-resolution variant.
///
/// URLs without a known size token are returned unchanged.
pub fn high_res_image(url: &str) -> String {
    for token in LOW_RES_TOKENS {
        if url.contains(token) {
            return url.replace(token, HIGH_RES_TOKEN);
        }
    }
    url.to_owned()
}

// ---------------------------------------------------------------------------
// Artist-line fallback chains
// ---------------------------------------------------------------------------

/// `subtitle` → `more_info.artistMap.artists[].name`.
fn song_artists(raw: &Value) -> String {
    first_non_empty([
        text(raw, "subtitle"),
        artist_names(path(raw, &["more_info", "artistMap", "artists"])),
    ])
}

/// `more_info.artistMap.primary_artists[].name` → `more_info.singers` →
/// `subtitle` → [`UNKNOWN_ARTIST`].
fn search_artists(raw: &Value) -> String {
    let resolved = first_non_empty([
        artist_names(path(raw, &["more_info", "artistMap", "primary_artists"])),
        path(raw, &["more_info", "singers"]).map(as_text).unwrap_or_default(),
        text(raw, "subtitle"),
    ]);
    if resolved.is_empty() {
        UNKNOWN_ARTIST.to_owned()
    } else {
        resolved
    }
}

/// `more_info.artistMap.primary_artists[].name` → `more_info.music` → `subtitle`.
fn album_artists(raw: &Value) -> String {
    first_non_empty([
        artist_names(path(raw, &["more_info", "artistMap", "primary_artists"])),
        path(raw, &["more_info", "music"]).map(as_text).unwrap_or_default(),
        text(raw, "subtitle"),
    ])
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

fn path<'a>(raw: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().try_fold(raw, |v, key| v.get(key))
}

fn text(raw: &Value, key: &str) -> String {
    raw.get(key).map(as_text).unwrap_or_default()
}

fn as_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// Join the non-empty `name` fields of an array of artist objects.
fn artist_names(v: Option<&Value>) -> String {
    let Some(Value::Array(artists)) = v else {
        return String::new();
    };
    artists
        .iter()
        .filter_map(|a| a.get("name").and_then(Value::as_str))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

fn count(v: Option<&Value>) -> u64 {
    match v {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn first_non_empty<const N: usize>(candidates: [String; N]) -> String {
    candidates
        .into_iter()
        .find(|s| !s.trim().is_empty())
        .unwrap_or_default()
}

fn decode(s: &str) -> String {
    html_escape::decode_html_entities(s).into_owned()
}
