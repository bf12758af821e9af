//! Canonical catalog records served by every cached route and mirrored to the
//! remote store.
//!
//! The JSON shape keeps the field names the mobile client already consumes
//! (`primaryArtists`, `downloadUrl`) and adds a `type` discriminator so song,
//! album, and artist records can share one sequence type.

use serde::{Deserialize, Serialize};

/// Normalized song / album / artist record.
///
/// Every text field is populated: absent upstream values become `""`, never
/// `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    /// Upstream identifier. Empty only when the upstream record had none.
    pub id: String,
    /// Display title, HTML entities decoded.
    pub name: String,
    /// Comma-separated artist line, HTML entities decoded.
    #[serde(rename = "primaryArtists")]
    pub primary_artists: String,
    /// Artwork URL rewritten to the high-resolution size token.
    pub image: String,
    /// Kind-specific fields, tagged by `type`.
    #[serde(flatten)]
    pub extra: RecordExtra,
}

/// Kind-specific part of a [`CanonicalRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RecordExtra {
    Song {
        #[serde(rename = "downloadUrl")]
        download_url: String,
    },
    Album {
        url: String,
        #[serde(default)]
        year: String,
    },
    Artist {
        url: String,
        #[serde(rename = "followerCount", default)]
        follower_count: u64,
    },
}

/// Discriminant of [`RecordExtra`], handy for logging and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Song,
    Album,
    Artist,
}

impl CanonicalRecord {
    /// Which kind of record this is.
    pub fn kind(&self) -> RecordKind {
        match self.extra {
            RecordExtra::Song { .. } => RecordKind::Song,
            RecordExtra::Album { .. } => RecordKind::Album,
            RecordExtra::Artist { .. } => RecordKind::Artist,
        }
    }

    /// The record's link: `downloadUrl` for songs, `url` otherwise.
    pub fn link(&self) -> &str {
        match &self.extra {
            RecordExtra::Song { download_url } => download_url,
            RecordExtra::Album { url, .. } | RecordExtra::Artist { url, .. } => url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn song() -> CanonicalRecord {
        CanonicalRecord {
            id: "abc".into(),
            name: "Tum Hi Ho".into(),
            primary_artists: "Arijit Singh".into(),
            image: "https://c.saavncdn.com/x-500x500.jpg".into(),
            extra: RecordExtra::Song {
                download_url: "https://www.jiosaavn.com/song/tum-hi-ho/abc".into(),
            },
        }
    }

    #[test]
    fn song_serializes_with_client_field_names() {
        let v = serde_json::to_value(song()).unwrap();
        assert_eq!(v["type"], "song");
        assert_eq!(v["primaryArtists"], "Arijit Singh");
        assert_eq!(v["downloadUrl"], "https://www.jiosaavn.com/song/tum-hi-ho/abc");
        assert!(v.get("url").is_none());
    }

    #[test]
    fn artist_carries_follower_count() {
        let v = json!({
            "id": "459320",
            "name": "Arijit Singh",
            "primaryArtists": "",
            "image": "",
            "type": "artist",
            "url": "https://www.jiosaavn.com/artist/arijit-singh/LlRWpHzy3Hk_",
            "followerCount": 41000000u64
        });
        let rec: CanonicalRecord = serde_json::from_value(v).unwrap();
        assert_eq!(rec.kind(), RecordKind::Artist);
        assert!(matches!(
            rec.extra,
            RecordExtra::Artist { follower_count: 41000000, .. }
        ));
    }

    #[test]
    fn link_picks_kind_specific_field() {
        assert!(song().link().ends_with("/abc"));
        let album = CanonicalRecord {
            extra: RecordExtra::Album {
                url: "https://www.jiosaavn.com/album/x".into(),
                year: "2024".into(),
            },
            ..song()
        };
        assert_eq!(album.kind(), RecordKind::Album);
        assert_eq!(album.link(), "https://www.jiosaavn.com/album/x");
    }
}
