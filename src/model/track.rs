//! Track descriptors and search filtering

use serde::Deserialize;

/// Image shown when a track's icon cannot be loaded
pub const PLACEHOLDER_IMAGE: &str = "placeholder.svg";

/// Immutable descriptor of a playable track
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub image_url: String,
}

/// Body of `<origin>/<id>/details.json`
#[derive(Debug, Default, Deserialize)]
pub struct TrackDetails {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
}

impl Track {
    pub fn from_details(id: &str, details: TrackDetails, image_url: String) -> Self {
        Self {
            id: id.to_string(),
            name: details
                .name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| format!("Track {}", id)),
            artist: details
                .artist
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| "Unknown Artist".to_string()),
            image_url,
        }
    }
}

/// Case-insensitive substring match over name and artist.
/// An empty query returns every track, order preserved.
pub fn filter_tracks<'a>(tracks: &'a [Track], query: &str) -> Vec<&'a Track> {
    let needle = query.to_lowercase();
    if needle.is_empty() {
        return tracks.iter().collect();
    }
    tracks
        .iter()
        .filter(|t| {
            t.name.to_lowercase().contains(&needle) || t.artist.to_lowercase().contains(&needle)
        })
        .collect()
}
