//! Catalog response shapes and the normalized track record

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fetch::FetchError;

/// Failure to obtain recommendations
#[derive(Error, Debug)]
pub enum RecommendationError {
    #[error("No valid access token")]
    MissingToken,

    #[error("A recommendation request is already in flight")]
    Busy,

    #[error("Recommendation request failed: {0}")]
    Fetch(#[from] FetchError),
}

/// A recommended track, normalized for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub uri: String,
    pub name: String,
    /// Artist names in catalog order
    pub artists: Vec<String>,
    /// Smallest artwork variant offered
    pub image_url: Option<String>,
    pub duration_ms: u64,
    /// Link to the track on the platform's web player
    pub external_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecommendationsResponse {
    pub tracks: Vec<RawTrack>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawTrack {
    pub uri: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<RawArtist>,
    #[serde(default)]
    pub album: Option<RawAlbum>,
    pub duration_ms: u64,
    #[serde(default)]
    pub external_urls: Option<RawExternalUrls>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawArtist {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawAlbum {
    #[serde(default)]
    pub images: Vec<RawImage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawImage {
    pub url: String,
    pub height: Option<u64>,
    pub width: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawExternalUrls {
    pub spotify: Option<String>,
}

impl RawImage {
    // Variants without dimensions sort after every sized one
    fn area(&self) -> u64 {
        match (self.width, self.height) {
            (Some(w), Some(h)) => w.saturating_mul(h),
            _ => u64::MAX,
        }
    }
}

/// Smallest-area image; the first one wins among equals
pub(crate) fn smallest_image(images: &[RawImage]) -> Option<&RawImage> {
    images.iter().min_by_key(|image| image.area())
}

impl From<RawTrack> for TrackRecord {
    fn from(track: RawTrack) -> Self {
        let image_url = track
            .album
            .as_ref()
            .and_then(|album| smallest_image(&album.images))
            .map(|image| image.url.clone());

        Self {
            uri: track.uri,
            name: track.name,
            artists: track.artists.into_iter().map(|a| a.name).collect(),
            image_url,
            duration_ms: track.duration_ms,
            external_url: track.external_urls.and_then(|urls| urls.spotify),
        }
    }
}
