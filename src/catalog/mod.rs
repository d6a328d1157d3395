//! Spotify catalog recommendations

mod types;

use log::{debug, warn};
use reqwest::Client;
use tokio::sync::Mutex;

use crate::config::ClientOptions;
use crate::fetch::Fetch;
use crate::mood::AudioFeatureTarget;

pub use types::{RecommendationError, TrackRecord};
use types::RecommendationsResponse;

/// Number of tracks asked for when not configured
pub const DEFAULT_RECOMMENDATION_LIMIT: u32 = 10;

/// Client for the catalog's recommendation endpoint
///
/// Only one request may be in flight; overlapping calls are rejected with
/// [`RecommendationError::Busy`] rather than queued.
pub struct RecommendationClient {
    api_url: String,
    http_client: Client,
    in_flight: Mutex<()>,
}

impl RecommendationClient {
    /// Create a new recommendation client
    pub fn new(options: &ClientOptions, http_client: Client) -> Self {
        Self {
            api_url: options.api_url.trim_end_matches('/').to_string(),
            http_client,
            in_flight: Mutex::new(()),
        }
    }

    /// Whether a request is currently outstanding
    pub fn is_busy(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    /// Ask for `limit` tracks matching `target`
    pub async fn fetch(
        &self,
        token: Option<&str>,
        target: &AudioFeatureTarget,
        limit: u32,
    ) -> Result<Vec<TrackRecord>, RecommendationError> {
        let token = match token {
            Some(token) if !token.is_empty() => token,
            _ => return Err(RecommendationError::MissingToken),
        };

        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| RecommendationError::Busy)?;

        debug!(
            "Requesting {} recommendations for genre={} valence={} energy={}",
            limit, target.genre_seed, target.valence, target.energy
        );

        let url = format!("{}/recommendations", self.api_url);
        let response = Fetch::get(&self.http_client, &url)
            .bearer_auth(token)
            .query("seed_genres", &target.genre_seed)
            .query("target_valence", target.valence)
            .query("target_energy", target.energy)
            .query("limit", limit)
            .execute::<RecommendationsResponse>()
            .await
            .map_err(|err| {
                warn!("Recommendation request failed: {}", err);
                err
            })?;

        Ok(response.tracks.into_iter().map(TrackRecord::from).collect())
    }
}
