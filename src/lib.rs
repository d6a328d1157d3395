//! MoodTune client library
//!
//! Recommends music from the listener's facial expression. Frames are
//! classified by an emotion inference service, aggregated over a sliding
//! window, and turned into a recommendation query against the Spotify Web
//! API using an OAuth session that renews itself before it expires.

pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod fetch;
pub mod inference;
pub mod monitor;
pub mod mood;
pub mod scheduler;

use reqwest::Client;
use std::sync::Arc;

use crate::auth::{SessionManager, SpotifyTokenClient};
use crate::catalog::RecommendationClient;
use crate::config::ClientOptions;
use crate::error::Result;
use crate::inference::{EmotionDetector, FrameSource, InferenceClient};
use crate::monitor::{MonitorParts, MoodMonitor};
use crate::scheduler::{Clock, Scheduler, SystemClock, TokioScheduler};

/// The main entry point for the MoodTune client
pub struct MoodTune {
    /// HTTP client shared by every service client
    pub http_client: Client,
    /// Accounts service client used for sign-in
    pub token_client: Arc<SpotifyTokenClient>,
    /// Owner of the signed-in session
    pub session: SessionManager,
    /// Catalog recommendation client
    pub catalog: Arc<RecommendationClient>,
    /// Emotion classifier client
    pub inference: Arc<InferenceClient>,
    /// Client options
    pub options: ClientOptions,
    scheduler: Arc<dyn Scheduler>,
    clock: Arc<dyn Clock>,
}

impl MoodTune {
    /// Create a new client
    ///
    /// Timers are driven by tokio, so the client must be used from within a
    /// tokio runtime.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use moodtune::{MoodTune, config::ClientOptions};
    ///
    /// let options = ClientOptions::new("client-id", "client-secret")
    ///     .with_redirect_uri("http://localhost:3000/");
    /// let moodtune = MoodTune::new(options).unwrap();
    /// println!("{}", moodtune.authorize_url(None));
    /// ```
    pub fn new(options: ClientOptions) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;

        let scheduler: Arc<dyn Scheduler> = Arc::new(TokioScheduler::new());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let token_client = Arc::new(SpotifyTokenClient::new(&options, http_client.clone()));
        let session = SessionManager::new(
            token_client.clone(),
            scheduler.clone(),
            clock.clone(),
            options.renewal_margin,
        );
        let catalog = Arc::new(RecommendationClient::new(&options, http_client.clone()));
        let inference = Arc::new(InferenceClient::new(&options, http_client.clone()));

        Ok(Self {
            http_client,
            token_client,
            session,
            catalog,
            inference,
            options,
            scheduler,
            clock,
        })
    }

    /// Create a client from `MOODTUNE_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(ClientOptions::from_env()?)
    }

    /// URL to send the user to for sign-in
    pub fn authorize_url(&self, state: Option<&str>) -> String {
        self.token_client.authorize_url(state)
    }

    /// Start a monitoring session classifying frames with the inference client
    pub fn monitor(&self, frames: Arc<dyn FrameSource>) -> MoodMonitor {
        self.monitor_with(frames, self.inference.clone())
    }

    /// Start a monitoring session with a custom detector
    pub fn monitor_with(
        &self,
        frames: Arc<dyn FrameSource>,
        detector: Arc<dyn EmotionDetector>,
    ) -> MoodMonitor {
        MoodMonitor::new(MonitorParts {
            session: self.session.clone(),
            frames,
            detector,
            catalog: self.catalog.clone(),
            scheduler: self.scheduler.clone(),
            clock: self.clock.clone(),
            sample_interval: self.options.sample_interval,
            window_capacity: self.options.window_capacity,
            recommendation_limit: self.options.recommendation_limit,
        })
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::MoodTune;
    pub use crate::auth::{SessionEvent, SessionManager, SessionState};
    pub use crate::catalog::TrackRecord;
    pub use crate::config::ClientOptions;
    pub use crate::error::Error;
    pub use crate::inference::{EmotionDetector, FrameSource};
    pub use crate::monitor::{MoodMonitor, Recommendation};
    pub use crate::mood::{AudioFeatureTarget, Emotion, EmotionSample, MoodSummary};
}
