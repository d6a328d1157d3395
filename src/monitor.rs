//! Monitoring session controller
//!
//! A [`MoodMonitor`] ties the pieces together for one monitoring session. It
//! samples frames on a fixed cadence into its [`SampleWindow`], keeps the
//! latest prediction for display, and on demand turns the window into a
//! recommendation request authorized by the [`SessionManager`].

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use crate::auth::SessionManager;
use crate::catalog::{RecommendationClient, RecommendationError, TrackRecord};
use crate::inference::{EmotionDetector, FrameSource, InferenceError};
use crate::mood::{
    map_features, summarize, AudioFeatureTarget, EmotionSample, MoodSummary, SampleWindow,
};
use crate::scheduler::{Clock, RepeatingTask, Scheduler, Task, TimerHandle};

/// What the monitor last observed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitorStatus {
    /// Most recent successful prediction; cleared by a failed one
    pub latest: Option<EmotionSample>,
    /// Message from the most recent failure, cleared on the next success
    pub message: Option<String>,
    /// When `latest` was last written
    pub updated_at: Option<DateTime<Utc>>,
}

/// Result of an on-demand recommendation
#[derive(Debug, Clone)]
pub struct Recommendation {
    pub summary: MoodSummary,
    pub target: AudioFeatureTarget,
    pub tracks: Vec<TrackRecord>,
}

/// Collaborators and settings for a [`MoodMonitor`]
pub struct MonitorParts {
    pub session: SessionManager,
    pub frames: Arc<dyn FrameSource>,
    pub detector: Arc<dyn EmotionDetector>,
    pub catalog: Arc<RecommendationClient>,
    pub scheduler: Arc<dyn Scheduler>,
    pub clock: Arc<dyn Clock>,
    pub sample_interval: Duration,
    pub window_capacity: usize,
    pub recommendation_limit: u32,
}

struct MonitorState {
    window: SampleWindow,
    status: MonitorStatus,
    sampling: Option<TimerHandle>,
}

struct Inner {
    session: SessionManager,
    frames: Arc<dyn FrameSource>,
    detector: Arc<dyn EmotionDetector>,
    catalog: Arc<RecommendationClient>,
    scheduler: Arc<dyn Scheduler>,
    clock: Arc<dyn Clock>,
    sample_interval: Duration,
    recommendation_limit: u32,
    state: Mutex<MonitorState>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = state.sampling.take() {
            self.scheduler.cancel(handle);
        }
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn sample_once(&self) -> Result<Option<EmotionSample>, InferenceError> {
        let Some(frame) = self.frames.capture().await else {
            debug!("No frame available yet");
            return Ok(None);
        };

        match self.detector.detect(frame).await {
            Ok(sample) => {
                let now = self.clock.now();
                let mut state = self.lock();
                state.window.push(sample.clone());
                state.status = MonitorStatus {
                    latest: Some(sample.clone()),
                    message: None,
                    updated_at: Some(now),
                };
                Ok(Some(sample))
            }
            Err(err) => {
                warn!("Emotion detection failed: {}", err);
                let mut state = self.lock();
                state.status.latest = None;
                state.status.message = Some(err.to_string());
                Err(err)
            }
        }
    }
}

/// Owner of one monitoring session
///
/// Cloning is cheap; clones share the same window and sampling timer.
#[derive(Clone)]
pub struct MoodMonitor {
    inner: Arc<Inner>,
}

impl MoodMonitor {
    /// Create a monitor that is not yet sampling
    pub fn new(parts: MonitorParts) -> Self {
        Self {
            inner: Arc::new(Inner {
                session: parts.session,
                frames: parts.frames,
                detector: parts.detector,
                catalog: parts.catalog,
                scheduler: parts.scheduler,
                clock: parts.clock,
                sample_interval: parts.sample_interval,
                recommendation_limit: parts.recommendation_limit,
                state: Mutex::new(MonitorState {
                    window: SampleWindow::new(parts.window_capacity),
                    status: MonitorStatus::default(),
                    sampling: None,
                }),
            }),
        }
    }

    /// The session manager authorizing this monitor's requests
    pub fn session(&self) -> &SessionManager {
        &self.inner.session
    }

    /// Start the sampling loop. Does nothing if it is already running.
    pub fn start(&self) {
        let mut state = self.inner.lock();
        if state.sampling.is_some() {
            return;
        }

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let tick: RepeatingTask = Arc::new(move || -> Task {
            let weak = weak.clone();
            Box::pin(async move {
                if let Some(inner) = weak.upgrade() {
                    // Failures are already recorded in the status
                    let _ = inner.sample_once().await;
                }
            })
        });

        info!("Sampling every {:?}", self.inner.sample_interval);
        state.sampling = Some(
            self.inner
                .scheduler
                .schedule_repeating(self.inner.sample_interval, tick),
        );
    }

    /// Stop the sampling loop, keeping the window
    pub fn stop(&self) {
        let handle = self.inner.lock().sampling.take();
        if let Some(handle) = handle {
            info!("Sampling stopped");
            self.inner.scheduler.cancel(handle);
        }
    }

    /// Whether the sampling loop is running
    pub fn is_sampling(&self) -> bool {
        self.inner.lock().sampling.is_some()
    }

    /// Capture and classify one frame outside the regular cadence
    ///
    /// Returns `Ok(None)` when the frame source has nothing to offer.
    pub async fn sample_once(&self) -> Result<Option<EmotionSample>, InferenceError> {
        self.inner.sample_once().await
    }

    /// Copy of the samples currently in the window, oldest first
    pub fn samples(&self) -> Vec<EmotionSample> {
        self.inner.lock().window.snapshot()
    }

    pub fn status(&self) -> MonitorStatus {
        self.inner.lock().status.clone()
    }

    /// Aggregate the current window
    pub fn summary(&self) -> MoodSummary {
        let samples = self.samples();
        summarize(&samples)
    }

    /// Catalog parameters for the current window
    pub fn target(&self) -> AudioFeatureTarget {
        map_features(&self.summary())
    }

    /// Ask the catalog for tracks matching the current mood
    pub async fn recommend(&self) -> Result<Recommendation, RecommendationError> {
        let summary = self.summary();
        let target = map_features(&summary);
        let token = self.inner.session.current_token();

        match self
            .inner
            .catalog
            .fetch(token.as_deref(), &target, self.inner.recommendation_limit)
            .await
        {
            Ok(tracks) => {
                info!("Received {} recommendations for {}", tracks.len(), target.genre_seed);
                Ok(Recommendation {
                    summary,
                    target,
                    tracks,
                })
            }
            Err(err) => {
                warn!("Could not fetch recommendations: {}", err);
                self.inner.lock().status.message = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Stop sampling and tear down the session's renewal timer
    pub fn shutdown(&self) {
        self.stop();
        self.inner.session.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthError, RefreshError, TokenEndpoint, TokenGrant, TokenRefresh};
    use crate::config::ClientOptions;
    use crate::mood::{Emotion, FaceBox};
    use crate::scheduler::testing::ManualScheduler;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticFrames;

    #[async_trait]
    impl FrameSource for StaticFrames {
        async fn capture(&self) -> Option<Vec<u8>> {
            Some(vec![0xff, 0xd8, 0xff])
        }
    }

    struct NoFrames;

    #[async_trait]
    impl FrameSource for NoFrames {
        async fn capture(&self) -> Option<Vec<u8>> {
            None
        }
    }

    struct ScriptedDetector {
        results: Mutex<VecDeque<Result<EmotionSample, InferenceError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedDetector {
        fn new(results: Vec<Result<EmotionSample, InferenceError>>) -> Arc<Self> {
            Arc::new(Self {
                results: Mutex::new(results.into()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl EmotionDetector for ScriptedDetector {
        async fn detect(&self, _image: Vec<u8>) -> Result<EmotionSample, InferenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(sample(Emotion::Neutral, 0.5)))
        }
    }

    struct GrantingEndpoint;

    #[async_trait]
    impl TokenEndpoint for GrantingEndpoint {
        async fn exchange_code(&self, _code: &str) -> Result<TokenGrant, AuthError> {
            Ok(TokenGrant {
                access_token: "access-1".to_string(),
                refresh_token: Some("refresh-1".to_string()),
                expires_in: 3600,
                token_type: Some("Bearer".to_string()),
                scope: None,
            })
        }

        async fn refresh_token(&self, _refresh_token: &str) -> Result<TokenRefresh, RefreshError> {
            Err(RefreshError::MissingRefreshToken)
        }
    }

    fn sample(emotion: Emotion, confidence: f64) -> EmotionSample {
        EmotionSample::new(emotion, confidence, FaceBox::default())
    }

    fn monitor(
        scheduler: &Arc<ManualScheduler>,
        frames: Arc<dyn FrameSource>,
        detector: Arc<dyn EmotionDetector>,
        api_url: &str,
    ) -> MoodMonitor {
        let options = ClientOptions::new("id", "secret").with_api_url(api_url);
        let session = SessionManager::new(
            Arc::new(GrantingEndpoint),
            scheduler.clone(),
            scheduler.clone(),
            Duration::from_secs(60),
        );
        MoodMonitor::new(MonitorParts {
            session,
            frames,
            detector,
            catalog: Arc::new(RecommendationClient::new(&options, reqwest::Client::new())),
            scheduler: scheduler.clone(),
            clock: scheduler.clone(),
            sample_interval: Duration::from_secs(1),
            window_capacity: 3,
            recommendation_limit: 10,
        })
    }

    #[tokio::test]
    async fn samples_every_interval_until_stopped() {
        let scheduler = ManualScheduler::new();
        let detector = ScriptedDetector::new(vec![]);
        let monitor = monitor(
            &scheduler,
            Arc::new(StaticFrames),
            detector.clone(),
            "http://unused",
        );

        monitor.start();
        monitor.start();
        assert_eq!(scheduler.pending(), 1);

        scheduler.advance(Duration::from_secs(5)).await;
        assert_eq!(detector.calls.load(Ordering::SeqCst), 5);
        // Window keeps only the newest three
        assert_eq!(monitor.samples().len(), 3);

        monitor.stop();
        assert!(!monitor.is_sampling());
        scheduler.advance(Duration::from_secs(5)).await;
        assert_eq!(detector.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn failed_detection_clears_latest_and_keeps_looping() {
        let scheduler = ManualScheduler::new();
        let detector = ScriptedDetector::new(vec![
            Ok(sample(Emotion::Happy, 0.75)),
            Err(InferenceError::Rejected("No face detected".to_string())),
            Ok(sample(Emotion::Sad, 0.25)),
        ]);
        let monitor = monitor(&scheduler, Arc::new(StaticFrames), detector, "http://unused");
        monitor.start();

        scheduler.advance(Duration::from_secs(1)).await;
        let status = monitor.status();
        assert_eq!(status.latest.map(|s| s.emotion), Some(Emotion::Happy));
        assert!(status.message.is_none());
        assert!(status.updated_at.is_some());

        scheduler.advance(Duration::from_secs(1)).await;
        let status = monitor.status();
        assert!(status.latest.is_none());
        assert_eq!(
            status.message.as_deref(),
            Some("Inference rejected: No face detected")
        );

        scheduler.advance(Duration::from_secs(1)).await;
        let status = monitor.status();
        assert_eq!(status.latest.map(|s| s.emotion), Some(Emotion::Sad));
        assert!(status.message.is_none());
        assert_eq!(monitor.samples().len(), 2);
    }

    #[test]
    fn missing_frame_is_skipped() {
        tokio_test::block_on(async {
            let scheduler = ManualScheduler::new();
            let detector = ScriptedDetector::new(vec![]);
            let monitor = monitor(
                &scheduler,
                Arc::new(NoFrames),
                detector.clone(),
                "http://unused",
            );

            assert!(monitor.sample_once().await.unwrap().is_none());
            assert_eq!(detector.calls.load(Ordering::SeqCst), 0);
            assert!(monitor.samples().is_empty());
        });
    }

    #[tokio::test]
    async fn summary_reduces_a_window_snapshot() {
        let scheduler = ManualScheduler::new();
        let detector = ScriptedDetector::new(vec![
            Ok(sample(Emotion::Sad, 0.25)),
            Ok(sample(Emotion::Happy, 0.75)),
            Ok(sample(Emotion::Happy, 0.75)),
        ]);
        let monitor = monitor(&scheduler, Arc::new(StaticFrames), detector, "http://unused");
        for _ in 0..3 {
            monitor.sample_once().await.unwrap();
        }

        let summary = monitor.summary();

        assert_eq!(summary, summarize(&monitor.samples()));
        assert_eq!(summary.dominant_emotion, Some(Emotion::Happy));
        assert_eq!(summary.sample_count, 3);
        assert_eq!(monitor.target().genre_seed, "happy");
    }

    #[tokio::test]
    async fn empty_window_targets_fallback() {
        let scheduler = ManualScheduler::new();
        let monitor = monitor(
            &scheduler,
            Arc::new(NoFrames),
            ScriptedDetector::new(vec![]),
            "http://unused",
        );

        let target = monitor.target();
        assert_eq!(target.genre_seed, "pop");
        assert_eq!(target.valence, 0.5);
        assert_eq!(target.energy, 0.5);
    }

    #[tokio::test]
    async fn recommend_without_session_records_message() {
        let scheduler = ManualScheduler::new();
        let monitor = monitor(
            &scheduler,
            Arc::new(NoFrames),
            ScriptedDetector::new(vec![]),
            "http://unused",
        );

        let err = monitor.recommend().await.unwrap_err();
        assert!(matches!(err, RecommendationError::MissingToken));
        assert_eq!(monitor.status().message.as_deref(), Some("No valid access token"));
    }

    #[tokio::test]
    async fn recommend_uses_current_mood_and_token() {
        use wiremock::matchers::{header, method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/recommendations"))
            .and(header("authorization", "Bearer access-1"))
            .and(query_param("seed_genres", "happy"))
            .and(query_param("limit", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "tracks": [{
                    "uri": "spotify:track:1",
                    "name": "Sunny",
                    "artists": [{"name": "Band"}],
                    "duration_ms": 1000
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let scheduler = ManualScheduler::new();
        let detector = ScriptedDetector::new(vec![Ok(sample(Emotion::Happy, 0.75))]);
        let monitor = monitor(&scheduler, Arc::new(StaticFrames), detector, &server.uri());
        monitor.session().exchange("code").await.unwrap();
        monitor.sample_once().await.unwrap();

        let recommendation = monitor.recommend().await.unwrap();

        assert_eq!(recommendation.summary.dominant_emotion, Some(Emotion::Happy));
        assert_eq!(recommendation.target.genre_seed, "happy");
        assert_eq!(recommendation.tracks.len(), 1);
        assert_eq!(recommendation.tracks[0].name, "Sunny");
    }

    #[tokio::test]
    async fn shutdown_cancels_sampling_and_renewal() {
        let scheduler = ManualScheduler::new();
        let monitor = monitor(
            &scheduler,
            Arc::new(StaticFrames),
            ScriptedDetector::new(vec![]),
            "http://unused",
        );
        monitor.session().exchange("code").await.unwrap();
        monitor.start();
        assert_eq!(scheduler.pending(), 2);

        monitor.shutdown();

        assert_eq!(scheduler.pending(), 0);
        assert!(!monitor.is_sampling());
    }
}
