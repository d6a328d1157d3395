//! Session token lifecycle for the streaming platform
//!
//! [`SessionManager`] owns the one live [`Session`]. It trades an
//! authorization code for a token pair, arms a single renewal timer
//! `renewal_margin` before the access token expires, and clears itself on the
//! first failed refresh so the caller can restart the login flow.

mod client;
mod session;
mod types;

use log::{debug, error, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::broadcast;

use crate::scheduler::{Clock, Scheduler, TimerHandle};

pub use client::*;
pub use session::*;
pub use types::*;

/// Default safety margin between a renewal and the token's expiry
pub const DEFAULT_RENEWAL_MARGIN: Duration = Duration::from_secs(60);

struct ManagerState {
    phase: SessionState,
    session: Option<Session>,
    renewal: Option<TimerHandle>,
    // Bumped on every arm and on shutdown; a fired timer with an older value is stale.
    generation: u64,
}

struct Inner {
    endpoint: Arc<dyn TokenEndpoint>,
    scheduler: Arc<dyn Scheduler>,
    clock: Arc<dyn Clock>,
    renewal_margin: Duration,
    state: Mutex<ManagerState>,
    events: broadcast::Sender<SessionEvent>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = state.renewal.take() {
            self.scheduler.cancel(handle);
        }
    }
}

/// Owner of the authentication token
///
/// Cloning is cheap; clones share the same session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    /// Create a new session manager with no session
    pub fn new(
        endpoint: Arc<dyn TokenEndpoint>,
        scheduler: Arc<dyn Scheduler>,
        clock: Arc<dyn Clock>,
        renewal_margin: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(Inner {
                endpoint,
                scheduler,
                clock,
                renewal_margin,
                state: Mutex::new(ManagerState {
                    phase: SessionState::Unauthenticated,
                    session: None,
                    renewal: None,
                    generation: 0,
                }),
                events,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ManagerState> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }

    /// Receive [`SessionEvent`]s from this manager
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.lock().phase
    }

    /// Snapshot of the current session
    pub fn session(&self) -> Option<Session> {
        self.lock().session.clone()
    }

    /// The access token, if a session exists and has not expired
    pub fn current_token(&self) -> Option<String> {
        let state = self.lock();
        match state.phase {
            SessionState::Authenticated | SessionState::Refreshing => {}
            _ => return None,
        }
        state
            .session
            .as_ref()
            .filter(|s| !s.is_expired(self.inner.clock.now()))
            .map(|s| s.access_token.clone())
    }

    /// Establish a session from an authorization code
    ///
    /// Any previous session and its renewal timer are discarded first. On
    /// failure the manager is left unauthenticated.
    pub async fn exchange(&self, code: &str) -> Result<Session, AuthError> {
        if code.trim().is_empty() {
            return Err(AuthError::MissingCode);
        }

        {
            let mut state = self.lock();
            self.disarm(&mut state);
            state.session = None;
            state.phase = SessionState::Exchanging;
        }

        let grant = match self.inner.endpoint.exchange_code(code).await {
            Ok(grant) => grant,
            Err(err) => {
                warn!("Authorization code exchange failed: {}", err);
                self.lock().phase = SessionState::Unauthenticated;
                return Err(err);
            }
        };

        let session = {
            let mut state = self.lock();
            let expires_in = grant.expires_in;
            let Some(session) = Session::new(
                grant.access_token,
                grant.refresh_token,
                expires_in,
                self.inner.clock.now(),
            ) else {
                state.phase = SessionState::Unauthenticated;
                drop(state);
                warn!("Token grant carried an unusable expires_in {}", expires_in);
                return Err(AuthError::Rejected(format!("invalid expires_in {}", expires_in)));
            };
            state.session = Some(session.clone());
            state.phase = SessionState::Authenticated;
            self.arm(&mut state, session.expires_in);
            session
        };

        info!("Session established, expires in {}s", session.expires_in);
        self.emit(SessionEvent::SignedIn);
        Ok(session)
    }

    /// Renew the access token now
    ///
    /// Any failure clears the session and broadcasts
    /// [`SessionEvent::ReauthenticationRequired`]; refresh is never retried.
    pub async fn refresh(&self) -> Result<Session, RefreshError> {
        let (refresh_token, started) = {
            let mut state = self.lock();
            match state.phase {
                SessionState::Authenticated => {}
                SessionState::Refreshing => {
                    debug!("Refresh already in flight");
                    return Err(RefreshError::InProgress);
                }
                _ => return Err(RefreshError::MissingSession),
            }
            let Some(session) = state.session.as_ref() else {
                return Err(RefreshError::MissingSession);
            };
            match session.refresh_token.clone() {
                Some(token) => {
                    state.phase = SessionState::Refreshing;
                    (token, state.generation)
                }
                None => {
                    self.fail(&mut state);
                    drop(state);
                    error!("Session has no refresh token, login required");
                    self.emit(SessionEvent::ReauthenticationRequired);
                    return Err(RefreshError::MissingRefreshToken);
                }
            }
        };

        let result = self.inner.endpoint.refresh_token(&refresh_token).await;

        let mut state = self.lock();
        if state.phase != SessionState::Refreshing || state.generation != started {
            debug!("Session changed while refreshing, discarding result");
            if state.phase == SessionState::Refreshing {
                state.phase = SessionState::Authenticated;
            }
            return Err(result.err().unwrap_or(RefreshError::MissingSession));
        }

        let now = self.inner.clock.now();
        let result = result.and_then(|refreshed| {
            let session = state.session.as_mut().ok_or(RefreshError::MissingSession)?;
            let expires_in = refreshed.expires_in;
            let renewed = session.renew(
                refreshed.access_token,
                refreshed.refresh_token,
                expires_in,
                now,
            );
            match renewed {
                Some(()) => Ok(session.clone()),
                None => Err(RefreshError::Rejected(format!(
                    "invalid expires_in {}",
                    expires_in
                ))),
            }
        });

        match result {
            Ok(session) => {
                state.phase = SessionState::Authenticated;
                self.arm(&mut state, session.expires_in);
                drop(state);

                info!("Access token renewed, expires in {}s", session.expires_in);
                self.emit(SessionEvent::Renewed);
                Ok(session)
            }
            Err(err) => {
                self.fail(&mut state);
                drop(state);

                error!("Token refresh failed, login required: {}", err);
                self.emit(SessionEvent::ReauthenticationRequired);
                Err(err)
            }
        }
    }

    /// Cancel the renewal timer
    ///
    /// The session itself is kept; it simply will not be renewed any more.
    pub fn shutdown(&self) {
        let mut state = self.lock();
        self.disarm(&mut state);
        state.generation += 1;
        debug!("Session manager shut down");
    }

    fn fail(&self, state: &mut ManagerState) {
        self.disarm(state);
        state.session = None;
        state.phase = SessionState::Failed;
    }

    fn disarm(&self, state: &mut ManagerState) {
        if let Some(handle) = state.renewal.take() {
            self.inner.scheduler.cancel(handle);
        }
    }

    fn arm(&self, state: &mut ManagerState, expires_in: i64) {
        self.disarm(state);
        state.generation += 1;

        let expires_in = Duration::from_secs(expires_in.max(0) as u64);
        let delay = expires_in.saturating_sub(self.inner.renewal_margin);
        let generation = state.generation;
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);

        debug!("Arming token renewal in {}s", delay.as_secs());
        let handle = self.inner.scheduler.schedule(
            delay,
            Box::pin(async move {
                if let Some(inner) = weak.upgrade() {
                    SessionManager { inner }.renewal_due(generation).await;
                }
            }),
        );
        state.renewal = Some(handle);
    }

    async fn renewal_due(&self, generation: u64) {
        {
            let mut state = self.lock();
            if state.generation != generation || state.phase != SessionState::Authenticated {
                debug!("Ignoring stale renewal timer");
                return;
            }
            state.renewal = None;
        }

        // Failures are logged and broadcast by refresh itself
        let _ = self.refresh().await;
    }
}
