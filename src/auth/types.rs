//! Types for the token lifecycle

use crate::fetch::FetchError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Token response for an authorization-code exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenGrant {
    /// The access token
    pub access_token: String,

    /// The refresh token
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// The expiry time in seconds
    pub expires_in: i64,

    /// The token type
    #[serde(default)]
    pub token_type: Option<String>,

    /// Granted scopes, space separated
    #[serde(default)]
    pub scope: Option<String>,
}

/// Token response for a refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRefresh {
    /// The new access token
    pub access_token: String,

    /// The expiry time in seconds
    pub expires_in: i64,

    /// Present only when the platform rotates refresh tokens
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Where the session manager currently is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Exchanging,
    Authenticated,
    Refreshing,
    Failed,
}

/// Broadcast to subscribers of a session manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A session was established through a code exchange
    SignedIn,
    /// The access token was renewed
    Renewed,
    /// The session was cleared; the user has to go through login again
    ReauthenticationRequired,
}

/// Failure to establish a session
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authorization code missing")]
    MissingCode,

    #[error("Authorization code exchange failed: {0}")]
    Exchange(#[from] FetchError),

    #[error("Authorization rejected: {0}")]
    Rejected(String),
}

/// Failure to renew a session; always terminal for that session
#[derive(Error, Debug)]
pub enum RefreshError {
    #[error("No session to refresh")]
    MissingSession,

    #[error("A refresh is already in flight")]
    InProgress,

    #[error("Session has no refresh token")]
    MissingRefreshToken,

    #[error("Token refresh failed: {0}")]
    Refresh(#[from] FetchError),

    /// The accounts service answered with a token that cannot be used
    #[error("Token refresh rejected: {0}")]
    Rejected(String),
}
