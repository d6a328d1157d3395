//! Session data for the streaming platform

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Live credential pair plus its expiry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// The access token
    pub access_token: String,

    /// The refresh token, absent if the platform did not issue one
    pub refresh_token: Option<String>,

    /// Lifetime of the access token in seconds, as issued
    pub expires_in: i64,

    /// When the access token stops being valid
    pub expires_at: DateTime<Utc>,
}

/// Absolute expiry for a lifetime issued at `now`
///
/// `None` for a non-positive lifetime or one past chrono's representable range.
fn expiry(now: DateTime<Utc>, expires_in: i64) -> Option<DateTime<Utc>> {
    if expires_in <= 0 {
        return None;
    }
    Duration::try_seconds(expires_in).and_then(|lifetime| now.checked_add_signed(lifetime))
}

impl Session {
    /// Create a new session issued at `now`
    ///
    /// Returns `None` when `expires_in` does not describe a usable lifetime.
    pub fn new(
        access_token: String,
        refresh_token: Option<String>,
        expires_in: i64,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        Some(Self {
            access_token,
            refresh_token,
            expires_in,
            expires_at: expiry(now, expires_in)?,
        })
    }

    /// Replace the access token after a refresh issued at `now`
    ///
    /// The refresh token is only replaced when the platform rotated it. An
    /// unusable `expires_in` leaves the session untouched and returns `None`.
    pub fn renew(
        &mut self,
        access_token: String,
        refresh_token: Option<String>,
        expires_in: i64,
        now: DateTime<Utc>,
    ) -> Option<()> {
        let expires_at = expiry(now, expires_in)?;
        self.access_token = access_token;
        if refresh_token.is_some() {
            self.refresh_token = refresh_token;
        }
        self.expires_in = expires_in;
        self.expires_at = expires_at;
        Some(())
    }

    /// Check if the session has expired
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
