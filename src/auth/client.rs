//! Spotify accounts service: authorize URL, callback parsing and token calls

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use url::Url;

use super::types::{AuthError, RefreshError, TokenGrant, TokenRefresh};
use crate::config::ClientOptions;
use crate::fetch::Fetch;

/// Scopes requested when none are configured
pub const DEFAULT_SCOPES: &[&str] = &[
    "streaming",
    "user-read-email",
    "user-read-private",
    "user-library-read",
    "user-library-modify",
    "user-read-playback-state",
    "user-modify-playback-state",
];

/// Performs the token calls on behalf of a session manager
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// Exchange an authorization code for a token pair
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, AuthError>;

    /// Obtain a new access token from a refresh token
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenRefresh, RefreshError>;
}

/// Client for the Spotify accounts service
#[derive(Debug, Clone)]
pub struct SpotifyTokenClient {
    accounts_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    scopes: Vec<String>,
    http_client: Client,
}

impl SpotifyTokenClient {
    /// Create a new token client
    pub fn new(options: &ClientOptions, http_client: Client) -> Self {
        Self {
            accounts_url: options.accounts_url.trim_end_matches('/').to_string(),
            client_id: options.client_id.clone(),
            client_secret: options.client_secret.clone(),
            redirect_uri: options.redirect_uri.clone(),
            scopes: options.scopes.clone(),
            http_client,
        }
    }

    fn token_url(&self) -> String {
        format!("{}/api/token", self.accounts_url)
    }

    /// URL the user is sent to in order to grant access
    pub fn authorize_url(&self, state: Option<&str>) -> String {
        let scopes = self.scopes.join(" ");
        let mut url = format!(
            "{}/authorize?client_id={}&response_type=code&redirect_uri={}&scope={}",
            self.accounts_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(&scopes),
        );

        if let Some(state) = state {
            url.push_str(&format!("&state={}", urlencoding::encode(state)));
        }

        url
    }
}

#[async_trait]
impl TokenEndpoint for SpotifyTokenClient {
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, AuthError> {
        if code.trim().is_empty() {
            return Err(AuthError::MissingCode);
        }

        debug!("Exchanging authorization code");
        let grant = Fetch::post(&self.http_client, &self.token_url())
            .basic_auth(&self.client_id, &self.client_secret)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .execute::<TokenGrant>()
            .await?;

        if grant.access_token.is_empty() {
            return Err(AuthError::Rejected("empty access token".to_string()));
        }

        Ok(grant)
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenRefresh, RefreshError> {
        if refresh_token.is_empty() {
            return Err(RefreshError::MissingRefreshToken);
        }

        debug!("Refreshing access token");
        let refreshed = Fetch::post(&self.http_client, &self.token_url())
            .basic_auth(&self.client_id, &self.client_secret)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .execute::<TokenRefresh>()
            .await?;

        Ok(refreshed)
    }
}

/// Pull the authorization code out of a redirect URL
///
/// Returns the code together with the same URL with `code` scrubbed from its
/// query, or `None` when the URL carries no non-empty code.
pub fn extract_code(callback: &Url) -> Option<(String, Url)> {
    let code = callback
        .query_pairs()
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.into_owned())
        .filter(|code| !code.is_empty())?;

    let remaining: Vec<(String, String)> = callback
        .query_pairs()
        .filter(|(key, _)| key != "code")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut scrubbed = callback.clone();
    if remaining.is_empty() {
        scrubbed.set_query(None);
    } else {
        scrubbed.query_pairs_mut().clear().extend_pairs(remaining);
    }

    Some((code, scrubbed))
}
