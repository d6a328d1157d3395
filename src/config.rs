//! Configuration options for the MoodTune client

use std::env;
use std::time::Duration;

use crate::auth::{DEFAULT_RENEWAL_MARGIN, DEFAULT_SCOPES};
use crate::catalog::DEFAULT_RECOMMENDATION_LIMIT;
use crate::error::{Error, Result};
use crate::mood::DEFAULT_WINDOW_CAPACITY;

pub const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.spotify.com";
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_INFERENCE_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:3000/";

/// Configuration options for the MoodTune client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// OAuth client id registered with the music platform
    pub client_id: String,

    /// OAuth client secret
    pub client_secret: String,

    /// Where the authorization server sends the user back to
    pub redirect_uri: String,

    /// Scopes requested at sign-in
    pub scopes: Vec<String>,

    /// Base URL of the accounts service
    pub accounts_url: String,

    /// Base URL of the catalog Web API
    pub api_url: String,

    /// Base URL of the emotion classifier
    pub inference_url: String,

    /// The request timeout
    pub request_timeout: Option<Duration>,

    /// How often a frame is classified
    pub sample_interval: Duration,

    /// Number of samples kept for aggregation
    pub window_capacity: usize,

    /// How long before expiry the access token is renewed
    pub renewal_margin: Duration,

    /// Tracks requested per recommendation
    pub recommendation_limit: u32,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            accounts_url: DEFAULT_ACCOUNTS_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            inference_url: DEFAULT_INFERENCE_URL.to_string(),
            request_timeout: Some(Duration::from_secs(30)),
            sample_interval: Duration::from_secs(1),
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            renewal_margin: DEFAULT_RENEWAL_MARGIN,
            recommendation_limit: DEFAULT_RECOMMENDATION_LIMIT,
        }
    }
}

impl ClientOptions {
    /// Options with the given client credentials and defaults elsewhere
    pub fn new(client_id: &str, client_secret: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            ..Self::default()
        }
    }

    /// Read options from `MOODTUNE_*` environment variables
    ///
    /// `MOODTUNE_CLIENT_ID` and `MOODTUNE_CLIENT_SECRET` are required; the
    /// redirect URI and service URLs fall back to their defaults.
    pub fn from_env() -> Result<Self> {
        let client_id = required_var("MOODTUNE_CLIENT_ID")?;
        let client_secret = required_var("MOODTUNE_CLIENT_SECRET")?;
        let mut options = Self::new(&client_id, &client_secret);

        if let Ok(value) = env::var("MOODTUNE_REDIRECT_URI") {
            options = options.with_redirect_uri(&value);
        }
        if let Ok(value) = env::var("MOODTUNE_INFERENCE_URL") {
            options = options.with_inference_url(&value);
        }
        if let Ok(value) = env::var("MOODTUNE_ACCOUNTS_URL") {
            options = options.with_accounts_url(&value);
        }
        if let Ok(value) = env::var("MOODTUNE_API_URL") {
            options = options.with_api_url(&value);
        }

        Ok(options)
    }

    /// Set the redirect URI
    pub fn with_redirect_uri(mut self, value: &str) -> Self {
        self.redirect_uri = value.to_string();
        self
    }

    /// Replace the requested scopes
    pub fn with_scopes(mut self, scopes: &[&str]) -> Self {
        self.scopes = scopes.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Set the accounts service URL
    pub fn with_accounts_url(mut self, value: &str) -> Self {
        self.accounts_url = value.to_string();
        self
    }

    /// Set the catalog API URL
    pub fn with_api_url(mut self, value: &str) -> Self {
        self.api_url = value.to_string();
        self
    }

    /// Set the classifier URL
    pub fn with_inference_url(mut self, value: &str) -> Self {
        self.inference_url = value.to_string();
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    pub fn with_sample_interval(mut self, value: Duration) -> Self {
        self.sample_interval = value;
        self
    }

    pub fn with_window_capacity(mut self, value: usize) -> Self {
        self.window_capacity = value;
        self
    }

    pub fn with_renewal_margin(mut self, value: Duration) -> Self {
        self.renewal_margin = value;
        self
    }

    pub fn with_recommendation_limit(mut self, value: u32) -> Self {
        self.recommendation_limit = value;
        self
    }
}

fn required_var(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::config(format!("{} is not set", name))),
    }
}
