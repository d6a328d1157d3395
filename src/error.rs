//! Error handling for the MoodTune client

use std::fmt;
use thiserror::Error;

use crate::auth::{AuthError, RefreshError};
use crate::catalog::RecommendationError;
use crate::fetch::FetchError;
use crate::inference::InferenceError;

/// Unified error type for the MoodTune client
#[derive(Error, Debug)]
pub enum Error {
    /// Sign-in failures
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Token renewal failures
    #[error("Refresh error: {0}")]
    Refresh(#[from] RefreshError),

    /// Classifier failures
    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    /// Catalog failures
    #[error("Recommendation error: {0}")]
    Recommendation(#[from] RecommendationError),

    /// Transport failures outside the above
    #[error("Request error: {0}")]
    Fetch(#[from] FetchError),

    /// Network client construction errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Missing or malformed configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
