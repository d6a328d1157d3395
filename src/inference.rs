//! Emotion inference collaborators
//!
//! A [`FrameSource`] produces still images, an [`EmotionDetector`] turns one
//! into an [`EmotionSample`]. [`InferenceClient`] talks to the HTTP
//! classifier service.

use async_trait::async_trait;
use log::debug;
use reqwest::{multipart, Client};
use serde::Deserialize;
use thiserror::Error;

use crate::config::ClientOptions;
use crate::fetch::{Fetch, FetchError};
use crate::mood::EmotionSample;

/// Failure to classify a frame
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("No image available")]
    NoImage,

    #[error("Inference request failed: {0}")]
    Fetch(#[from] FetchError),

    /// The service answered but reported an error, e.g. no face in frame
    #[error("Inference rejected: {0}")]
    Rejected(String),
}

/// Capture surface producing still images on demand
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Grab one JPEG frame, or `None` if no frame is ready yet
    async fn capture(&self) -> Option<Vec<u8>>;
}

/// Classifies a still image
#[async_trait]
pub trait EmotionDetector: Send + Sync {
    async fn detect(&self, image: Vec<u8>) -> Result<EmotionSample, InferenceError>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PredictResponse {
    Prediction(EmotionSample),
    Failure { error: String },
}

/// Client for the classifier's `/predict` endpoint
#[derive(Debug, Clone)]
pub struct InferenceClient {
    base_url: String,
    http_client: Client,
}

impl InferenceClient {
    /// Create a new inference client
    pub fn new(options: &ClientOptions, http_client: Client) -> Self {
        Self {
            base_url: options.inference_url.trim_end_matches('/').to_string(),
            http_client,
        }
    }
}

#[async_trait]
impl EmotionDetector for InferenceClient {
    async fn detect(&self, image: Vec<u8>) -> Result<EmotionSample, InferenceError> {
        if image.is_empty() {
            return Err(InferenceError::NoImage);
        }

        let part = multipart::Part::bytes(image)
            .file_name("webcam.jpg")
            .mime_str("image/jpeg")
            .map_err(FetchError::from)?;
        let form = multipart::Form::new().part("image", part);

        debug!("Posting frame for inference");
        let url = format!("{}/predict", self.base_url);
        let response = Fetch::post(&self.http_client, &url)
            .multipart(form)
            .execute::<PredictResponse>()
            .await?;

        match response {
            PredictResponse::Prediction(sample) => Ok(sample.normalized()),
            PredictResponse::Failure { error } => Err(InferenceError::Rejected(error)),
        }
    }
}
