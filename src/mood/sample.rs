use serde::{Deserialize, Serialize};

use super::Emotion;

/// Bounding box of the detected face, in source image pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

/// One classifier observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionSample {
    pub emotion: Emotion,
    pub confidence: f64,
    #[serde(rename = "face")]
    pub face_box: FaceBox,
}

impl EmotionSample {
    /// Create a sample, clamping `confidence` into [0, 1]
    pub fn new(emotion: Emotion, confidence: f64, face_box: FaceBox) -> Self {
        Self {
            emotion,
            confidence: clamp_unit(confidence),
            face_box,
        }
    }

    /// Same sample with its confidence clamped into [0, 1]
    pub fn normalized(self) -> Self {
        Self::new(self.emotion, self.confidence, self.face_box)
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
