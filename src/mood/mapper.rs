use serde::{Deserialize, Serialize};

use super::{Emotion, MoodSummary};

/// Genre used when the mood has no entry of its own
pub const FALLBACK_GENRE: &str = "pop";

const NEUTRAL_TARGET: f64 = 0.5;

/// Catalog query parameters derived from a mood
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatureTarget {
    pub genre_seed: String,
    /// Always within [0, 1]
    pub valence: f64,
    /// Always within [0, 1]
    pub energy: f64,
}

/// Genre seed for a label
pub fn genre_seed(emotion: Option<&Emotion>) -> &'static str {
    match emotion {
        Some(Emotion::Angry) => "rock",
        Some(Emotion::Disgust) => "punk",
        Some(Emotion::Fear) => "ambient",
        Some(Emotion::Happy) => "happy",
        Some(Emotion::Sad) => "sad",
        Some(Emotion::Surprised) => "pop",
        Some(Emotion::Neutral) => "acoustic",
        Some(Emotion::Other(_)) | None => FALLBACK_GENRE,
    }
}

/// Map a mood summary to catalog targets
pub fn map_features(summary: &MoodSummary) -> AudioFeatureTarget {
    let confidence = summary.average_confidence;
    let high = confidence.min(1.0);
    let low = (1.0 - confidence).max(0.0);

    let (valence, energy) = match summary.dominant_emotion {
        Some(Emotion::Happy) | Some(Emotion::Surprised) => (high, high),
        Some(Emotion::Sad) | Some(Emotion::Fear) => (low, low),
        Some(Emotion::Angry) => (low, high),
        _ => (NEUTRAL_TARGET, NEUTRAL_TARGET),
    };

    AudioFeatureTarget {
        genre_seed: genre_seed(summary.dominant_emotion.as_ref()).to_string(),
        valence: unit(valence),
        energy: unit(energy),
    }
}

fn unit(value: f64) -> f64 {
    if value.is_nan() {
        NEUTRAL_TARGET
    } else {
        value.clamp(0.0, 1.0)
    }
}
