use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Emotion label reported by the classifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Emotion {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Surprised,
    Neutral,
    /// A label outside the known set, kept verbatim
    Other(String),
}

impl Emotion {
    /// Canonical label
    pub fn as_str(&self) -> &str {
        match self {
            Emotion::Angry => "Angry",
            Emotion::Disgust => "Disgust",
            Emotion::Fear => "Fear",
            Emotion::Happy => "Happy",
            Emotion::Sad => "Sad",
            Emotion::Surprised => "Surprised",
            Emotion::Neutral => "Neutral",
            Emotion::Other(label) => label,
        }
    }
}

impl FromStr for Emotion {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // The classifier says "Surprise", the genre table says "Surprised"
        Ok(match s {
            "Angry" => Emotion::Angry,
            "Disgust" => Emotion::Disgust,
            "Fear" => Emotion::Fear,
            "Happy" => Emotion::Happy,
            "Sad" => Emotion::Sad,
            "Surprise" | "Surprised" => Emotion::Surprised,
            "Neutral" => Emotion::Neutral,
            other => Emotion::Other(other.to_string()),
        })
    }
}

impl From<String> for Emotion {
    fn from(label: String) -> Self {
        match label.parse() {
            Ok(emotion) => emotion,
            Err(never) => match never {},
        }
    }
}

impl From<Emotion> for String {
    fn from(emotion: Emotion) -> Self {
        emotion.as_str().to_string()
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
