use serde::{Deserialize, Serialize};

use super::{Emotion, EmotionSample};

/// Reduction of a window of samples to one mood
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodSummary {
    /// Most frequent label; `None` for an empty window
    pub dominant_emotion: Option<Emotion>,
    /// Mean confidence over every sample in the window, whatever its label
    pub average_confidence: f64,
    /// Number of samples the summary was computed from
    pub sample_count: usize,
}

impl MoodSummary {
    /// Summary of an empty window
    pub fn empty() -> Self {
        Self {
            dominant_emotion: None,
            average_confidence: 0.0,
            sample_count: 0,
        }
    }
}

/// Summarize samples given oldest first
///
/// Ties on the count go to the label that appears first in the window.
pub fn summarize<'a, I>(samples: I) -> MoodSummary
where
    I: IntoIterator<Item = &'a EmotionSample>,
{
    // (label, count) in order of first occurrence
    let mut counts: Vec<(&Emotion, usize)> = Vec::new();
    let mut confidence_sum = 0.0;
    let mut total = 0usize;

    for sample in samples {
        total += 1;
        confidence_sum += sample.confidence;
        match counts.iter_mut().find(|(label, _)| *label == &sample.emotion) {
            Some((_, count)) => *count += 1,
            None => counts.push((&sample.emotion, 1)),
        }
    }

    if total == 0 {
        return MoodSummary::empty();
    }

    let mut dominant: Option<(&Emotion, usize)> = None;
    for &(label, count) in &counts {
        // strict > keeps the earlier label on ties
        if dominant.map_or(true, |(_, best)| count > best) {
            dominant = Some((label, count));
        }
    }

    MoodSummary {
        dominant_emotion: dominant.map(|(label, _)| label.clone()),
        average_confidence: confidence_sum / total as f64,
        sample_count: total,
    }
}
