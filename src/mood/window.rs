use std::collections::VecDeque;

use super::EmotionSample;

/// Default number of samples kept, one minute at one sample per second
pub const DEFAULT_WINDOW_CAPACITY: usize = 60;

/// Fixed-capacity FIFO of the most recent samples, oldest first
#[derive(Debug, Clone)]
pub struct SampleWindow {
    samples: VecDeque<EmotionSample>,
    capacity: usize,
}

impl Default for SampleWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}

impl SampleWindow {
    /// Create an empty window; a zero capacity is bumped to one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest ones beyond capacity
    pub fn push(&mut self, sample: EmotionSample) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Ordered copy of the current contents
    pub fn snapshot(&self) -> Vec<EmotionSample> {
        self.samples.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EmotionSample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
