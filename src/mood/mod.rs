//! Mood aggregation and recommendation mapping
//!
//! Samples land in a [`SampleWindow`], get reduced by [`summarize`] and turned
//! into catalog parameters by [`map_features`]. Everything here is pure and
//! synchronous; ownership of the window is up to the caller.

mod aggregate;
mod emotion;
mod mapper;
mod sample;
mod window;

pub use aggregate::*;
pub use emotion::*;
pub use mapper::*;
pub use sample::{EmotionSample, FaceBox};
pub use window::*;
