//! Emotion prediction: the remote classifier and per-session aggregation.
//!
//! This module provides:
//! * [`PredictionClient`]: async trait implemented by all classifier backends.
//! * [`HttpPredictionClient`]: JSON-over-HTTP client for the prediction service.
//! * [`PredictionAggregator`]: pools a session's predictions and picks the
//!   majority label.
//! * [`PredictionError`] / [`EmptySessionError`]: error variants.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use emotion_capture::capture::Sample;
//! use emotion_capture::config::AppConfig;
//! use emotion_capture::predict::{HttpPredictionClient, PredictionAggregator, PredictionClient};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let client = HttpPredictionClient::from_config(&config.service).unwrap();
//!     let aggregator = PredictionAggregator::new();
//!
//!     aggregator.start();
//!     let wav = std::fs::read("recording.wav").unwrap();
//!     let prediction = client.predict(Sample::audio(wav, 0)).await.unwrap();
//!     aggregator.record(prediction);
//!
//!     println!("{}", aggregator.finalize().unwrap().message());
//! }
//! ```

pub mod aggregator;
pub mod client;
pub mod types;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use aggregator::{majority_label, EmptySessionError, PredictionAggregator};
pub use client::{HttpPredictionClient, PredictionClient, PredictionError};
pub use types::{AggregationMode, FinalResult, Prediction};

// test-only re-export so the capture tests can script service responses.
#[cfg(test)]
pub use client::MockPredictionClient;
