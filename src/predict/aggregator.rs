//! Session-scoped pooling of predictions and the majority-vote rule.
//!
//! [`PredictionAggregator`] is shared between the combined-capture loop and
//! the audio path, so appends go through a mutex and land in completion
//! order. The lock is never held across an `.await`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use super::types::{AggregationMode, FinalResult, Prediction};

/// `finalize` was called on a session with no recorded prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("session finished without any prediction")]
pub struct EmptySessionError;

/// Append-only, arrival-ordered prediction sequence for one session.
#[derive(Debug, Default)]
pub struct PredictionAggregator {
    predictions: Mutex<Vec<Prediction>>,
}

impl PredictionAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new session, discarding anything left from the previous one.
    pub fn start(&self) {
        self.lock().clear();
    }

    /// Append `prediction`. No sorting, no deduplication.
    pub fn record(&self, prediction: Prediction) {
        log::debug!(
            "aggregator: recorded {} prediction {:?}",
            prediction.modality,
            prediction.label
        );
        self.lock().push(prediction);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the sequence recorded so far.
    pub fn predictions(&self) -> Vec<Prediction> {
        self.lock().clone()
    }

    /// Close the session and compute its label.
    ///
    /// The sequence is drained, so a session can only be finalized once; a
    /// second call fails with [`EmptySessionError`] until new predictions are
    /// recorded.
    pub fn finalize(&self) -> Result<FinalResult, EmptySessionError> {
        let predictions = std::mem::take(&mut *self.lock());

        match predictions.as_slice() {
            [] => Err(EmptySessionError),
            [only] => Ok(FinalResult::single(only.label.clone())),
            pooled => {
                let label = majority_label(pooled.iter().map(|p| p.label.as_str()))
                    .ok_or(EmptySessionError)?;
                log::info!(
                    "aggregator: {} predictions pooled, majority {:?}",
                    pooled.len(),
                    label
                );
                Ok(FinalResult {
                    label,
                    mode: AggregationMode::Combined,
                })
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Prediction>> {
        self.predictions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Most frequent label in `labels`.
///
/// Ties go to the tied label that occurred first in arrival order, wherever
/// its later occurrences fall.
pub fn majority_label<'a>(labels: impl IntoIterator<Item = &'a str>) -> Option<String> {
    // Counts in first-occurrence order.
    let mut counts: Vec<(&str, usize)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for label in labels {
        match index.get(label) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(label, counts.len());
                counts.push((label, 1));
            }
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (label, count) in counts {
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((label, count)),
        }
    }

    best.map(|(label, _)| label.to_string())
}
