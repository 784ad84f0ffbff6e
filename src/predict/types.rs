//! Prediction records and the finalized session result.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::capture::Modality;

/// One label returned by the prediction service for one sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prediction {
    pub modality: Modality,
    /// Emotion label exactly as the service returned it.
    pub label: String,
    /// Capture time of the sample this prediction was made from.
    pub source_sample_timestamp: DateTime<Utc>,
}

/// How a [`FinalResult`] was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationMode {
    /// Exactly one prediction was recorded; its label is reported verbatim.
    SingleModality,
    /// Several predictions were pooled and the majority label reported.
    Combined,
}

impl fmt::Display for AggregationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregationMode::SingleModality => f.write_str("single"),
            AggregationMode::Combined => f.write_str("combined"),
        }
    }
}

/// Label reported for a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalResult {
    pub label: String,
    pub mode: AggregationMode,
}

impl FinalResult {
    pub fn single(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            mode: AggregationMode::SingleModality,
        }
    }

    /// Text shown to the user, e.g. `"The predicted emotion is happy"`.
    pub fn message(&self) -> String {
        match self.mode {
            AggregationMode::SingleModality => format!("The predicted emotion is {}", self.label),
            AggregationMode::Combined => {
                format!("The global predicted emotion is {}", self.label)
            }
        }
    }
}
