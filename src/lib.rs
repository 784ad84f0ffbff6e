//! Emotion capture: orientation-aware photo and audio capture whose samples
//! are classified by a remote prediction service and pooled into one
//! majority-vote result per session.

pub mod app;
pub mod capture;
pub mod config;
pub mod orientation;
pub mod predict;
