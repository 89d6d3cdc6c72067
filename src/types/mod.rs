//! Core types for the genre-daemon.
//!
//! This module re-exports all the core data types used throughout the daemon:
//! - [`ClassificationResult`]: Genre plus recommendations for one clip
//! - [`AudioMetadata`]: Descriptive properties of a decoded clip
//! - [`TextGenConfig`]: Architecture parameters of the text-generation model

mod config;
mod result;

// Re-export all types at the module level
pub use config::TextGenConfig;
pub use result::{AudioMetadata, ClassificationResult};
