//! Shared data model for trajectory inference

pub mod matrix;
pub mod metadata;
pub mod pseudotime;
