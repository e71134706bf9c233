//! # traj-rs: trajectory inference pipeline in Rust

#![deny(missing_docs)]
#![deny(warnings)]

/// K-means grouping of embedded cells
pub mod cluster;

/// PCA embedding
pub mod dim_red;

/// Cell and gene metadata loading
pub mod metadata;

/// MTX loading routine
pub mod mtx;

/// Count matrix normalization methods
pub mod normalization;

/// Statistics functions
pub mod stats;
