//! Trajectory skeleton graphs and geodesic pseudotime assignment

/// Cell to graph-node assignment
pub mod assign;

/// Trajectory graph over representative points
pub mod graph;

/// Geodesic pseudotime labeling
pub mod pseudotime;

/// Root node selection heuristic
pub mod root;

pub use assign::{assign_cells, CellAssignment};
pub use graph::TrajectoryGraph;
pub use pseudotime::{assign_pseudotime, MissingRootError, PseudotimeOutcome};
pub use root::select_root;
