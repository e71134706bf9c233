use crate::assign::CellAssignment;
use crate::graph::TrajectoryGraph;
use anyhow::{bail, Error};
use log::warn;
use std::fmt::Display;
use traj_types::pseudotime::PseudotimeVector;

/// The pseudotime assigner was invoked with an empty root set.
#[derive(Debug)]
pub struct MissingRootError;

impl std::error::Error for MissingRootError {}

impl Display for MissingRootError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("pseudotime requires at least one root node")
    }
}

/// Result of a pseudotime assignment. Partitions with no reachable root are
/// reported here; their cells carry the undefined sentinel in `pseudotime`.
#[derive(Clone, Debug)]
pub struct PseudotimeOutcome {
    pub pseudotime: PseudotimeVector,
    /// Per-node shortest-path distance to the nearest root.
    pub node_distances: Vec<Option<f64>>,
    /// Partition ids (see `TrajectoryGraph::partitions`) containing no root.
    pub unreachable_partitions: Vec<usize>,
}

/// Compute per-cell pseudotime as the shortest-path distance from each
/// cell's assigned node to the nearest root, plus the cell's local offset.
///
/// Deterministic: identical `(graph, assignments, roots)` inputs yield
/// identical outputs. Ties among equidistant roots resolve to the minimum
/// distance; which root attains it is not reported.
pub fn assign_pseudotime(
    graph: &TrajectoryGraph,
    assignments: &[CellAssignment],
    roots: &[usize],
) -> Result<PseudotimeOutcome, Error> {
    if roots.is_empty() {
        return Err(MissingRootError.into());
    }
    let n = graph.node_count();
    for &r in roots {
        if r >= n {
            bail!("root node {} outside 0..{}", r, n);
        }
    }
    for a in assignments {
        if a.node >= n {
            bail!("cell assigned to node {} outside 0..{}", a.node, n);
        }
    }

    let mut node_distances: Vec<Option<f64>> = vec![None; n];
    for &r in roots {
        for (best, d) in node_distances.iter_mut().zip(graph.distances_from(r)?) {
            *best = match (*best, d) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
        }
    }

    let partitions = graph.partitions();
    let mut unreachable_partitions: Vec<usize> = partitions
        .iter()
        .zip(node_distances.iter())
        .filter_map(|(&p, d)| d.is_none().then_some(p))
        .collect();
    unreachable_partitions.sort_unstable();
    unreachable_partitions.dedup();
    if !unreachable_partitions.is_empty() {
        warn!(
            "{} of {} partitions contain no root; their cells have undefined pseudotime",
            unreachable_partitions.len(),
            partitions.iter().max().map_or(0, |&p| p + 1),
        );
    }

    let values = assignments
        .iter()
        .map(|a| node_distances[a.node].map(|d| d + a.offset))
        .collect();

    Ok(PseudotimeOutcome {
        pseudotime: PseudotimeVector::new(values),
        node_distances,
        unreachable_partitions,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};

    fn zero_centroids(n: usize) -> Array2<f64> {
        Array2::zeros((n, 1))
    }

    fn on_node(node: usize) -> CellAssignment {
        CellAssignment { node, offset: 0.0 }
    }

    #[test]
    fn test_missing_root() {
        let g = TrajectoryGraph::from_edges(&zero_centroids(2), &[(0, 1, 1.0)]).unwrap();
        let err = assign_pseudotime(&g, &[on_node(0)], &[]).unwrap_err();
        assert!(err.is::<MissingRootError>());
    }

    #[test]
    fn test_root_cell_is_zero_and_nonnegative() {
        let g = TrajectoryGraph::from_edges(&zero_centroids(3), &[(0, 1, 2.0), (1, 2, 3.0)]).unwrap();
        let cells = vec![on_node(0), on_node(1), on_node(2)];
        let out = assign_pseudotime(&g, &cells, &[0]).unwrap();
        assert_eq!(out.pseudotime.values[0], Some(0.0));
        for v in out.pseudotime.values.iter().flatten() {
            assert!(*v >= 0.0);
        }
        assert!(out.unreachable_partitions.is_empty());
    }

    #[test]
    fn test_local_offset_added() {
        let g = TrajectoryGraph::from_edges(&zero_centroids(2), &[(0, 1, 2.0)]).unwrap();
        let cells = vec![CellAssignment { node: 1, offset: 0.5 }];
        let out = assign_pseudotime(&g, &cells, &[0]).unwrap();
        assert_abs_diff_eq!(out.pseudotime.values[0].unwrap(), 2.5);
    }

    #[test]
    fn test_monotone_along_path() {
        // path 0-1-2-3 with increasing cumulative weight
        let g =
            TrajectoryGraph::from_edges(&zero_centroids(4), &[(0, 1, 1.0), (1, 2, 0.5), (2, 3, 2.0)]).unwrap();
        let cells: Vec<_> = (0..4).map(on_node).collect();
        let out = assign_pseudotime(&g, &cells, &[0]).unwrap();
        let vals: Vec<f64> = out.pseudotime.values.iter().map(|v| v.unwrap()).collect();
        for w in vals.windows(2) {
            assert!(w[1] >= w[0]);
        }
    }

    #[test]
    fn test_unreachable_partition_reported_not_dropped() {
        // nodes 0-1 connected, node 2 isolated
        let g = TrajectoryGraph::from_edges(&zero_centroids(3), &[(0, 1, 1.0)]).unwrap();
        let cells = vec![on_node(0), on_node(1), on_node(2)];
        let out = assign_pseudotime(&g, &cells, &[0]).unwrap();
        assert_eq!(out.pseudotime.len(), 3);
        assert_eq!(out.pseudotime.values[2], None);
        assert_eq!(out.unreachable_partitions, vec![1]);
    }

    #[test]
    fn test_all_unreachable_not_fatal() {
        let g = TrajectoryGraph::from_edges(&zero_centroids(3), &[(1, 2, 1.0)]).unwrap();
        // root in the singleton partition, all cells in the other
        let cells = vec![on_node(1), on_node(2)];
        let out = assign_pseudotime(&g, &cells, &[0]).unwrap();
        assert_eq!(out.pseudotime.values, vec![None, None]);
        assert_eq!(out.unreachable_partitions, vec![1]);
    }

    #[test]
    fn test_multiple_roots_take_min() {
        let g = TrajectoryGraph::from_edges(&zero_centroids(3), &[(0, 1, 5.0), (1, 2, 1.0)]).unwrap();
        let cells = vec![on_node(1)];
        let out = assign_pseudotime(&g, &cells, &[0, 2]).unwrap();
        assert_abs_diff_eq!(out.pseudotime.values[0].unwrap(), 1.0);
    }

    #[test]
    fn test_idempotent() {
        let centroids = array![[0.0, 0.0], [1.0, 0.3], [2.0, -0.7], [5.0, 5.0]];
        let g = TrajectoryGraph::from_centroids_mst(&centroids, Some(3.0)).unwrap();
        let cells = vec![
            CellAssignment { node: 0, offset: 0.1 },
            CellAssignment { node: 2, offset: 0.9 },
            CellAssignment { node: 3, offset: 0.2 },
        ];
        let a = assign_pseudotime(&g, &cells, &[0]).unwrap();
        let b = assign_pseudotime(&g, &cells, &[0]).unwrap();
        assert_eq!(a.pseudotime, b.pseudotime);
        assert_eq!(a.node_distances, b.node_distances);
        assert_eq!(a.unreachable_partitions, b.unreachable_partitions);
    }
}
