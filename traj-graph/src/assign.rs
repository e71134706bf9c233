use crate::graph::TrajectoryGraph;
use anyhow::{bail, Error};
use ndarray::Array2;

/// A cell's nearest graph node and its residual (intra-node) distance from
/// that node's centroid. The offset is added to the cell's pseudotime.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellAssignment {
    pub node: usize,
    pub offset: f64,
}

/// Map each cell (row of `embedding`) to its nearest graph node by
/// Euclidean distance to the node centroid.
pub fn assign_cells(graph: &TrajectoryGraph, embedding: &Array2<f64>) -> Result<Vec<CellAssignment>, Error> {
    let n = graph.node_count();
    if n == 0 {
        bail!("cannot assign cells to an empty graph");
    }
    if embedding.ncols() != graph.centroid(0).len() {
        bail!(
            "embedding dimension ({}) does not match centroid dimension ({})",
            embedding.ncols(),
            graph.centroid(0).len()
        );
    }
    let mut assignments = Vec::with_capacity(embedding.nrows());
    for row in embedding.rows() {
        let mut best = CellAssignment {
            node: 0,
            offset: f64::INFINITY,
        };
        for i in 0..n {
            let c = graph.centroid(i);
            let d = row
                .iter()
                .zip(c.iter())
                .map(|(x, y)| (y - x).powi(2))
                .sum::<f64>()
                .sqrt();
            if d < best.offset {
                best = CellAssignment { node: i, offset: d };
            }
        }
        assignments.push(best);
    }
    Ok(assignments)
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_nearest_node_with_offset() {
        let centroids = array![[0.0, 0.0], [10.0, 0.0]];
        let g = TrajectoryGraph::from_edges(&centroids, &[(0, 1, 10.0)]).unwrap();
        let embedding = array![[0.0, 0.0], [9.0, 0.0], [4.0, 3.0]];
        let assignments = assign_cells(&g, &embedding).unwrap();

        assert_eq!(assignments[0].node, 0);
        assert_abs_diff_eq!(assignments[0].offset, 0.0);
        assert_eq!(assignments[1].node, 1);
        assert_abs_diff_eq!(assignments[1].offset, 1.0);
        assert_eq!(assignments[2].node, 0);
        assert_abs_diff_eq!(assignments[2].offset, 5.0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let centroids = array![[0.0, 0.0]];
        let g = TrajectoryGraph::from_edges(&centroids, &[]).unwrap();
        let embedding = array![[0.0, 0.0, 0.0]];
        assert!(assign_cells(&g, &embedding).is_err());
    }
}
