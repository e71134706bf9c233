use crate::assign::CellAssignment;
use crate::graph::TrajectoryGraph;
use anyhow::{bail, Error};
use log::info;
use std::collections::BTreeSet;

/// Order time labels: numeric where every label carries a number (e.g.
/// "E10" < "E12" < "E9" lexicographically, but 9 < 10 < 12 numerically),
/// lexicographic otherwise.
fn earliest_label<'a>(labels: &BTreeSet<&'a str>) -> Option<&'a str> {
    let numeric: Option<Vec<(f64, &str)>> = labels
        .iter()
        .map(|&l| {
            let digits: String = l.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
            digits.parse::<f64>().ok().map(|v| (v, l))
        })
        .collect();
    match numeric {
        Some(mut pairs) => {
            pairs.sort_by(|a, b| a.partial_cmp(b).unwrap());
            pairs.first().map(|&(_, l)| l)
        }
        // BTreeSet iterates in lexicographic order
        None => labels.iter().next().copied(),
    }
}

/// Select a root node when none is supplied: the node with the greatest
/// fraction of assigned cells labeled with the earliest time value in the
/// dataset. A heuristic, not a guarantee; ties break to the lowest node
/// index. Fails if no cell carries a time label.
pub fn select_root(
    graph: &TrajectoryGraph,
    assignments: &[CellAssignment],
    time_labels: &[Option<&str>],
) -> Result<usize, Error> {
    if assignments.len() != time_labels.len() {
        bail!(
            "assignment count ({}) does not match time label count ({})",
            assignments.len(),
            time_labels.len()
        );
    }
    let distinct: BTreeSet<&str> = time_labels.iter().flatten().copied().collect();
    let Some(earliest) = earliest_label(&distinct) else {
        bail!("cannot select a root: no cell carries a time label");
    };
    info!("earliest time label: {}", earliest);

    let n = graph.node_count();
    let mut total = vec![0usize; n];
    let mut early = vec![0usize; n];
    for (a, label) in assignments.iter().zip(time_labels) {
        if a.node >= n {
            bail!("cell assigned to node {} outside 0..{}", a.node, n);
        }
        total[a.node] += 1;
        if *label == Some(earliest) {
            early[a.node] += 1;
        }
    }

    let mut best = 0usize;
    let mut best_frac = -1.0f64;
    for i in 0..n {
        let frac = if total[i] == 0 {
            0.0
        } else {
            early[i] as f64 / total[i] as f64
        };
        if frac > best_frac {
            best = i;
            best_frac = frac;
        }
    }
    info!(
        "selected root node {} ({:.1}% earliest-label cells)",
        best,
        100.0 * best_frac
    );
    Ok(best)
}

#[cfg(test)]
mod test {
    use super::*;
    use ndarray::Array2;

    fn path_graph(n: usize) -> TrajectoryGraph {
        let edges: Vec<_> = (0..n - 1).map(|i| (i, i + 1, 1.0)).collect();
        TrajectoryGraph::from_edges(&Array2::zeros((n, 1)), &edges).unwrap()
    }

    fn on_node(node: usize) -> CellAssignment {
        CellAssignment { node, offset: 0.0 }
    }

    #[test]
    fn test_toy_three_node_case() {
        // node 0: 100% earliest-label cells, nodes 1 and 2: 0%
        let g = path_graph(3);
        let assignments = vec![on_node(0), on_node(0), on_node(1), on_node(2)];
        let labels = vec![Some("E9"), Some("E9"), Some("E12"), Some("E12")];
        assert_eq!(select_root(&g, &assignments, &labels).unwrap(), 0);
    }

    #[test]
    fn test_numeric_label_ordering() {
        // lexicographically "E10" < "E9", numerically 9 < 10
        let g = path_graph(2);
        let assignments = vec![on_node(0), on_node(1)];
        let labels = vec![Some("E10"), Some("E9")];
        assert_eq!(select_root(&g, &assignments, &labels).unwrap(), 1);
    }

    #[test]
    fn test_tie_breaks_to_lowest_node() {
        let g = path_graph(3);
        let assignments = vec![on_node(1), on_node(2)];
        let labels = vec![Some("d0"), Some("d0")];
        // nodes 1 and 2 both score 1.0; node 1 is encountered first
        assert_eq!(select_root(&g, &assignments, &labels).unwrap(), 1);
    }

    #[test]
    fn test_empty_node_scores_zero() {
        let g = path_graph(3);
        let assignments = vec![on_node(2)];
        let labels = vec![Some("d0")];
        assert_eq!(select_root(&g, &assignments, &labels).unwrap(), 2);
    }

    #[test]
    fn test_no_labels_is_error() {
        let g = path_graph(2);
        let assignments = vec![on_node(0)];
        let labels = vec![None];
        assert!(select_root(&g, &assignments, &labels).is_err());
    }

    #[test]
    fn test_lexicographic_fallback() {
        let g = path_graph(2);
        let assignments = vec![on_node(0), on_node(1)];
        // no digits anywhere, fall back to lexicographic order
        let labels = vec![Some("late"), Some("early")];
        assert_eq!(select_root(&g, &assignments, &labels).unwrap(), 1);
    }
}
