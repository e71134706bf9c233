use anyhow::{bail, Error};
use ndarray::{Array1, Array2, ArrayView1};
use petgraph::algo::min_spanning_tree;
use petgraph::data::FromElements;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;

/// An undirected weighted graph over representative points (cluster
/// centroids or principal points). Edges carry Euclidean distances; trees by
/// construction when built as an MST, but disconnected components across
/// partitions are expected and no cycle invariant is enforced.
#[derive(Clone, Debug)]
pub struct TrajectoryGraph {
    graph: UnGraph<Array1<f64>, f64>,
}

fn euclidean(a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (y - x).powi(2)).sum::<f64>().sqrt()
}

impl TrajectoryGraph {
    /// Build a Euclidean minimum spanning tree over the rows of `centroids`.
    /// If `max_edge_len` is given, MST edges longer than it are dropped,
    /// splitting the tree into multiple partitions.
    pub fn from_centroids_mst(centroids: &Array2<f64>, max_edge_len: Option<f64>) -> Result<TrajectoryGraph, Error> {
        let n = centroids.nrows();
        if n == 0 {
            bail!("cannot build a trajectory graph with no nodes");
        }
        let mut complete = UnGraph::<Array1<f64>, f64>::with_capacity(n, n * (n - 1) / 2);
        for i in 0..n {
            complete.add_node(centroids.row(i).to_owned());
        }
        for i in 0..n {
            for j in i + 1..n {
                let d = euclidean(&centroids.row(i), &centroids.row(j));
                complete.add_edge(NodeIndex::new(i), NodeIndex::new(j), d);
            }
        }
        let mut graph = UnGraph::from_elements(min_spanning_tree(&complete));
        if let Some(max_len) = max_edge_len {
            graph.retain_edges(|g, e| g[e] <= max_len);
        }
        Ok(TrajectoryGraph { graph })
    }

    /// Assemble a graph from an explicit edge list. Node indices must be in
    /// bounds and edge weights non-negative; cycles are permitted.
    pub fn from_edges(centroids: &Array2<f64>, edges: &[(usize, usize, f64)]) -> Result<TrajectoryGraph, Error> {
        let n = centroids.nrows();
        if n == 0 {
            bail!("cannot build a trajectory graph with no nodes");
        }
        let mut graph = UnGraph::<Array1<f64>, f64>::with_capacity(n, edges.len());
        for i in 0..n {
            graph.add_node(centroids.row(i).to_owned());
        }
        for &(a, b, w) in edges {
            if a >= n || b >= n {
                bail!("edge ({}, {}) references a node outside 0..{}", a, b, n);
            }
            if w < 0.0 || w.is_nan() {
                bail!("edge ({}, {}) has invalid weight {}", a, b, w);
            }
            graph.add_edge(NodeIndex::new(a), NodeIndex::new(b), w);
        }
        Ok(TrajectoryGraph { graph })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Centroid coordinates of node `i`.
    pub fn centroid(&self, i: usize) -> ArrayView1<f64> {
        self.graph[NodeIndex::new(i)].view()
    }

    /// Edge list as `(source, target, weight)` triples.
    pub fn edges(&self) -> Vec<(usize, usize, f64)> {
        self.graph
            .edge_references()
            .map(|e| (e.source().index(), e.target().index(), *e.weight()))
            .collect()
    }

    /// Partition id per node. Partitions are connected components, labeled
    /// compactly in order of first appearance by ascending node index.
    pub fn partitions(&self) -> Vec<usize> {
        let n = self.graph.node_count();
        let mut uf = UnionFind::<usize>::new(n);
        for e in self.graph.edge_references() {
            uf.union(e.source().index(), e.target().index());
        }
        let labeling = uf.into_labeling();
        let mut remap = vec![usize::MAX; n];
        let mut next = 0;
        labeling
            .into_iter()
            .map(|root| {
                if remap[root] == usize::MAX {
                    remap[root] = next;
                    next += 1;
                }
                remap[root]
            })
            .collect()
    }

    /// Shortest-path distance from `root` to every node, `None` where no
    /// path exists.
    pub fn distances_from(&self, root: usize) -> Result<Vec<Option<f64>>, Error> {
        let n = self.graph.node_count();
        if root >= n {
            bail!("root node {} outside 0..{}", root, n);
        }
        let dist = petgraph::algo::dijkstra(&self.graph, NodeIndex::new(root), None, |e| *e.weight());
        Ok((0..n).map(|i| dist.get(&NodeIndex::new(i)).copied()).collect())
    }
}
