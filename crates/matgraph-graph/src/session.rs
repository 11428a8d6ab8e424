//! Graph execution against caller-supplied tensors.
//!
//! A session borrows a frozen graph and evaluates, in insertion order, only
//! the nodes the fetched node depends on. Unbound dims take their size from
//! the fed tensors on each call.

use std::collections::HashMap;

use matgraph_core::{MatgraphError, Result, ShapeSpec, Tensor};
use matgraph_kernels::multiply;
use rayon::prelude::*;
use tracing::debug;

use crate::graph::Graph;
use crate::node::GraphNode;

/// Tensors keyed by Input node name.
pub type Feeds = HashMap<String, Tensor>;

/// Minimum number of feed sets before `run_batch` goes parallel.
const PAR_BATCH_THRESHOLD: usize = 2;

/// Executes a graph. Holds no state between runs.
#[derive(Debug, Clone, Copy)]
pub struct Session<'g> {
    graph: &'g Graph,
}

impl<'g> Session<'g> {
    pub fn new(graph: &'g Graph) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    /// Evaluate `fetch` with the given feeds.
    pub fn run(&self, feeds: &Feeds, fetch: &str) -> Result<Tensor> {
        let target = self
            .graph
            .find(fetch)
            .ok_or_else(|| MatgraphError::UnknownNode(fetch.to_string()))?;

        for (name, tensor) in feeds {
            let spec = match self.graph.find(name).and_then(|id| self.graph.node(id)) {
                Some(GraphNode::Input { shape, .. }) => *shape,
                _ => return Err(MatgraphError::UnknownNode(name.clone())),
            };
            if !spec.is_satisfied_by(tensor.shape()) {
                return Err(MatgraphError::ShapeMismatch {
                    lhs: spec,
                    rhs: ShapeSpec::from(tensor.shape()),
                });
            }
        }

        let order = self.graph.dependencies(target);
        for &id in &order {
            if let Some(GraphNode::Input { name, .. }) = self.graph.node(id) {
                if !feeds.contains_key(name) {
                    return Err(MatgraphError::MissingFeed(name.clone()));
                }
            }
        }

        debug!(fetch, nodes = order.len(), "session run");

        let mut values: Vec<Option<Tensor>> = vec![None; target + 1];
        for id in order {
            let value = match &self.graph.nodes()[id] {
                GraphNode::Input { name, .. } => feeds
                    .get(name)
                    .cloned()
                    .ok_or_else(|| MatgraphError::MissingFeed(name.clone()))?,
                GraphNode::MatMul {
                    name,
                    lhs,
                    rhs,
                    transpose_lhs,
                    transpose_rhs,
                } => {
                    let a = evaluated(&values, *lhs, name)?;
                    let b = evaluated(&values, *rhs, name)?;
                    let c = multiply(a, b, *transpose_lhs, *transpose_rhs)?;
                    debug!(node = %name, shape = %c.shape(), "evaluated");
                    c
                }
            };
            values[id] = Some(value);
        }

        values
            .pop()
            .flatten()
            .ok_or_else(|| MatgraphError::MalformedGraph(format!("node '{fetch}' produced no value")))
    }

    /// Evaluate `fetch` once per feed set. Output `i` belongs to feed set `i`.
    pub fn run_batch(&self, feed_sets: &[Feeds], fetch: &str) -> Result<Vec<Tensor>> {
        debug!(batch = feed_sets.len(), fetch, "session batch run");
        if feed_sets.len() >= PAR_BATCH_THRESHOLD {
            feed_sets.par_iter().map(|feeds| self.run(feeds, fetch)).collect()
        } else {
            feed_sets.iter().map(|feeds| self.run(feeds, fetch)).collect()
        }
    }
}

fn evaluated<'a>(values: &'a [Option<Tensor>], id: usize, user: &str) -> Result<&'a Tensor> {
    values
        .get(id)
        .and_then(Option::as_ref)
        .ok_or_else(|| MatgraphError::MalformedGraph(format!("operand #{id} of '{user}' was not evaluated")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{matmul_graph, GraphBuilder};
    use matgraph_core::Dim;

    fn feeds(pairs: Vec<(&str, Tensor)>) -> Feeds {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn test_run_small_graph() {
        let g = matmul_graph(2, false, false).unwrap();
        let session = Session::new(&g);
        let f = feeds(vec![
            ("x", Tensor::from_rows(&[[1.0, 2.0], [3.0, 4.0]])),
            ("y", Tensor::from_rows(&[[5.0, 6.0], [7.0, 8.0]])),
        ]);
        let out = session.run(&f, "matmul").unwrap();
        assert_eq!(out, Tensor::from_rows(&[[19.0, 22.0], [43.0, 50.0]]));
    }

    #[test]
    fn test_fetch_input_returns_feed() {
        let g = matmul_graph(2, false, false).unwrap();
        let x = Tensor::from_rows(&[[1.0, 2.0]]);
        let f = feeds(vec![("x", x.clone())]);
        assert_eq!(Session::new(&g).run(&f, "x").unwrap(), x);
    }

    #[test]
    fn test_unknown_fetch() {
        let g = matmul_graph(2, false, false).unwrap();
        let err = Session::new(&g).run(&Feeds::new(), "nope").unwrap_err();
        assert!(matches!(err, MatgraphError::UnknownNode(n) if n == "nope"));
    }

    #[test]
    fn test_feed_to_non_input() {
        let g = matmul_graph(2, false, false).unwrap();
        let f = feeds(vec![("matmul", Tensor::zeros(2, 2))]);
        let err = Session::new(&g).run(&f, "matmul").unwrap_err();
        assert!(matches!(err, MatgraphError::UnknownNode(n) if n == "matmul"));
    }

    #[test]
    fn test_unreachable_input_need_not_be_fed() {
        let mut b = GraphBuilder::new();
        let a = b.input("a", ShapeSpec::fixed(1, 2)).unwrap();
        b.input("unused", ShapeSpec::new(Dim::Unbound, Dim::Unbound)).unwrap();
        let w = b.input("w", ShapeSpec::fixed(2, 1)).unwrap();
        b.matmul("out", a, w, false, false).unwrap();
        let g = b.build();

        let f = feeds(vec![
            ("a", Tensor::from_rows(&[[1.0, 2.0]])),
            ("w", Tensor::from_rows(&[[3.0], [4.0]])),
        ]);
        assert_eq!(Session::new(&g).run(&f, "out").unwrap(), Tensor::from_rows(&[[11.0]]));
    }

    #[test]
    fn test_unbound_inner_mismatch_at_run_time() {
        // Both inner axes unbound: only the fed tensors can disagree
        let mut b = GraphBuilder::new();
        let a = b.input("a", ShapeSpec::new(2, Dim::Unbound)).unwrap();
        let w = b.input("w", ShapeSpec::new(Dim::Unbound, 2)).unwrap();
        b.matmul("out", a, w, false, false).unwrap();
        let g = b.build();

        let f = feeds(vec![("a", Tensor::zeros(2, 3)), ("w", Tensor::zeros(4, 2))]);
        let err = Session::new(&g).run(&f, "out").unwrap_err();
        assert_eq!(err.to_string(), "shape mismatch: [2, 3] vs [4, 2]");
    }

    #[test]
    fn test_chained_matmul() {
        let mut b = GraphBuilder::new();
        let a = b.input("a", ShapeSpec::fixed(2, 2)).unwrap();
        let i = b.input("i", ShapeSpec::fixed(2, 2)).unwrap();
        let ai = b.matmul("ai", a, i, false, false).unwrap();
        b.matmul("aii", ai, i, false, true).unwrap();
        let g = b.build();

        let a_val = Tensor::from_rows(&[[1.0, 2.0], [3.0, 4.0]]);
        let f = feeds(vec![
            ("a", a_val.clone()),
            ("i", Tensor::from_rows(&[[1.0, 0.0], [0.0, 1.0]])),
        ]);
        assert_eq!(Session::new(&g).run(&f, "aii").unwrap(), a_val);
    }

    #[test]
    fn test_run_batch_small_and_empty() {
        let g = matmul_graph(1, false, false).unwrap();
        let s = Session::new(&g);
        assert!(s.run_batch(&[], "matmul").unwrap().is_empty());

        let one = vec![feeds(vec![
            ("x", Tensor::from_rows(&[[2.0]])),
            ("y", Tensor::from_rows(&[[3.0]])),
        ])];
        assert_eq!(s.run_batch(&one, "matmul").unwrap(), vec![Tensor::from_rows(&[[6.0]])]);
    }
}
