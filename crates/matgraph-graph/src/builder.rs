//! Incremental graph construction.

use matgraph_core::{Dim, Result, ShapeSpec};
use tracing::debug;

use crate::graph::Graph;
use crate::node::{GraphNode, NodeId};

/// Name of the left placeholder in [`matmul_graph`].
pub const INPUT_LHS: &str = "x";
/// Name of the right placeholder in [`matmul_graph`].
pub const INPUT_RHS: &str = "y";
/// Name of the product node in [`matmul_graph`].
pub const OUTPUT: &str = "matmul";
/// Feature dimension used when none is given.
pub const DEFAULT_FEATURE_DIM: usize = 1024;

/// Builds a [`Graph`] one validated node at a time.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    graph: Graph,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a placeholder input.
    pub fn input(&mut self, name: impl Into<String>, shape: ShapeSpec) -> Result<NodeId> {
        self.graph.push(GraphNode::input(name, shape))
    }

    /// Add op(lhs) · op(rhs). Both operands must already exist.
    pub fn matmul(
        &mut self,
        name: impl Into<String>,
        lhs: NodeId,
        rhs: NodeId,
        transpose_lhs: bool,
        transpose_rhs: bool,
    ) -> Result<NodeId> {
        self.graph
            .push(GraphNode::matmul(name, lhs, rhs, transpose_lhs, transpose_rhs))
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// Freeze the graph.
    pub fn build(self) -> Graph {
        self.graph
    }
}

/// The single-product graph: `x: [?, d]`, `y: [d, ?]`, `matmul = op(x) · op(y)`.
pub fn matmul_graph(feature_dim: usize, transpose_a: bool, transpose_b: bool) -> Result<Graph> {
    debug!(feature_dim, transpose_a, transpose_b, "building matmul graph");
    let mut b = GraphBuilder::new();
    let x = b.input(INPUT_LHS, ShapeSpec::new(Dim::Unbound, feature_dim))?;
    let y = b.input(INPUT_RHS, ShapeSpec::new(feature_dim, Dim::Unbound))?;
    b.matmul(OUTPUT, x, y, transpose_a, transpose_b)?;
    Ok(b.build())
}
