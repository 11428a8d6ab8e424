//! Frozen matmul graph with shape inference.

use std::collections::HashMap;

use matgraph_core::{MatgraphError, Result, ShapeSpec};

use crate::node::{GraphNode, NodeId};

/// Largest fixed dim a graph may hold (dims travel as `i64`).
pub const MAX_DIM: usize = i64::MAX as usize;
/// Longest node name in bytes (lengths travel as `u32`).
pub const MAX_NAME_LEN: usize = u32::MAX as usize;
/// Most nodes a graph may hold (counts and indices travel as `u32`).
pub const MAX_NODES: usize = u32::MAX as usize;

/// An ordered, acyclic list of nodes.
///
/// Insertion order is dependency order: every operand index points at an
/// earlier node. Names are unique. Once built, a graph is never mutated.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Graph {
    nodes: Vec<GraphNode>,
    /// Inferred output descriptor of each node, parallel to `nodes`.
    shapes: Vec<ShapeSpec>,
    #[cfg_attr(feature = "serde", serde(skip))]
    index: HashMap<String, NodeId>,
}

impl Graph {
    /// Validate an arbitrary node list and freeze it into a graph.
    ///
    /// Back-references that do not point at an earlier node, and dims,
    /// names, or node counts beyond the `MAX_*` limits, are
    /// `MalformedGraph`; repeated names are `DuplicateNode`; bound inner
    /// axes that disagree are `ShapeMismatch`.
    pub fn from_nodes(nodes: impl IntoIterator<Item = GraphNode>) -> Result<Self> {
        let mut graph = Graph::default();
        for node in nodes {
            graph.push(node)?;
        }
        Ok(graph)
    }

    /// Append a node after validating it against the nodes already present.
    pub(crate) fn push(&mut self, node: GraphNode) -> Result<NodeId> {
        let id = self.nodes.len();
        if id >= MAX_NODES {
            return Err(MatgraphError::MalformedGraph(format!(
                "graph already holds the maximum of {MAX_NODES} nodes"
            )));
        }
        if node.name().len() > MAX_NAME_LEN {
            return Err(MatgraphError::MalformedGraph(format!(
                "node #{id} name is {} bytes, limit is {MAX_NAME_LEN}",
                node.name().len()
            )));
        }
        if self.index.contains_key(node.name()) {
            return Err(MatgraphError::DuplicateNode(node.name().to_string()));
        }

        let shape = match &node {
            GraphNode::Input { name, shape } => {
                for dim in [shape.rows, shape.cols] {
                    if dim.value().is_some_and(|n| n > MAX_DIM) {
                        return Err(MatgraphError::MalformedGraph(format!(
                            "input '{name}' dim {dim} exceeds {MAX_DIM}"
                        )));
                    }
                }
                *shape
            }
            GraphNode::MatMul {
                name,
                lhs,
                rhs,
                transpose_lhs,
                transpose_rhs,
            } => {
                for operand in [*lhs, *rhs] {
                    if operand >= id {
                        return Err(MatgraphError::MalformedGraph(format!(
                            "node '{name}' references #{operand}, but only {id} nodes precede it"
                        )));
                    }
                }
                infer_matmul(self.shapes[*lhs], self.shapes[*rhs], *transpose_lhs, *transpose_rhs)?
            }
        };

        self.index.insert(node.name().to_string(), id);
        self.nodes.push(node);
        self.shapes.push(shape);
        Ok(id)
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node by name.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.index.get(name).copied()
    }

    /// Ids of all Input nodes, in insertion order.
    pub fn inputs(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_input())
            .map(|(id, _)| id)
            .collect()
    }

    /// Inferred output descriptor of a node.
    pub fn output_shape(&self, id: NodeId) -> Option<ShapeSpec> {
        self.shapes.get(id).copied()
    }

    /// Every node `target` depends on, itself included, in insertion order.
    pub fn dependencies(&self, target: NodeId) -> Vec<NodeId> {
        if target >= self.nodes.len() {
            return Vec::new();
        }
        let mut needed = vec![false; target + 1];
        needed[target] = true;
        // Operands always precede their user, so one backward sweep suffices.
        for id in (0..=target).rev() {
            if !needed[id] {
                continue;
            }
            if let Some(ops) = self.nodes[id].operands() {
                for op in ops {
                    needed[op] = true;
                }
            }
        }
        needed
            .iter()
            .enumerate()
            .filter(|(_, n)| **n)
            .map(|(id, _)| id)
            .collect()
    }
}

impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes
    }
}

impl Eq for Graph {}

/// Output descriptor of op(lhs) · op(rhs).
///
/// The inner axes must agree when both are bound; an unbound side defers the
/// check to run time.
pub fn infer_matmul(lhs: ShapeSpec, rhs: ShapeSpec, transpose_lhs: bool, transpose_rhs: bool) -> Result<ShapeSpec> {
    let a = lhs.transpose_if(transpose_lhs);
    let b = rhs.transpose_if(transpose_rhs);
    if !a.cols.compatible_with(&b.rows) {
        return Err(MatgraphError::ShapeMismatch { lhs: a, rhs: b });
    }
    Ok(ShapeSpec::new(a.rows, b.cols))
}

#[cfg(test)]
mod tests {
    use super::*;
    use matgraph_core::Dim;

    fn canonical_nodes() -> Vec<GraphNode> {
        vec![
            GraphNode::input("x", ShapeSpec::new(Dim::Unbound, 1024)),
            GraphNode::input("y", ShapeSpec::new(1024, Dim::Unbound)),
            GraphNode::matmul("matmul", 0, 1, false, false),
        ]
    }

    #[test]
    fn test_from_nodes_canonical() {
        let g = Graph::from_nodes(canonical_nodes()).unwrap();
        assert_eq!(g.len(), 3);
        assert_eq!(g.find("matmul"), Some(2));
        assert_eq!(g.find("z"), None);
        assert_eq!(g.inputs(), vec![0, 1]);
        assert_eq!(g.output_shape(2), Some(ShapeSpec::new(Dim::Unbound, Dim::Unbound)));
        assert_eq!(g.output_shape(0), Some(ShapeSpec::new(Dim::Unbound, 1024)));
    }

    #[test]
    fn test_forward_reference_rejected() {
        let nodes = vec![
            GraphNode::input("x", ShapeSpec::fixed(2, 2)),
            GraphNode::matmul("m", 0, 1, false, false),
            GraphNode::input("y", ShapeSpec::fixed(2, 2)),
        ];
        let err = Graph::from_nodes(nodes).unwrap_err();
        assert!(matches!(err, MatgraphError::MalformedGraph(_)));
    }

    #[test]
    fn test_self_reference_rejected() {
        let nodes = vec![
            GraphNode::input("x", ShapeSpec::fixed(2, 2)),
            GraphNode::matmul("m", 0, 1, false, false),
        ];
        assert!(matches!(
            Graph::from_nodes(nodes),
            Err(MatgraphError::MalformedGraph(_))
        ));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let nodes = vec![
            GraphNode::input("x", ShapeSpec::fixed(2, 2)),
            GraphNode::input("x", ShapeSpec::fixed(2, 2)),
        ];
        match Graph::from_nodes(nodes) {
            Err(MatgraphError::DuplicateNode(name)) => assert_eq!(name, "x"),
            other => panic!("expected DuplicateNode, got {other:?}"),
        }
    }

    #[test]
    fn test_bound_axis_conflict() {
        let nodes = vec![
            GraphNode::input("x", ShapeSpec::new(Dim::Unbound, 1024)),
            GraphNode::input("y", ShapeSpec::new(512, Dim::Unbound)),
            GraphNode::matmul("matmul", 0, 1, false, false),
        ];
        let err = Graph::from_nodes(nodes).unwrap_err();
        assert_eq!(err.to_string(), "shape mismatch: [?, 1024] vs [512, ?]");
    }

    #[test]
    fn test_infer_matmul_transposed() {
        let a = ShapeSpec::fixed(3, 5);
        let b = ShapeSpec::fixed(4, 5);
        assert_eq!(infer_matmul(a, b, false, true).unwrap(), ShapeSpec::fixed(3, 4));
        assert!(infer_matmul(a, b, false, false).is_err());
        // Unbound inner axis defers the check
        let c = ShapeSpec::new(Dim::Unbound, 4);
        assert_eq!(infer_matmul(a, c, false, false).unwrap(), ShapeSpec::fixed(3, 4));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_oversized_dim_rejected() {
        // usize::MAX would collide with the unbound marker once written as i64
        for big in [usize::MAX, MAX_DIM + 1] {
            let nodes = vec![GraphNode::input("x", ShapeSpec::new(Dim::Fixed(big), 4))];
            assert!(matches!(
                Graph::from_nodes(nodes),
                Err(MatgraphError::MalformedGraph(_))
            ));
        }
        let nodes = vec![GraphNode::input("x", ShapeSpec::new(4, Dim::Fixed(MAX_DIM)))];
        assert!(Graph::from_nodes(nodes).is_ok());
    }

    #[test]
    fn test_dependencies() {
        let nodes = vec![
            GraphNode::input("a", ShapeSpec::fixed(2, 2)),
            GraphNode::input("unused", ShapeSpec::fixed(9, 9)),
            GraphNode::input("b", ShapeSpec::fixed(2, 2)),
            GraphNode::matmul("ab", 0, 2, false, false),
            GraphNode::matmul("abb", 3, 2, false, false),
        ];
        let g = Graph::from_nodes(nodes).unwrap();
        assert_eq!(g.dependencies(4), vec![0, 2, 3, 4]);
        assert_eq!(g.dependencies(1), vec![1]);
        assert!(g.dependencies(99).is_empty());
    }

    #[test]
    fn test_equality_ignores_index() {
        let g1 = Graph::from_nodes(canonical_nodes()).unwrap();
        let g2 = Graph::from_nodes(canonical_nodes()).unwrap();
        assert_eq!(g1, g2);
        assert_ne!(g1, Graph::default());
    }
}
