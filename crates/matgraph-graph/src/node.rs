//! Graph node definitions.

use std::fmt;

use matgraph_core::ShapeSpec;

/// Index of a node within its graph.
pub type NodeId = usize;

/// Discriminant of a [`GraphNode`], as written on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NodeKind {
    Input = 0,
    MatMul = 1,
}

impl NodeKind {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(NodeKind::Input),
            1 => Some(NodeKind::MatMul),
            _ => None,
        }
    }
}

/// One node of a matmul graph.
///
/// Operands are referenced by index, never owned; the graph owns every node.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum GraphNode {
    /// Placeholder fed by the caller at run time.
    Input { name: String, shape: ShapeSpec },
    /// op(lhs) · op(rhs), op transposing when the matching flag is set.
    MatMul {
        name: String,
        lhs: NodeId,
        rhs: NodeId,
        transpose_lhs: bool,
        transpose_rhs: bool,
    },
}

impl GraphNode {
    pub fn input(name: impl Into<String>, shape: ShapeSpec) -> Self {
        GraphNode::Input {
            name: name.into(),
            shape,
        }
    }

    pub fn matmul(name: impl Into<String>, lhs: NodeId, rhs: NodeId, transpose_lhs: bool, transpose_rhs: bool) -> Self {
        GraphNode::MatMul {
            name: name.into(),
            lhs,
            rhs,
            transpose_lhs,
            transpose_rhs,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            GraphNode::Input { name, .. } | GraphNode::MatMul { name, .. } => name,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            GraphNode::Input { .. } => NodeKind::Input,
            GraphNode::MatMul { .. } => NodeKind::MatMul,
        }
    }

    /// Nodes this one reads from, in operand order.
    pub fn operands(&self) -> Option<[NodeId; 2]> {
        match self {
            GraphNode::Input { .. } => None,
            GraphNode::MatMul { lhs, rhs, .. } => Some([*lhs, *rhs]),
        }
    }

    pub fn is_input(&self) -> bool {
        matches!(self, GraphNode::Input { .. })
    }
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphNode::Input { name, shape } => write!(f, "Input '{name}' {shape}"),
            GraphNode::MatMul {
                name,
                lhs,
                rhs,
                transpose_lhs,
                transpose_rhs,
            } => {
                let t = |flag: &bool| if *flag { "^T" } else { "" };
                write!(f, "MatMul '{name}' = #{lhs}{} · #{rhs}{}", t(transpose_lhs), t(transpose_rhs))
            }
        }
    }
}
