//! # matgraph-graph
//!
//! Symbolic description of a matrix-multiply computation and its execution.
//!
//! - `GraphNode` / `Graph`: an ordered, acyclic node list with inferred shapes
//! - `GraphBuilder` and `matmul_graph`: construction
//! - `Session`: evaluation against fed tensors

pub mod node;
pub mod graph;
pub mod builder;
pub mod session;

pub use builder::{matmul_graph, GraphBuilder, DEFAULT_FEATURE_DIM, INPUT_LHS, INPUT_RHS, OUTPUT};
pub use graph::{infer_matmul, Graph, MAX_DIM, MAX_NAME_LEN, MAX_NODES};
pub use node::{GraphNode, NodeId, NodeKind};
pub use session::{Feeds, Session};
