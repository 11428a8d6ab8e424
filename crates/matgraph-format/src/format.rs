//! `.mgr` graph descriptor format: a compact binary encoding of a [`Graph`].
//!
//! Layout (all integers little-endian):
//! ```text
//! ┌──────────────────────────────────┐
//! │ Magic: "MGRF" (4 bytes)          │
//! │ Version: u32                     │
//! │ Node count: u32                  │
//! ├──────────────────────────────────┤
//! │ Node record × count              │
//! │   kind: u8 (0 Input, 1 MatMul)   │
//! │   name_len: u32, name: UTF-8     │
//! │   Input:  rows i64, cols i64     │
//! │   MatMul: lhs u32, rhs u32,      │
//! │           transpose_lhs u8,      │
//! │           transpose_rhs u8       │
//! └──────────────────────────────────┘
//! ```
//!
//! An unbound dim is written as -1. MatMul records carry no shape; it is
//! inferred from the operands when the graph is rebuilt.

use matgraph_core::{Dim, MatgraphError, Result, ShapeSpec};
use matgraph_graph::{Graph, GraphNode, NodeKind};
use tracing::debug;

use crate::wire::{write_i64_le, write_u32_le, Reader};

/// Magic bytes identifying an encoded graph.
pub const MAGIC: &[u8; 4] = b"MGRF";

/// Current format version.
pub const VERSION: u32 = 1;

/// Magic + version + node count.
pub const HEADER_LEN: usize = 12;

/// Wire value of `Dim::Unbound`.
const UNBOUND: i64 = -1;

/// Serialize a graph. Node order is preserved exactly.
///
/// `Graph` enforces `MAX_DIM`, `MAX_NAME_LEN`, and `MAX_NODES`, so every
/// narrowing cast below is lossless.
pub fn encode(graph: &Graph) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + graph.len() * 32);
    buf.extend_from_slice(MAGIC);
    write_u32_le(&mut buf, VERSION);
    write_u32_le(&mut buf, graph.len() as u32);

    for node in graph.nodes() {
        buf.push(node.kind().tag());
        let name = node.name().as_bytes();
        write_u32_le(&mut buf, name.len() as u32);
        buf.extend_from_slice(name);

        match node {
            GraphNode::Input { shape, .. } => {
                write_i64_le(&mut buf, encode_dim(shape.rows));
                write_i64_le(&mut buf, encode_dim(shape.cols));
            }
            GraphNode::MatMul {
                lhs,
                rhs,
                transpose_lhs,
                transpose_rhs,
                ..
            } => {
                write_u32_le(&mut buf, *lhs as u32);
                write_u32_le(&mut buf, *rhs as u32);
                buf.push(*transpose_lhs as u8);
                buf.push(*transpose_rhs as u8);
            }
        }
    }

    debug!(nodes = graph.len(), bytes = buf.len(), "encoded graph");
    buf
}

/// Rebuild a graph from bytes produced by [`encode`].
///
/// The whole buffer must be consumed. Nothing is returned unless every
/// record is valid.
pub fn decode(data: &[u8]) -> Result<Graph> {
    let mut r = Reader::new(data);

    let magic = r.bytes(MAGIC.len(), "magic")?;
    if magic != MAGIC {
        return Err(MatgraphError::MalformedGraph(format!(
            "invalid magic bytes {magic:?} (expected MGRF)"
        )));
    }

    let version = r.u32("version")?;
    if version != VERSION {
        return Err(MatgraphError::UnsupportedVersion(version));
    }

    let count = r.u32("node count")? as usize;
    let mut nodes = Vec::new();
    for index in 0..count {
        nodes.push(decode_node(&mut r, index)?);
    }

    if r.remaining() != 0 {
        return Err(MatgraphError::MalformedGraph(format!(
            "{} trailing bytes after {count} nodes",
            r.remaining()
        )));
    }

    let graph = Graph::from_nodes(nodes)?;
    debug!(nodes = graph.len(), bytes = data.len(), "decoded graph");
    Ok(graph)
}

fn decode_node(r: &mut Reader<'_>, index: usize) -> Result<GraphNode> {
    let tag = r.u8("node kind")?;
    let kind = NodeKind::from_tag(tag).ok_or(MatgraphError::UnsupportedNodeKind(tag))?;

    let name_len = r.u32("name length")? as usize;
    let name = std::str::from_utf8(r.bytes(name_len, "node name")?)
        .map_err(|e| MatgraphError::MalformedGraph(format!("node #{index} name is not valid UTF-8: {e}")))?
        .to_string();

    match kind {
        NodeKind::Input => {
            let rows = decode_dim(r.i64("rows")?, &name)?;
            let cols = decode_dim(r.i64("cols")?, &name)?;
            Ok(GraphNode::input(name, ShapeSpec::new(rows, cols)))
        }
        NodeKind::MatMul => {
            let lhs = r.u32("lhs")? as usize;
            let rhs = r.u32("rhs")? as usize;
            let transpose_lhs = r.bool("transpose_lhs")?;
            let transpose_rhs = r.bool("transpose_rhs")?;
            for operand in [lhs, rhs] {
                if operand >= index {
                    return Err(MatgraphError::MalformedGraph(format!(
                        "node '{name}' references #{operand}, but only {index} nodes precede it"
                    )));
                }
            }
            Ok(GraphNode::matmul(name, lhs, rhs, transpose_lhs, transpose_rhs))
        }
    }
}

fn encode_dim(dim: Dim) -> i64 {
    match dim {
        Dim::Fixed(n) => n as i64,
        Dim::Unbound => UNBOUND,
    }
}

fn decode_dim(value: i64, node: &str) -> Result<Dim> {
    if value == UNBOUND {
        return Ok(Dim::Unbound);
    }
    usize::try_from(value)
        .map(Dim::Fixed)
        .map_err(|_| MatgraphError::MalformedGraph(format!("input '{node}' has invalid dim {value}")))
}
