//! Save and load encoded graphs on disk.

use std::path::Path;

use matgraph_core::Result;
use matgraph_graph::Graph;
use tracing::info;

use crate::format::{decode, encode};

/// Encode a graph and write it to `path`, replacing any existing file.
pub fn save(graph: &Graph, path: &Path) -> Result<()> {
    let bytes = encode(graph);
    std::fs::write(path, &bytes)?;
    info!("Wrote {} nodes ({} bytes) to {}", graph.len(), bytes.len(), path.display());
    Ok(())
}

/// Read and decode a graph from `path`.
pub fn load(path: &Path) -> Result<Graph> {
    let data = std::fs::read(path)?;
    let graph = decode(&data)?;
    info!("Loaded {} nodes from {}", graph.len(), path.display());
    Ok(graph)
}
