use crate::shape::ShapeSpec;

/// Errors produced by matgraph kernels, graphs, and the wire format.
///
/// Every operation is all-or-nothing: an error means no output was produced.
#[derive(Debug, thiserror::Error)]
pub enum MatgraphError {
    /// Operand shapes cannot be multiplied (post-transpose inner dims differ),
    /// or a fed tensor does not satisfy its input's shape descriptor.
    #[error("shape mismatch: {lhs} vs {rhs}")]
    ShapeMismatch { lhs: ShapeSpec, rhs: ShapeSpec },

    /// Element count does not match the requested dimensions.
    #[error("expected {expected} elements, got {got}")]
    InvalidData { expected: usize, got: usize },

    /// Tensors are strictly rank 2.
    #[error("expected a rank-2 shape, got {0:?}")]
    InvalidRank(Vec<usize>),

    /// Corrupt or truncated encoding, or an invalid back-reference.
    #[error("malformed graph: {0}")]
    MalformedGraph(String),

    /// Unknown node-kind tag in an encoded graph.
    #[error("unsupported node kind tag: {0}")]
    UnsupportedNodeKind(u8),

    #[error("unsupported format version: {0}")]
    UnsupportedVersion(u32),

    #[error("unknown node: {0}")]
    UnknownNode(String),

    #[error("duplicate node name: {0}")]
    DuplicateNode(String),

    /// An input needed by the fetched node was not fed.
    #[error("no value fed for input '{0}'")]
    MissingFeed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MatgraphError {
    /// Shorthand for a `ShapeMismatch` between two concrete 2-D shapes.
    pub fn shape_mismatch(lhs: [usize; 2], rhs: [usize; 2]) -> Self {
        MatgraphError::ShapeMismatch {
            lhs: ShapeSpec::fixed(lhs[0], lhs[1]),
            rhs: ShapeSpec::fixed(rhs[0], rhs[1]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Dim;

    #[test]
    fn test_display_shape_mismatch() {
        let err = MatgraphError::ShapeMismatch {
            lhs: ShapeSpec::new(Dim::Unbound, Dim::Fixed(1024)),
            rhs: ShapeSpec::fixed(512, 3),
        };
        assert_eq!(err.to_string(), "shape mismatch: [?, 1024] vs [512, 3]");
    }

    #[test]
    fn test_io_from() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: MatgraphError = io.into();
        assert!(matches!(err, MatgraphError::Io(_)));
    }
}
