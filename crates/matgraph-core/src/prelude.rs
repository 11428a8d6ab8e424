//! Convenience re-exports for common matgraph-core types.
//!
//! ```rust
//! use matgraph_core::prelude::*;
//! ```

pub use crate::Dim;
pub use crate::MatgraphError;
pub use crate::Result;
pub use crate::Shape;
pub use crate::ShapeSpec;
pub use crate::Tensor;
