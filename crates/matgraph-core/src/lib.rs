//! # matgraph-core
//!
//! Core types shared by every matgraph crate.
//!
//! Provides:
//! - `Tensor`: dense rank-2 f32 array with zero-copy transpose views
//! - `Shape`: concrete dimensions of a tensor
//! - `Dim` / `ShapeSpec`: symbolic shapes with unbound (placeholder) dims
//! - `MatgraphError`: the error taxonomy used across kernels, graph, and format

pub mod error;
pub mod shape;
pub mod tensor;
pub mod prelude;

pub use error::MatgraphError;
pub use shape::{Dim, Shape, ShapeSpec};
pub use tensor::Tensor;

pub type Result<T> = std::result::Result<T, MatgraphError>;
