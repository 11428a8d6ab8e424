//! # matgraph-kernels
//!
//! CPU matrix multiplication for matgraph.
//!
//! Provides:
//! - `multiply`: C = op(A) · op(B) with optional transposes, tiled and
//!   dispatched to an AVX2+FMA inner loop when the CPU has one
//! - `multiply_reference`: straightforward triple loop, the numeric baseline
//! - `multiply_batch`: independent products computed in parallel
//! - `compare`: element-wise verification report between two results

pub mod simd;
pub mod reference;
pub mod cpu_matmul;
pub mod batch;
pub mod verify;

pub use batch::multiply_batch;
pub use cpu_matmul::multiply;
pub use reference::multiply_reference;
pub use simd::{MatmulPath, SimdCapability};
pub use verify::{compare, ComparisonReport};
