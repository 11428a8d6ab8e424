//! Batched matmul over independent operand pairs.
//!
//! Pairs share no state, so they are computed with rayon once the batch is
//! large enough. Output `i` always corresponds to input pair `i`.

use matgraph_core::{Result, Tensor};
use rayon::prelude::*;
use tracing::debug;

use crate::cpu_matmul::multiply;

/// Minimum batch length before we use rayon parallelism.
const PAR_BATCH_THRESHOLD: usize = 4;

/// Multiply every `(a, b)` pair with the same transpose flags.
///
/// All-or-nothing: if any pair fails, the first error (by completion) is
/// returned and no outputs are produced.
pub fn multiply_batch(pairs: &[(Tensor, Tensor)], transpose_a: bool, transpose_b: bool) -> Result<Vec<Tensor>> {
    debug!(batch = pairs.len(), transpose_a, transpose_b, "batched matmul");

    if pairs.len() >= PAR_BATCH_THRESHOLD {
        pairs
            .par_iter()
            .map(|(a, b)| multiply(a, b, transpose_a, transpose_b))
            .collect()
    } else {
        pairs
            .iter()
            .map(|(a, b)| multiply(a, b, transpose_a, transpose_b))
            .collect()
    }
}
