//! Naive reference matmul - correct but slow.
//! The baseline every other path is checked against.

use matgraph_core::{MatgraphError, Result, Tensor};

/// Row-major operands after transposition, with the product dimensions.
pub(crate) struct Operands {
    pub a: Tensor,
    pub b: Tensor,
    pub m: usize,
    pub k: usize,
    pub n: usize,
}

/// Apply transpose flags and check that inner dimensions agree.
pub(crate) fn prepare(a: &Tensor, b: &Tensor, transpose_a: bool, transpose_b: bool) -> Result<Operands> {
    let a = if transpose_a { a.transpose() } else { a.clone() };
    let b = if transpose_b { b.transpose() } else { b.clone() };

    let (m, k1) = (a.rows(), a.cols());
    let (k2, n) = (b.rows(), b.cols());
    if k1 != k2 {
        return Err(MatgraphError::shape_mismatch([m, k1], [k2, n]));
    }

    Ok(Operands {
        a: a.contiguous(),
        b: b.contiguous(),
        m,
        k: k1,
        n,
    })
}

/// C = op(A) · op(B) by straightforward triple-nested iteration.
///
/// Sums run left to right over the inner dimension.
pub fn multiply_reference(a: &Tensor, b: &Tensor, transpose_a: bool, transpose_b: bool) -> Result<Tensor> {
    let ops = prepare(a, b, transpose_a, transpose_b)?;
    let a_data = ops.a.as_f32_slice().unwrap_or_default();
    let b_data = ops.b.as_f32_slice().unwrap_or_default();
    let mut c = vec![0.0f32; ops.m * ops.n];
    matmul_naive(a_data, b_data, &mut c, ops.m, ops.n, ops.k);
    Tensor::from_vec(c, &[ops.m, ops.n])
}

/// C[M,N] = A[M,K] @ B[K,N] on row-major slices.
pub fn matmul_naive(a: &[f32], b: &[f32], c: &mut [f32], m: usize, n: usize, k: usize) {
    for i in 0..m {
        for j in 0..n {
            let mut acc = 0.0f32;
            for p in 0..k {
                acc += a[i * k + p] * b[p * n + j];
            }
            c[i * n + j] = acc;
        }
    }
}
