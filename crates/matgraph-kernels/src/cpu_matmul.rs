//! Tiled CPU matrix multiplication with SIMD acceleration.
//!
//! Uses cache-friendly tiling and dispatches to an AVX2+FMA inner loop
//! when available, falling back to scalar.
//!
//! Per output element the inner dimension is still consumed left to right:
//! k-tiles are visited in ascending order and partial products accumulate
//! directly into C. The scalar path therefore matches `multiply_reference`
//! bit for bit; the FMA path may differ in the low-order bits because each
//! multiply-add rounds once instead of twice.

use matgraph_core::{Result, Tensor};
use tracing::trace;

use crate::reference::prepare;
use crate::simd::{MatmulPath, SimdCapability};

/// Tile size for cache-friendly blocking.
/// 64×64 tiles fit comfortably in L1 cache (~32KB for f32).
const TILE_M: usize = 64;
const TILE_N: usize = 64;
const TILE_K: usize = 64;

/// C = op(A) · op(B), where op transposes when the matching flag is set.
///
/// Fails with `ShapeMismatch` when the post-transpose inner dimensions
/// differ. The inputs are never modified.
pub fn multiply(a: &Tensor, b: &Tensor, transpose_a: bool, transpose_b: bool) -> Result<Tensor> {
    let ops = prepare(a, b, transpose_a, transpose_b)?;
    let (m, k, n) = (ops.m, ops.k, ops.n);

    let a_data = ops.a.as_f32_slice().unwrap_or_default();
    let b_data = ops.b.as_f32_slice().unwrap_or_default();
    let mut c_data = vec![0.0f32; m * n];

    let path = SimdCapability::detect().matmul_path();
    trace!(m, k, n, %path, "matmul");

    match path {
        MatmulPath::Avx2Fma => tiled_matmul_avx2(a_data, b_data, &mut c_data, m, n, k),
        MatmulPath::Scalar => tiled_matmul_scalar(a_data, b_data, &mut c_data, m, n, k),
    }

    Tensor::from_vec(c_data, &[m, n])
}

/// Scalar tiled matmul (fallback).
pub(crate) fn tiled_matmul_scalar(a: &[f32], b: &[f32], c: &mut [f32], m: usize, n: usize, k: usize) {
    for i0 in (0..m).step_by(TILE_M) {
        let i_end = (i0 + TILE_M).min(m);
        for j0 in (0..n).step_by(TILE_N) {
            let j_end = (j0 + TILE_N).min(n);
            for p0 in (0..k).step_by(TILE_K) {
                let p_end = (p0 + TILE_K).min(k);

                for i in i0..i_end {
                    for p in p0..p_end {
                        let a_val = a[i * k + p];
                        for j in j0..j_end {
                            c[i * n + j] += a_val * b[p * n + j];
                        }
                    }
                }
            }
        }
    }
}

#[cfg(target_arch = "x86_64")]
fn tiled_matmul_avx2(a: &[f32], b: &[f32], c: &mut [f32], m: usize, n: usize, k: usize) {
    if !is_x86_feature_detected!("avx2") || !is_x86_feature_detected!("fma") {
        return tiled_matmul_scalar(a, b, c, m, n, k);
    }

    // Safety: AVX2+FMA checked above; all indices stay within m*k, k*n, m*n.
    unsafe { tiled_matmul_avx2_inner(a, b, c, m, n, k) }
}

/// Processes 8 output columns at a time with 256-bit fused multiply-add.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2,fma")]
unsafe fn tiled_matmul_avx2_inner(a: &[f32], b: &[f32], c: &mut [f32], m: usize, n: usize, k: usize) {
    use std::arch::x86_64::*;

    for i0 in (0..m).step_by(TILE_M) {
        let i_end = (i0 + TILE_M).min(m);
        for j0 in (0..n).step_by(TILE_N) {
            let j_end = (j0 + TILE_N).min(n);
            for p0 in (0..k).step_by(TILE_K) {
                let p_end = (p0 + TILE_K).min(k);

                for i in i0..i_end {
                    for p in p0..p_end {
                        let a_scalar = a[i * k + p];
                        let a_val = _mm256_set1_ps(a_scalar);

                        let mut j = j0;
                        while j + 8 <= j_end {
                            let c_ptr = c.as_mut_ptr().add(i * n + j);
                            let b_ptr = b.as_ptr().add(p * n + j);

                            let c_vec = _mm256_loadu_ps(c_ptr);
                            let b_vec = _mm256_loadu_ps(b_ptr);
                            _mm256_storeu_ps(c_ptr, _mm256_fmadd_ps(a_val, b_vec, c_vec));

                            j += 8;
                        }

                        // tail
                        while j < j_end {
                            c[i * n + j] += a_scalar * b[p * n + j];
                            j += 1;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(not(target_arch = "x86_64"))]
fn tiled_matmul_avx2(a: &[f32], b: &[f32], c: &mut [f32], m: usize, n: usize, k: usize) {
    tiled_matmul_scalar(a, b, c, m, n, k);
}
