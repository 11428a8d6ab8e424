//! Benchmark: tiled matmul vs the naive reference loop.

use matgraph_core::Tensor;
use matgraph_kernels::{multiply, multiply_reference, SimdCapability};
use std::time::Instant;

fn bench_reference(a: &Tensor, b: &Tensor, transpose_b: bool, iters: usize) -> f64 {
    let start = Instant::now();
    for _ in 0..iters {
        let _ = multiply_reference(a, b, false, transpose_b).unwrap();
    }
    start.elapsed().as_secs_f64() / iters as f64
}

fn bench_tiled(a: &Tensor, b: &Tensor, transpose_b: bool, iters: usize) -> f64 {
    let start = Instant::now();
    for _ in 0..iters {
        let _ = multiply(a, b, false, transpose_b).unwrap();
    }
    start.elapsed().as_secs_f64() / iters as f64
}

fn gflops(m: usize, n: usize, k: usize, secs: f64) -> f64 {
    (2.0 * m as f64 * n as f64 * k as f64) / secs / 1e9
}

fn main() {
    let simd = SimdCapability::detect();
    println!("=== matgraph Matmul Benchmark ===");
    println!("SIMD: {} (avx2={}, fma={}), path: {}\n",
        simd.best_tier(), simd.avx2, simd.fma, simd.matmul_path());

    let sizes: &[(usize, usize, usize)] = &[
        (64, 64, 64),
        (128, 128, 128),
        (256, 256, 256),
        (512, 512, 512),
        (3, 1024, 7),
    ];

    println!("{:<14} {:>6} {:>12} {:>12} {:>10} {:>10}",
        "Size", "B^T", "Naive (ms)", "Tiled (ms)", "Speedup", "GF/s");
    println!("{}", "-".repeat(70));

    for &(m, k, n) in sizes {
        for transpose_b in [false, true] {
            let a_data: Vec<f32> = (0..m * k).map(|i| ((i * 7 + 3) % 13) as f32 * 0.1 - 0.6).collect();
            let b_data: Vec<f32> = (0..k * n).map(|i| ((i * 11 + 5) % 17) as f32 * 0.1 - 0.8).collect();

            let a = Tensor::from_f32(&a_data, &[m, k]).unwrap();
            let b_dims = if transpose_b { [n, k] } else { [k, n] };
            let b = Tensor::from_f32(&b_data, &b_dims).unwrap();

            let iters = if m <= 128 { 200 } else if m <= 256 { 20 } else { 5 };

            let naive_s = bench_reference(&a, &b, transpose_b, iters);
            let tiled_s = bench_tiled(&a, &b, transpose_b, iters);

            println!("{:<14} {:>6} {:>10.3}ms {:>10.3}ms {:>9.1}x {:>10.2}",
                format!("{}x{}x{}", m, k, n),
                transpose_b,
                naive_s * 1000.0,
                tiled_s * 1000.0,
                naive_s / tiled_s,
                gflops(m, n, k, tiled_s),
            );
        }
    }
}
