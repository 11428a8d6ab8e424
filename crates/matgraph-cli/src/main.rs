use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use matgraph_core::Tensor;
use matgraph_graph::{matmul_graph, Feeds, Graph, GraphNode, Session, DEFAULT_FEATURE_DIM, INPUT_LHS, INPUT_RHS, OUTPUT};
use matgraph_kernels::{compare, multiply_reference, SimdCapability};

mod config;

use config::{BenchArgs, BenchConfig};

#[derive(Parser)]
#[command(
    name = "matgraph",
    about = "Build, inspect, and benchmark single-matmul graphs",
    long_about = "Generates the two-input matmul graph descriptor (x: [?, d], y: [d, ?]),\nexecutes it against random inputs, and checks the result against the\nreference kernel.",
    version,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Write the canonical matmul graph to a file
    GenModel {
        /// Bound feature dimension shared by x and y
        #[arg(long, default_value_t = DEFAULT_FEATURE_DIM)]
        feature_dim: usize,
        /// Transpose x before multiplying
        #[arg(long)]
        transpose_a: bool,
        /// Transpose y before multiplying
        #[arg(long)]
        transpose_b: bool,
        /// Output file path
        #[arg(long, default_value = "matmul.mgr")]
        output: PathBuf,
    },
    /// Time repeated graph runs on random inputs and verify against the reference kernel
    Bench(BenchArgs),
    /// Decode a graph file and print its nodes
    Inspect {
        /// Encoded graph file
        file: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show system info (SIMD capabilities, matmul path)
    Info,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::GenModel { feature_dim, transpose_a, transpose_b, output } => {
            cmd_gen_model(feature_dim, transpose_a, transpose_b, &output)
        }
        Commands::Bench(args) => cmd_bench(&args),
        Commands::Inspect { file, json } => cmd_inspect(&file, json),
        Commands::Info => {
            cmd_info();
            Ok(())
        }
    }
}

fn cmd_gen_model(feature_dim: usize, transpose_a: bool, transpose_b: bool, output: &Path) -> Result<()> {
    let graph = matmul_graph(feature_dim, transpose_a, transpose_b)?;
    matgraph_format::save(&graph, output)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!("Wrote {} ({} nodes)", output.display(), graph.len());
    print_nodes(&graph);
    Ok(())
}

fn cmd_inspect(file: &Path, json: bool) -> Result<()> {
    let graph = matgraph_format::load(file)
        .with_context(|| format!("failed to load {}", file.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&graph)?);
    } else {
        println!("Graph: {} ({} nodes)", file.display(), graph.len());
        print_nodes(&graph);
    }
    Ok(())
}

fn print_nodes(graph: &Graph) {
    for (id, node) in graph.nodes().iter().enumerate() {
        let out = graph
            .output_shape(id)
            .map(|s| s.to_string())
            .unwrap_or_default();
        println!("  #{:<3} {:<40} -> {}", id, node.to_string(), out);
    }
}

/// Transpose flags of the fetched product node.
fn output_flags(graph: &Graph) -> Result<(bool, bool)> {
    let id = graph
        .find(OUTPUT)
        .ok_or_else(|| anyhow!("graph has no '{}' node", OUTPUT))?;
    match graph.node(id) {
        Some(GraphNode::MatMul { transpose_lhs, transpose_rhs, .. }) => Ok((*transpose_lhs, *transpose_rhs)),
        _ => Err(anyhow!("'{}' is not a MatMul node", OUTPUT)),
    }
}

/// True when a transpose was asked for that the graph's product node lacks.
fn flags_overridden(requested: (bool, bool), graph: (bool, bool)) -> bool {
    (requested.0 && !graph.0) || (requested.1 && !graph.1)
}

fn cmd_bench(args: &BenchArgs) -> Result<()> {
    let cfg = BenchConfig::resolve(args)?;
    debug!(?cfg, "bench config");

    let graph = match &cfg.graph {
        Some(path) => matgraph_format::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => matmul_graph(cfg.cols_a, cfg.transpose_a, cfg.transpose_b)?,
    };
    let (transpose_a, transpose_b) = output_flags(&graph)?;
    if cfg.graph.is_some() && flags_overridden((cfg.transpose_a, cfg.transpose_b), (transpose_a, transpose_b)) {
        warn!(
            requested_a = cfg.transpose_a,
            requested_b = cfg.transpose_b,
            transpose_a,
            transpose_b,
            "transpose flags ignored; the loaded graph's flags apply"
        );
    }

    let simd = SimdCapability::detect();
    println!("=== matgraph Session Benchmark ===");
    println!("SIMD: {} (path: {})", simd.best_tier(), simd.matmul_path());
    println!("A: {}x{}{}  B: {}x{}{}  runs: {}\n",
        cfg.rows_a, cfg.cols_a, if transpose_a { " (T)" } else { "" },
        cfg.rows_b, cfg.cols_b, if transpose_b { " (T)" } else { "" },
        cfg.runs,
    );

    let mut rng = match cfg.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let a = Tensor::randn_with(cfg.rows_a, cfg.cols_a, cfg.std, &mut rng);
    let b = Tensor::randn_with(cfg.rows_b, cfg.cols_b, cfg.std, &mut rng);

    let mut feeds = Feeds::new();
    feeds.insert(INPUT_LHS.to_string(), a.clone());
    feeds.insert(INPUT_RHS.to_string(), b.clone());

    let session = Session::new(&graph);
    let mut times = Vec::with_capacity(cfg.runs);
    let mut output = None;
    for run in 0..cfg.runs {
        let start = Instant::now();
        let c = session.run(&feeds, OUTPUT).context("session run failed")?;
        let secs = start.elapsed().as_secs_f64();
        info!(run, ms = secs * 1000.0, "session run");
        times.push(secs);
        output = Some(c);
    }
    let output = output.ok_or_else(|| anyhow!("no session runs"))?;

    let start = Instant::now();
    let expected = multiply_reference(&a, &b, transpose_a, transpose_b)?;
    let reference_s = start.elapsed().as_secs_f64();

    let (m, n) = (output.rows(), output.cols());
    let k = if transpose_a { cfg.rows_a } else { cfg.cols_a };
    let mean_s = times.iter().sum::<f64>() / times.len() as f64;
    let min_s = times.iter().copied().fold(f64::INFINITY, f64::min);

    println!("{:<14} {:>12} {:>12} {:>10}", "", "Mean (ms)", "Min (ms)", "GF/s");
    println!("{}", "-".repeat(52));
    println!("{:<14} {:>10.3}ms {:>10.3}ms {:>10.2}",
        "session", mean_s * 1000.0, min_s * 1000.0, gflops(m, n, k, mean_s));
    println!("{:<14} {:>10.3}ms {:>10.3}ms {:>10.2}",
        "reference", reference_s * 1000.0, reference_s * 1000.0, gflops(m, n, k, reference_s));

    let report = compare(&output, &expected)?;
    println!("\nOutput: {}x{}", m, n);
    println!("{}", report);
    Ok(())
}

fn gflops(m: usize, n: usize, k: usize, secs: f64) -> f64 {
    if secs <= 0.0 {
        return 0.0;
    }
    (2.0 * m as f64 * n as f64 * k as f64) / secs / 1e9
}

fn cmd_info() {
    println!("matgraph v{}\n", env!("CARGO_PKG_VERSION"));

    println!("Platform");
    println!("  OS:   {}", std::env::consts::OS);
    println!("  Arch: {}", std::env::consts::ARCH);

    let simd = SimdCapability::detect();
    println!("\nSIMD (tier: {})", simd.best_tier());
    println!("  AVX2: {}", if simd.avx2 { "[x]" } else { "[ ]" });
    println!("  FMA:  {}", if simd.fma { "[x]" } else { "[ ]" });
    println!("  NEON: {}", if simd.neon { "[x]" } else { "[ ]" });
    println!("  matmul path: {}", simd.matmul_path());
    println!("  threads: {}", available_threads());

    println!("\nCrates (5)");
    let crates = [
        ("core",    "Tensor, Shape, Dim/ShapeSpec, errors"),
        ("kernels", "Tiled + reference matmul, verification"),
        ("graph",   "Graph nodes, builder, session"),
        ("format",  "Binary graph descriptor (.mgr)"),
        ("cli",     "This CLI"),
    ];
    for (name, desc) in crates {
        println!("  matgraph-{:<8} {}", name, desc);
    }
}

fn available_threads() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gen_model_then_inspect() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matmul.mgr");
        cmd_gen_model(32, false, true, &path).unwrap();

        let graph = matgraph_format::load(&path).unwrap();
        assert_eq!(graph, matmul_graph(32, false, true).unwrap());
        assert_eq!(output_flags(&graph).unwrap(), (false, true));
        cmd_inspect(&path, false).unwrap();
        cmd_inspect(&path, true).unwrap();
    }

    #[test]
    fn test_inspect_missing_file() {
        let err = cmd_inspect(Path::new("/nonexistent/matmul.mgr"), false).unwrap_err();
        assert!(err.to_string().contains("failed to load"));
    }

    #[test]
    fn test_bench_small() {
        let args = BenchArgs {
            rows_a: Some(3),
            cols_a: Some(16),
            rows_b: Some(16),
            cols_b: Some(5),
            runs: Some(2),
            seed: Some(1),
            ..Default::default()
        };
        cmd_bench(&args).unwrap();
    }

    #[test]
    fn test_bench_dimension_mismatch() {
        let args = BenchArgs {
            rows_a: Some(3),
            cols_a: Some(16),
            rows_b: Some(8),
            cols_b: Some(5),
            runs: Some(1),
            seed: Some(1),
            ..Default::default()
        };
        assert!(cmd_bench(&args).is_err());
    }

    #[test]
    fn test_bench_loaded_graph() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.mgr");
        cmd_gen_model(4, true, false, &path).unwrap();
        // x: 4x4 transposed, y: 4x2
        let args = BenchArgs {
            rows_a: Some(4),
            cols_a: Some(4),
            rows_b: Some(4),
            cols_b: Some(2),
            runs: Some(1),
            seed: Some(3),
            graph: Some(path),
            ..Default::default()
        };
        cmd_bench(&args).unwrap();
    }

    #[test]
    fn test_flags_overridden() {
        assert!(!flags_overridden((false, false), (true, false)));
        assert!(!flags_overridden((true, false), (true, true)));
        assert!(flags_overridden((true, false), (false, false)));
        assert!(flags_overridden((false, true), (true, false)));
    }

    #[test]
    fn test_bench_loaded_graph_keeps_its_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.mgr");
        cmd_gen_model(4, false, false, &path).unwrap();
        // --transpose-b does not apply to a loaded graph: y stays 4x3
        let args = BenchArgs {
            rows_a: Some(2),
            cols_a: Some(4),
            rows_b: Some(4),
            cols_b: Some(3),
            runs: Some(1),
            seed: Some(5),
            transpose_b: true,
            graph: Some(path),
            ..Default::default()
        };
        cmd_bench(&args).unwrap();
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["matgraph", "bench", "--rows-a", "3", "--transpose-b", "--runs", "4"]).unwrap();
        match cli.command {
            Commands::Bench(args) => {
                assert_eq!(args.rows_a, Some(3));
                assert!(args.transpose_b);
                assert_eq!(args.runs, Some(4));
            }
            _ => panic!("expected bench"),
        }

        let cli = Cli::try_parse_from(["matgraph", "gen-model", "--feature-dim", "8"]).unwrap();
        assert!(matches!(cli.command, Commands::GenModel { feature_dim: 8, .. }));
    }

    #[test]
    fn test_gflops() {
        assert_eq!(gflops(10, 10, 10, 0.0), 0.0);
        assert!((gflops(1000, 1000, 1000, 1.0) - 2.0).abs() < 1e-9);
    }
}
