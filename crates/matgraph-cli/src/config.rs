//! Benchmark configuration: defaults, optional JSON file, then flags.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// Standard deviation of the random inputs.
pub const DEFAULT_STD: f32 = 5.0;

/// Fully resolved settings for `matgraph bench`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchConfig {
    pub rows_a: usize,
    pub cols_a: usize,
    pub rows_b: usize,
    pub cols_b: usize,
    pub transpose_a: bool,
    pub transpose_b: bool,
    pub runs: usize,
    /// Fixed seed for reproducible inputs; fresh entropy when absent.
    pub seed: Option<u64>,
    pub std: f32,
    /// Encoded graph to execute instead of the generated one.
    pub graph: Option<PathBuf>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            rows_a: 128,
            cols_a: 1024,
            rows_b: 1024,
            cols_b: 128,
            transpose_a: false,
            transpose_b: false,
            runs: 10,
            seed: None,
            std: DEFAULT_STD,
            graph: None,
        }
    }
}

/// Command-line overrides. Any flag given wins over the config file.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct BenchArgs {
    /// Rows of A
    #[arg(long)]
    pub rows_a: Option<usize>,
    /// Columns of A
    #[arg(long)]
    pub cols_a: Option<usize>,
    /// Rows of B
    #[arg(long)]
    pub rows_b: Option<usize>,
    /// Columns of B
    #[arg(long)]
    pub cols_b: Option<usize>,
    /// Multiply by A transposed (ignored with --graph)
    #[arg(long)]
    pub transpose_a: bool,
    /// Multiply by B transposed (ignored with --graph)
    #[arg(long)]
    pub transpose_b: bool,
    /// Number of timed session runs
    #[arg(long)]
    pub runs: Option<usize>,
    /// Seed for the random inputs
    #[arg(long)]
    pub seed: Option<u64>,
    /// Encoded graph to run (generated from the dimensions when omitted).
    /// Its MatMul transpose flags take precedence over --transpose-a/-b
    #[arg(long)]
    pub graph: Option<PathBuf>,
    /// JSON file with any of the settings above
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl BenchConfig {
    /// Read a JSON config. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    /// Defaults, then the config file if one was given, then flags.
    pub fn resolve(args: &BenchArgs) -> Result<Self> {
        let base = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let cfg = base.with_overrides(args);
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn with_overrides(mut self, args: &BenchArgs) -> Self {
        if let Some(v) = args.rows_a {
            self.rows_a = v;
        }
        if let Some(v) = args.cols_a {
            self.cols_a = v;
        }
        if let Some(v) = args.rows_b {
            self.rows_b = v;
        }
        if let Some(v) = args.cols_b {
            self.cols_b = v;
        }
        if let Some(v) = args.runs {
            self.runs = v;
        }
        if args.seed.is_some() {
            self.seed = args.seed;
        }
        if args.graph.is_some() {
            self.graph = args.graph.clone();
        }
        // Boolean flags can only switch a transpose on.
        self.transpose_a |= args.transpose_a;
        self.transpose_b |= args.transpose_b;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.runs == 0 {
            bail!("runs must be at least 1");
        }
        if !(self.std.is_finite() && self.std > 0.0) {
            bail!("std must be a positive number, got {}", self.std);
        }
        Ok(())
    }
}
