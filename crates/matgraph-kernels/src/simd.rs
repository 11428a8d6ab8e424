//! Runtime SIMD capability detection.
//!
//! Detection runs once per process; the result picks the matmul inner loop.

use std::fmt;
use std::sync::OnceLock;

/// SIMD capabilities detected at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimdCapability {
    pub avx2: bool,
    pub fma: bool,
    pub neon: bool,
}

/// Inner loop used by the tiled matmul.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatmulPath {
    /// 8-wide fused multiply-add. Rounding can differ from the reference in
    /// the low-order bits.
    Avx2Fma,
    /// Plain multiply then add, bit-identical to the reference loop.
    Scalar,
}

impl fmt::Display for MatmulPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatmulPath::Avx2Fma => write!(f, "avx2+fma"),
            MatmulPath::Scalar => write!(f, "scalar"),
        }
    }
}

static DETECTED: OnceLock<SimdCapability> = OnceLock::new();

impl SimdCapability {
    /// Detect SIMD capabilities for the current CPU.
    pub fn detect() -> &'static SimdCapability {
        DETECTED.get_or_init(|| {
            #[cfg(target_arch = "x86_64")]
            {
                SimdCapability {
                    avx2: is_x86_feature_detected!("avx2"),
                    fma: is_x86_feature_detected!("fma"),
                    neon: false,
                }
            }

            #[cfg(target_arch = "aarch64")]
            {
                SimdCapability {
                    avx2: false,
                    fma: false,
                    neon: true, // mandatory on AArch64
                }
            }

            #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
            {
                SimdCapability {
                    avx2: false,
                    fma: false,
                    neon: false,
                }
            }
        })
    }

    /// Inner loop the tiled matmul will use on this CPU.
    pub fn matmul_path(&self) -> MatmulPath {
        if cfg!(target_arch = "x86_64") && self.avx2 && self.fma {
            MatmulPath::Avx2Fma
        } else {
            MatmulPath::Scalar
        }
    }

    /// Best available SIMD tier as a human-readable string.
    pub fn best_tier(&self) -> &'static str {
        if self.avx2 {
            "AVX2"
        } else if self.neon {
            "NEON"
        } else {
            "scalar"
        }
    }
}
