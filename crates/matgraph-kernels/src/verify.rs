//! Element-wise verification of one matmul result against another.

use std::fmt;

use matgraph_core::{MatgraphError, Result, ShapeSpec, Tensor};

/// Absolute difference above which a same-signed element counts as wrong.
pub const VALUE_ERROR_THRESHOLD: f32 = 1.0;

/// Summary of how far `actual` strays from `expected`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComparisonReport {
    pub elements: usize,
    /// Mean absolute difference per element.
    pub mean_abs_err: f64,
    /// Elements whose signs disagree (product < 0).
    pub sign_errors: usize,
    /// Same-signed elements differing by more than `VALUE_ERROR_THRESHOLD`.
    pub value_errors: usize,
}

impl ComparisonReport {
    pub fn sign_error_ratio(&self) -> f64 {
        ratio(self.sign_errors, self.elements)
    }

    pub fn value_error_ratio(&self) -> f64 {
        ratio(self.value_errors, self.elements)
    }

    pub fn is_clean(&self) -> bool {
        self.sign_errors == 0 && self.value_errors == 0
    }
}

fn ratio(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

impl fmt::Display for ComparisonReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "err per element: {:.6}, sign errors: {:.4}%, value errors: {:.4}%",
            self.mean_abs_err,
            self.sign_error_ratio() * 100.0,
            self.value_error_ratio() * 100.0,
        )
    }
}

/// Compare two results of the same shape.
pub fn compare(actual: &Tensor, expected: &Tensor) -> Result<ComparisonReport> {
    if actual.shape() != expected.shape() {
        return Err(MatgraphError::ShapeMismatch {
            lhs: ShapeSpec::from(actual.shape()),
            rhs: ShapeSpec::from(expected.shape()),
        });
    }

    let a = actual.to_vec();
    let e = expected.to_vec();

    let mut total_err = 0.0f64;
    let mut sign_errors = 0;
    let mut value_errors = 0;
    for (&x, &y) in a.iter().zip(e.iter()) {
        let diff = (x - y).abs();
        total_err += diff as f64;
        if x * y < 0.0 {
            sign_errors += 1;
        } else if diff > VALUE_ERROR_THRESHOLD {
            value_errors += 1;
        }
    }

    let elements = a.len();
    Ok(ComparisonReport {
        elements,
        mean_abs_err: if elements == 0 { 0.0 } else { total_err / elements as f64 },
        sign_errors,
        value_errors,
    })
}
