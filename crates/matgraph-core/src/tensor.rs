use std::fmt;
use std::sync::Arc;

use rand::Rng;
use smallvec::SmallVec;

use crate::error::MatgraphError;
use crate::shape::Shape;
use crate::Result;

/// A dense rank-2 f32 array.
///
/// Storage is reference-counted, so clones and transposed views share the
/// same buffer. A transpose only swaps strides; call `contiguous()` to get a
/// row-major copy.
///
/// # Examples
///
/// ```
/// use matgraph_core::Tensor;
///
/// let t = Tensor::from_f32(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
/// assert_eq!(t.shape().dims(), &[2, 3]);
///
/// let tr = t.transpose();
/// assert_eq!(tr.shape().dims(), &[3, 2]);
/// assert_eq!(tr.get(0, 1), Some(4.0));
/// ```
#[derive(Clone)]
pub struct Tensor {
    data: Arc<Vec<f32>>,
    shape: Shape,
    strides: SmallVec<[usize; 4]>,
}

impl Tensor {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Create a tensor from f32 data with the given rank-2 shape.
    pub fn from_f32(data: &[f32], shape: &[usize]) -> Result<Self> {
        Self::from_vec(data.to_vec(), shape)
    }

    /// Create a tensor taking ownership of row-major data.
    pub fn from_vec(data: Vec<f32>, shape: &[usize]) -> Result<Self> {
        let s = Shape::new(shape);
        if s.ndim() != 2 {
            return Err(MatgraphError::InvalidRank(shape.to_vec()));
        }
        let expected = s.checked_numel().unwrap_or(usize::MAX);
        if expected != data.len() {
            return Err(MatgraphError::InvalidData {
                expected,
                got: data.len(),
            });
        }
        let strides = s.contiguous_strides();
        Ok(Self {
            data: Arc::new(data),
            shape: s,
            strides,
        })
    }

    /// Build a tensor from fixed-width rows, e.g. `&[[1.0, 2.0], [3.0, 4.0]]`.
    pub fn from_rows<const N: usize>(rows: &[[f32; N]]) -> Self {
        let data: Vec<f32> = rows.iter().flatten().copied().collect();
        let shape = Shape::from([rows.len(), N]);
        let strides = shape.contiguous_strides();
        Self {
            data: Arc::new(data),
            shape,
            strides,
        }
    }

    /// Create a tensor of zeros.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        let shape = Shape::from([rows, cols]);
        let strides = shape.contiguous_strides();
        Self {
            data: Arc::new(vec![0.0; rows * cols]),
            shape,
            strides,
        }
    }

    /// Create a tensor with samples from N(0, std²) using a caller-provided RNG.
    pub fn randn_with<R: Rng + ?Sized>(rows: usize, cols: usize, std: f32, rng: &mut R) -> Self {
        // Box-Muller transform for normal distribution
        let data: Vec<f32> = (0..rows * cols)
            .map(|_| {
                let u1: f32 = rng.gen_range(1e-7f32..1.0f32);
                let u2: f32 = rng.gen_range(0.0f32..std::f32::consts::TAU);
                (-2.0 * u1.ln()).sqrt() * u2.cos() * std
            })
            .collect();
        let shape = Shape::from([rows, cols]);
        let strides = shape.contiguous_strides();
        Self {
            data: Arc::new(data),
            shape,
            strides,
        }
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// Shape of the tensor.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn rows(&self) -> usize {
        self.shape.dims()[0]
    }

    pub fn cols(&self) -> usize {
        self.shape.dims()[1]
    }

    /// Total number of elements.
    pub fn numel(&self) -> usize {
        self.shape.numel()
    }

    /// Strides (in elements, not bytes).
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Whether this tensor is contiguous in memory (row-major).
    pub fn is_contiguous(&self) -> bool {
        self.strides == self.shape.contiguous_strides()
    }

    // =========================================================================
    // Data access
    // =========================================================================

    /// Get the underlying f32 data as a slice (contiguous tensors only).
    pub fn as_f32_slice(&self) -> Option<&[f32]> {
        if !self.is_contiguous() {
            return None;
        }
        Some(self.data.as_slice())
    }

    /// Element at `(row, col)` in logical (post-view) coordinates.
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.rows() || col >= self.cols() {
            return None;
        }
        self.data
            .get(row * self.strides[0] + col * self.strides[1])
            .copied()
    }

    /// Row-major copy of the logical contents.
    pub fn to_vec(&self) -> Vec<f32> {
        if let Some(slice) = self.as_f32_slice() {
            return slice.to_vec();
        }
        let (rows, cols) = (self.rows(), self.cols());
        let (rs, cs) = (self.strides[0], self.strides[1]);
        let mut out = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                out.push(self.data[r * rs + c * cs]);
            }
        }
        out
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// Transpose (zero-copy view).
    pub fn transpose(&self) -> Tensor {
        let mut strides = self.strides.clone();
        strides.swap(0, 1);
        Tensor {
            data: Arc::clone(&self.data),
            shape: Shape::from([self.cols(), self.rows()]),
            strides,
        }
    }

    /// Return a contiguous copy of this tensor if it isn't already contiguous.
    pub fn contiguous(&self) -> Tensor {
        if self.is_contiguous() {
            return self.clone();
        }
        let shape = self.shape.clone();
        let strides = shape.contiguous_strides();
        Tensor {
            data: Arc::new(self.to_vec()),
            shape,
            strides,
        }
    }

    // =========================================================================
    // Comparison
    // =========================================================================

    /// Largest element-wise absolute difference, or `None` if shapes differ.
    pub fn max_abs_diff(&self, other: &Tensor) -> Option<f32> {
        if self.shape != other.shape {
            return None;
        }
        let a = self.to_vec();
        let b = other.to_vec();
        Some(
            a.iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y).abs())
                .fold(0.0f32, f32::max),
        )
    }

    /// Same shape and every element within `tol`.
    pub fn allclose(&self, other: &Tensor, tol: f32) -> bool {
        self.max_abs_diff(other).is_some_and(|d| d <= tol)
    }
}

impl PartialEq for Tensor {
    /// Logical equality: layout (view vs. contiguous) is ignored.
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape && self.to_vec() == other.to_vec()
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tensor(shape={}, contiguous={})",
            self.shape,
            self.is_contiguous(),
        )
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.to_vec();
        if data.len() <= 20 {
            write!(f, "tensor({:?}, shape={})", data, self.shape)
        } else {
            write!(
                f,
                "tensor([{:.4}, {:.4}, ..., {:.4}], shape={})",
                data[0],
                data[1],
                data[data.len() - 1],
                self.shape
            )
        }
    }
}
