use smallvec::SmallVec;
use std::fmt;

/// Concrete tensor shape with stack-allocated storage for ≤4 dimensions.
///
/// Tensors in matgraph are rank 2, but shapes are kept general so that
/// rank errors can be reported with the offending dimensions.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: SmallVec<[usize; 4]>,
}

impl Shape {
    /// Create a new shape from dimensions.
    pub fn new(dims: &[usize]) -> Self {
        Self {
            dims: SmallVec::from_slice(dims),
        }
    }

    /// Number of dimensions (rank).
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Total number of elements.
    pub fn numel(&self) -> usize {
        self.dims.iter().product()
    }

    /// Total number of elements, or `None` if the product overflows.
    pub fn checked_numel(&self) -> Option<usize> {
        self.dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    /// Get dimension sizes as a slice.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Get size of a specific dimension.
    pub fn dim(&self, axis: usize) -> Option<usize> {
        self.dims.get(axis).copied()
    }

    /// `[rows, cols]` for a rank-2 shape.
    pub fn as_matrix(&self) -> Option<[usize; 2]> {
        match self.dims.as_slice() {
            &[rows, cols] => Some([rows, cols]),
            _ => None,
        }
    }

    /// Compute default strides for a contiguous row-major layout.
    pub fn contiguous_strides(&self) -> SmallVec<[usize; 4]> {
        let ndim = self.dims.len();
        if ndim == 0 {
            return SmallVec::new();
        }
        let mut strides = SmallVec::from_elem(0usize, ndim);
        strides[ndim - 1] = 1;
        for i in (0..ndim - 1).rev() {
            strides[i] = strides[i + 1] * self.dims[i + 1];
        }
        strides
    }

}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shape({:?})", self.dims.as_slice())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Shape::new(dims)
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape {
            dims: SmallVec::from_vec(dims),
        }
    }
}

impl From<[usize; 2]> for Shape {
    fn from(dims: [usize; 2]) -> Self {
        Shape::new(&dims)
    }
}

// =============================================================================
// Symbolic shapes
// =============================================================================

/// One dimension of a shape descriptor.
///
/// `Unbound` marks a placeholder (typically the batch axis) whose size is
/// only known when the graph is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Dim {
    Fixed(usize),
    Unbound,
}

impl Dim {
    pub fn is_bound(&self) -> bool {
        matches!(self, Dim::Fixed(_))
    }

    /// The fixed size, if bound.
    pub fn value(&self) -> Option<usize> {
        match self {
            Dim::Fixed(n) => Some(*n),
            Dim::Unbound => None,
        }
    }

    /// Whether a concrete size is acceptable for this dim.
    pub fn accepts(&self, size: usize) -> bool {
        match self {
            Dim::Fixed(n) => *n == size,
            Dim::Unbound => true,
        }
    }

    /// Two dims are compatible unless both are bound to different sizes.
    pub fn compatible_with(&self, other: &Dim) -> bool {
        match (self, other) {
            (Dim::Fixed(a), Dim::Fixed(b)) => a == b,
            _ => true,
        }
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dim::Fixed(n) => write!(f, "{n}"),
            Dim::Unbound => write!(f, "?"),
        }
    }
}

impl From<usize> for Dim {
    fn from(n: usize) -> Self {
        Dim::Fixed(n)
    }
}

/// Rank-2 shape descriptor attached to graph nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShapeSpec {
    pub rows: Dim,
    pub cols: Dim,
}

impl ShapeSpec {
    pub fn new(rows: impl Into<Dim>, cols: impl Into<Dim>) -> Self {
        Self {
            rows: rows.into(),
            cols: cols.into(),
        }
    }

    /// A fully bound descriptor.
    pub fn fixed(rows: usize, cols: usize) -> Self {
        Self::new(Dim::Fixed(rows), Dim::Fixed(cols))
    }

    /// Swap rows and cols.
    pub fn transpose(&self) -> Self {
        Self {
            rows: self.cols,
            cols: self.rows,
        }
    }

    /// Transpose only when `flag` is set.
    pub fn transpose_if(&self, flag: bool) -> Self {
        if flag {
            self.transpose()
        } else {
            *self
        }
    }

    pub fn is_fully_bound(&self) -> bool {
        self.rows.is_bound() && self.cols.is_bound()
    }

    /// Whether a concrete shape is rank 2 and agrees with every bound dim.
    pub fn is_satisfied_by(&self, shape: &Shape) -> bool {
        match shape.as_matrix() {
            Some([r, c]) => self.rows.accepts(r) && self.cols.accepts(c),
            None => false,
        }
    }

    /// Concrete shape, if every dim is bound.
    pub fn to_shape(&self) -> Option<Shape> {
        Some(Shape::from([self.rows.value()?, self.cols.value()?]))
    }
}

impl fmt::Display for ShapeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.rows, self.cols)
    }
}

impl From<&Shape> for ShapeSpec {
    /// Describe a concrete shape. Dims beyond rank 2 are not representable;
    /// missing dims come out as `Unbound`.
    fn from(shape: &Shape) -> Self {
        let d = |axis| shape.dim(axis).map(Dim::Fixed).unwrap_or(Dim::Unbound);
        ShapeSpec::new(d(0), d(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_basics() {
        let s = Shape::new(&[2, 3]);
        assert_eq!(s.ndim(), 2);
        assert_eq!(s.numel(), 6);
        assert_eq!(s.as_matrix(), Some([2, 3]));
        assert_eq!(Shape::new(&[2, 3, 4]).as_matrix(), None);
    }

    #[test]
    fn test_contiguous_strides() {
        let s = Shape::new(&[2, 3]);
        assert_eq!(s.contiguous_strides().as_slice(), &[3, 1]);
    }

    #[test]
    fn test_checked_numel() {
        assert_eq!(Shape::new(&[2, 3]).checked_numel(), Some(6));
        assert_eq!(Shape::new(&[usize::MAX, 0]).checked_numel(), Some(0));
        assert_eq!(Shape::new(&[usize::MAX, 2]).checked_numel(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Shape::new(&[4, 5])), "[4, 5]");
        assert_eq!(format!("{}", ShapeSpec::new(Dim::Unbound, 1024)), "[?, 1024]");
    }

    #[test]
    fn test_dim_compatibility() {
        assert!(Dim::Fixed(3).compatible_with(&Dim::Fixed(3)));
        assert!(!Dim::Fixed(3).compatible_with(&Dim::Fixed(4)));
        assert!(Dim::Unbound.compatible_with(&Dim::Fixed(4)));
        assert!(Dim::Fixed(4).compatible_with(&Dim::Unbound));
    }

    #[test]
    fn test_spec_satisfied_by() {
        let spec = ShapeSpec::new(Dim::Unbound, 1024);
        assert!(spec.is_satisfied_by(&Shape::new(&[1, 1024])));
        assert!(spec.is_satisfied_by(&Shape::new(&[77, 1024])));
        assert!(!spec.is_satisfied_by(&Shape::new(&[77, 512])));
        assert!(!spec.is_satisfied_by(&Shape::new(&[1024])));
    }

    #[test]
    fn test_spec_transpose() {
        let spec = ShapeSpec::new(Dim::Unbound, 8);
        assert_eq!(spec.transpose(), ShapeSpec::new(8, Dim::Unbound));
        assert_eq!(spec.transpose_if(false), spec);
        assert!(spec.to_shape().is_none());
        assert_eq!(ShapeSpec::fixed(2, 3).to_shape(), Some(Shape::new(&[2, 3])));
    }
}
