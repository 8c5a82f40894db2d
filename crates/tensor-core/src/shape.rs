// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor shape descriptors: static [`Shape`] and [`PartialShape`].

use std::fmt;

/// Describes the dimensionality of a [`crate::Tensor`].
///
/// Shapes are immutable once created. Constant payloads always have a
/// static shape; graph values that may be only partially known use
/// [`PartialShape`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Creates a new shape from the given dimensions.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::Shape;
    /// let s = Shape::new(vec![2, 3, 4]);
    /// assert_eq!(s.rank(), 3);
    /// assert_eq!(s.num_elements(), 24);
    /// ```
    pub fn new(dims: Vec<usize>) -> Self {
        Self { dims }
    }

    /// Creates a scalar shape (rank 0).
    pub fn scalar() -> Self {
        Self { dims: vec![] }
    }

    /// Creates a 1-D shape.
    pub fn vector(len: usize) -> Self {
        Self { dims: vec![len] }
    }

    /// Creates a 2-D shape (matrix).
    pub fn matrix(rows: usize, cols: usize) -> Self {
        Self {
            dims: vec![rows, cols],
        }
    }

    /// Builds a shape from ONNX `int64` dimensions.
    ///
    /// Returns the first negative dimension as the error value.
    pub fn from_i64(dims: &[i64]) -> Result<Self, crate::TensorError> {
        let dims = dims
            .iter()
            .map(|&d| usize::try_from(d).map_err(|_| crate::TensorError::InvalidDimension(d)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { dims })
    }

    /// Returns the number of dimensions (rank).
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Returns the total number of elements.
    ///
    /// For a scalar shape (rank 0), returns 1.
    pub fn num_elements(&self) -> usize {
        self.dims.iter().product()
    }

    /// Returns the total number of elements, or `None` if the product
    /// overflows `usize`.
    pub fn checked_num_elements(&self) -> Option<usize> {
        self.dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    /// Returns the dimensions as a slice.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Returns the size of a specific dimension, or `None` if out of bounds.
    pub fn dim(&self, index: usize) -> Option<usize> {
        self.dims.get(index).copied()
    }

    /// Computes the memory footprint in bytes for a given [`crate::DType`].
    pub fn size_bytes(&self, dtype: super::DType) -> usize {
        self.num_elements() * dtype.size_bytes()
    }

    /// Like [`Shape::size_bytes`], but `None` when the footprint overflows `usize`.
    pub fn checked_size_bytes(&self, dtype: super::DType) -> Option<usize> {
        self.checked_num_elements()?.checked_mul(dtype.size_bytes())
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

/// Convenience: `Shape::from(vec![2, 3])`.
impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self::new(dims)
    }
}

/// Convenience: `Shape::from(&[2, 3][..])`.
impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self::new(dims.to_vec())
    }
}

// ── Partial shapes ─────────────────────────────────────────────────

/// A single dimension of a [`PartialShape`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dim {
    /// A dimension whose extent is known.
    Fixed(usize),
    /// A dimension whose extent is only known at execution time.
    Dynamic,
}

impl Dim {
    /// Returns the extent if it is known.
    pub fn as_fixed(self) -> Option<usize> {
        match self {
            Dim::Fixed(n) => Some(n),
            Dim::Dynamic => None,
        }
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dim::Fixed(n) => write!(f, "{n}"),
            Dim::Dynamic => f.write_str("?"),
        }
    }
}

/// A shape that may be only partially known.
///
/// Graph inputs frequently carry symbolic batch dimensions, and operator
/// outputs produced without full inference have unknown rank. The importer
/// propagates whatever is known and never invents extents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialShape {
    /// Even the rank is unknown.
    DynamicRank,
    /// The rank is known; individual dimensions may not be.
    Ranked(Vec<Dim>),
}

impl Default for PartialShape {
    fn default() -> Self {
        PartialShape::DynamicRank
    }
}

impl PartialShape {
    /// Shape with unknown rank.
    pub fn dynamic() -> Self {
        PartialShape::DynamicRank
    }

    /// Fully known shape.
    pub fn fixed(dims: &[usize]) -> Self {
        PartialShape::Ranked(dims.iter().map(|&d| Dim::Fixed(d)).collect())
    }

    /// Rank-0 shape.
    pub fn scalar() -> Self {
        PartialShape::Ranked(Vec::new())
    }

    /// Returns the rank if it is known.
    pub fn rank(&self) -> Option<usize> {
        match self {
            PartialShape::DynamicRank => None,
            PartialShape::Ranked(dims) => Some(dims.len()),
        }
    }

    /// Returns the dimensions if the rank is known.
    pub fn dims(&self) -> Option<&[Dim]> {
        match self {
            PartialShape::DynamicRank => None,
            PartialShape::Ranked(dims) => Some(dims),
        }
    }

    /// Returns `true` when every dimension is known.
    pub fn is_static(&self) -> bool {
        self.to_shape().is_some()
    }

    /// Converts to a static [`Shape`] if every dimension is known.
    pub fn to_shape(&self) -> Option<Shape> {
        let dims = self.dims()?;
        dims.iter()
            .map(|d| d.as_fixed())
            .collect::<Option<Vec<_>>>()
            .map(Shape::new)
    }

    /// Numpy-style broadcast of two shapes.
    ///
    /// Dimensions are aligned from the right; each pair must be equal or
    /// one of them must be 1. Returns `None` when two known extents clash.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Dim, PartialShape};
    /// let a = PartialShape::fixed(&[4, 1]);
    /// let b = PartialShape::Ranked(vec![Dim::Dynamic, Dim::Fixed(3)]);
    /// assert_eq!(
    ///     a.broadcast(&b),
    ///     Some(PartialShape::Ranked(vec![Dim::Fixed(4), Dim::Fixed(3)])),
    /// );
    /// ```
    pub fn broadcast(&self, other: &PartialShape) -> Option<PartialShape> {
        let (a, b) = match (self.dims(), other.dims()) {
            (Some(a), Some(b)) => (a, b),
            _ => return Some(PartialShape::DynamicRank),
        };
        let rank = a.len().max(b.len());
        let mut out = vec![Dim::Dynamic; rank];
        for i in 0..rank {
            let da = if i < a.len() { a[a.len() - 1 - i] } else { Dim::Fixed(1) };
            let db = if i < b.len() { b[b.len() - 1 - i] } else { Dim::Fixed(1) };
            out[rank - 1 - i] = broadcast_dim(da, db)?;
        }
        Some(PartialShape::Ranked(out))
    }

    /// Infers the output shape of a numpy-style matrix multiply.
    ///
    /// 1-D operands are promoted the way ONNX `MatMul` specifies and the
    /// promoted axis is dropped from the result. Returns `None` when the
    /// contracted dimensions are both known and differ, or when the batch
    /// dimensions cannot be broadcast.
    pub fn matmul(&self, other: &PartialShape) -> Option<PartialShape> {
        let (a, b) = match (self.dims(), other.dims()) {
            (Some(a), Some(b)) => (a, b),
            _ => return Some(PartialShape::DynamicRank),
        };
        if a.is_empty() || b.is_empty() {
            return None;
        }
        let lhs_vector = a.len() == 1;
        let rhs_vector = b.len() == 1;
        let a: Vec<Dim> = if lhs_vector { vec![Dim::Fixed(1), a[0]] } else { a.to_vec() };
        let b: Vec<Dim> = if rhs_vector { vec![b[0], Dim::Fixed(1)] } else { b.to_vec() };

        let k_lhs = a[a.len() - 1];
        let k_rhs = b[b.len() - 2];
        if let (Dim::Fixed(x), Dim::Fixed(y)) = (k_lhs, k_rhs) {
            if x != y {
                return None;
            }
        }

        let batch_a = PartialShape::Ranked(a[..a.len() - 2].to_vec());
        let batch_b = PartialShape::Ranked(b[..b.len() - 2].to_vec());
        let mut dims = match batch_a.broadcast(&batch_b)? {
            PartialShape::Ranked(dims) => dims,
            PartialShape::DynamicRank => return Some(PartialShape::DynamicRank),
        };
        if !lhs_vector {
            dims.push(a[a.len() - 2]);
        }
        if !rhs_vector {
            dims.push(b[b.len() - 1]);
        }
        Some(PartialShape::Ranked(dims))
    }

    /// Merges two shapes describing the same value, keeping only what both agree on.
    pub fn merge(&self, other: &PartialShape) -> PartialShape {
        match (self.dims(), other.dims()) {
            (Some(a), Some(b)) if a.len() == b.len() => PartialShape::Ranked(
                a.iter()
                    .zip(b)
                    .map(|(x, y)| if x == y { *x } else { Dim::Dynamic })
                    .collect(),
            ),
            _ => PartialShape::DynamicRank,
        }
    }
}

fn broadcast_dim(a: Dim, b: Dim) -> Option<Dim> {
    match (a, b) {
        (Dim::Fixed(x), Dim::Fixed(y)) if x == y => Some(Dim::Fixed(x)),
        (Dim::Fixed(1), other) | (other, Dim::Fixed(1)) => Some(other),
        (Dim::Fixed(_), Dim::Fixed(_)) => None,
        (Dim::Fixed(n), Dim::Dynamic) | (Dim::Dynamic, Dim::Fixed(n)) => Some(Dim::Fixed(n)),
        (Dim::Dynamic, Dim::Dynamic) => Some(Dim::Dynamic),
    }
}

impl From<&Shape> for PartialShape {
    fn from(shape: &Shape) -> Self {
        PartialShape::fixed(shape.dims())
    }
}

impl fmt::Display for PartialShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartialShape::DynamicRank => f.write_str("[...]"),
            PartialShape::Ranked(dims) => {
                write!(f, "[")?;
                for (i, d) in dims.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{d}")?;
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DType;

    #[test]
    fn test_scalar_shape() {
        let s = Shape::scalar();
        assert_eq!(s.rank(), 0);
        assert_eq!(s.num_elements(), 1);
    }

    #[test]
    fn test_matrix_shape() {
        let s = Shape::matrix(3, 4);
        assert_eq!(s.rank(), 2);
        assert_eq!(s.num_elements(), 12);
        assert_eq!(s.size_bytes(DType::F32), 48);
    }

    #[test]
    fn test_zero_extent() {
        let s = Shape::new(vec![0, 5]);
        assert_eq!(s.num_elements(), 0);
    }

    #[test]
    fn test_checked_sizes() {
        let s = Shape::matrix(3, 4);
        assert_eq!(s.checked_num_elements(), Some(12));
        assert_eq!(s.checked_size_bytes(DType::F32), Some(48));

        let huge = Shape::from_i64(&[1 << 40, 1 << 40]).unwrap();
        assert_eq!(huge.checked_num_elements(), None);
        assert_eq!(huge.checked_size_bytes(DType::F32), None);

        // Fits as an element count but not as a byte count.
        let wide = Shape::vector(usize::MAX / 2);
        assert!(wide.checked_num_elements().is_some());
        assert_eq!(wide.checked_size_bytes(DType::I64), None);

        // A zero extent keeps the product at zero.
        assert_eq!(Shape::new(vec![0, usize::MAX, 2]).checked_num_elements(), Some(0));
    }

    #[test]
    fn test_from_i64() {
        assert_eq!(Shape::from_i64(&[2, 3]).unwrap(), Shape::matrix(2, 3));
        assert!(Shape::from_i64(&[2, -1]).is_err());
    }

    #[test]
    fn test_display() {
        let s = Shape::new(vec![2, 3, 4]);
        assert_eq!(format!("{s}"), "[2, 3, 4]");
        let p = PartialShape::Ranked(vec![Dim::Dynamic, Dim::Fixed(3)]);
        assert_eq!(format!("{p}"), "[?, 3]");
        assert_eq!(format!("{}", PartialShape::dynamic()), "[...]");
    }

    #[test]
    fn test_broadcast() {
        let a = PartialShape::fixed(&[1, 3]);
        let b = PartialShape::fixed(&[4, 3]);
        assert_eq!(a.broadcast(&b), Some(PartialShape::fixed(&[4, 3])));

        let c = PartialShape::fixed(&[3]);
        assert_eq!(b.broadcast(&c), Some(PartialShape::fixed(&[4, 3])));

        let d = PartialShape::fixed(&[4, 2]);
        assert_eq!(a.broadcast(&d), None);

        assert_eq!(a.broadcast(&PartialShape::dynamic()), Some(PartialShape::dynamic()));
    }

    #[test]
    fn test_broadcast_dynamic_dims() {
        let a = PartialShape::Ranked(vec![Dim::Dynamic, Dim::Fixed(1)]);
        let b = PartialShape::fixed(&[1, 8]);
        assert_eq!(
            a.broadcast(&b),
            Some(PartialShape::Ranked(vec![Dim::Dynamic, Dim::Fixed(8)]))
        );
    }

    #[test]
    fn test_matmul() {
        let a = PartialShape::fixed(&[3, 4]);
        let b = PartialShape::fixed(&[4, 5]);
        assert_eq!(a.matmul(&b), Some(PartialShape::fixed(&[3, 5])));

        let c = PartialShape::fixed(&[5, 5]);
        assert_eq!(a.matmul(&c), None);

        let batched = PartialShape::fixed(&[2, 3, 4]);
        assert_eq!(batched.matmul(&b), Some(PartialShape::fixed(&[2, 3, 5])));

        let v = PartialShape::fixed(&[4]);
        assert_eq!(a.matmul(&v), Some(PartialShape::fixed(&[3])));
        assert_eq!(v.matmul(&b), Some(PartialShape::fixed(&[5])));
    }

    #[test]
    fn test_merge() {
        let a = PartialShape::fixed(&[2, 3]);
        let b = PartialShape::fixed(&[2, 4]);
        assert_eq!(
            a.merge(&b),
            PartialShape::Ranked(vec![Dim::Fixed(2), Dim::Dynamic])
        );
        assert_eq!(a.merge(&PartialShape::fixed(&[2])), PartialShape::dynamic());
    }

    #[test]
    fn test_to_shape() {
        assert_eq!(PartialShape::fixed(&[2, 3]).to_shape(), Some(Shape::matrix(2, 3)));
        assert!(PartialShape::Ranked(vec![Dim::Dynamic]).to_shape().is_none());
        assert!(!PartialShape::dynamic().is_static());
    }

    #[test]
    fn test_from_conversions() {
        let s1: Shape = vec![2, 3].into();
        let s2: Shape = (&[2, 3][..]).into();
        assert_eq!(s1, s2);
        assert_eq!(PartialShape::from(&s1), PartialShape::fixed(&[2, 3]));
    }
}
