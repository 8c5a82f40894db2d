// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for tensor construction and access.

use crate::{DType, Shape};

/// Errors that can occur when building or reading a [`crate::Tensor`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TensorError {
    /// The provided buffer size does not match the expected size for the given shape and dtype.
    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// The number of provided values does not match the shape's element count.
    #[error("element count mismatch for shape {shape}: expected {expected}, got {actual}")]
    ElementCountMismatch {
        shape: Shape,
        expected: usize,
        actual: usize,
    },

    /// The requested typed view does not match the tensor's element type.
    #[error("cannot read {requested:?} elements from a {actual:?} tensor")]
    DTypeMismatch { requested: DType, actual: DType },

    /// A dimension was negative or otherwise unrepresentable.
    #[error("invalid dimension {0}")]
    InvalidDimension(i64),

    /// The shape's element count or byte size does not fit in `usize`.
    #[error("shape {0} is too large")]
    ShapeTooLarge(Shape),
}
