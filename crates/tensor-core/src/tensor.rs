// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Owned constant tensor.

use crate::{DType, Shape, TensorError};

/// An owned, n-dimensional tensor stored in contiguous memory.
///
/// `Tensor` is the payload of every IR constant: decoded initializers,
/// `Constant` operator attributes and the zero scalars substituted for
/// initializers that fail to decode.
///
/// # Memory Layout
/// Data is stored in row-major (C) order as a flat little-endian byte
/// buffer, the same layout ONNX uses for `raw_data`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Shape,
    dtype: DType,
    data: Vec<u8>,
}

impl Tensor {
    /// Creates a new tensor filled with zeros.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Tensor, Shape, DType};
    /// let t = Tensor::zeros(Shape::matrix(2, 3), DType::F32);
    /// assert_eq!(t.size_bytes(), 24); // 2 * 3 * 4 bytes
    /// ```
    pub fn zeros(shape: Shape, dtype: DType) -> Self {
        let size = shape.size_bytes(dtype);
        Self {
            shape,
            dtype,
            data: vec![0u8; size],
        }
    }

    /// Creates a rank-0 tensor holding a single zero of `dtype`.
    pub fn scalar_zero(dtype: DType) -> Self {
        Self::zeros(Shape::scalar(), dtype)
    }

    /// Creates a tensor from raw little-endian bytes.
    ///
    /// Returns an error if the buffer size does not match `shape.size_bytes(dtype)`.
    pub fn from_bytes(shape: Shape, dtype: DType, data: Vec<u8>) -> Result<Self, TensorError> {
        let expected = shape
            .checked_size_bytes(dtype)
            .ok_or_else(|| TensorError::ShapeTooLarge(shape.clone()))?;
        if data.len() != expected {
            return Err(TensorError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, dtype, data })
    }

    /// Creates a tensor from a slice of `f32` values.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Tensor, Shape};
    /// let t = Tensor::from_f32(Shape::vector(3), &[1.0, 2.0, 3.0]).unwrap();
    /// assert_eq!(t.to_f32_vec().unwrap(), vec![1.0, 2.0, 3.0]);
    /// ```
    pub fn from_f32(shape: Shape, values: &[f32]) -> Result<Self, TensorError> {
        check_count(&shape, values.len())?;
        let data = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Ok(Self {
            shape,
            dtype: DType::F32,
            data,
        })
    }

    /// Creates a tensor from a slice of `i64` values.
    pub fn from_i64(shape: Shape, values: &[i64]) -> Result<Self, TensorError> {
        check_count(&shape, values.len())?;
        let data = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Ok(Self {
            shape,
            dtype: DType::I64,
            data,
        })
    }

    /// Creates a boolean tensor.
    pub fn from_bool(shape: Shape, values: &[bool]) -> Result<Self, TensorError> {
        check_count(&shape, values.len())?;
        Ok(Self {
            shape,
            dtype: DType::Bool,
            data: values.iter().map(|&b| u8::from(b)).collect(),
        })
    }

    /// Returns the tensor's shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the tensor's data type.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Returns the raw byte slice backing this tensor.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns the memory footprint of this tensor in bytes.
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Returns the number of elements.
    pub fn num_elements(&self) -> usize {
        self.shape.num_elements()
    }

    /// Decodes the payload as `f32` values.
    pub fn to_f32_vec(&self) -> Result<Vec<f32>, TensorError> {
        self.expect_dtype(DType::F32)?;
        Ok(self
            .data
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    /// Decodes the payload as `i32` values.
    pub fn to_i32_vec(&self) -> Result<Vec<i32>, TensorError> {
        self.expect_dtype(DType::I32)?;
        Ok(self
            .data
            .chunks_exact(4)
            .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    /// Decodes the payload as `i64` values.
    pub fn to_i64_vec(&self) -> Result<Vec<i64>, TensorError> {
        self.expect_dtype(DType::I64)?;
        Ok(self
            .data
            .chunks_exact(8)
            .map(|c| i64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
            .collect())
    }

    /// Decodes the payload as booleans.
    pub fn to_bool_vec(&self) -> Result<Vec<bool>, TensorError> {
        self.expect_dtype(DType::Bool)?;
        Ok(self.data.iter().map(|&b| b != 0).collect())
    }

    fn expect_dtype(&self, requested: DType) -> Result<(), TensorError> {
        if self.dtype != requested {
            return Err(TensorError::DTypeMismatch {
                requested,
                actual: self.dtype,
            });
        }
        Ok(())
    }
}

fn check_count(shape: &Shape, actual: usize) -> Result<(), TensorError> {
    let expected = shape
        .checked_num_elements()
        .ok_or_else(|| TensorError::ShapeTooLarge(shape.clone()))?;
    if actual != expected {
        return Err(TensorError::ElementCountMismatch {
            shape: shape.clone(),
            expected,
            actual,
        });
    }
    Ok(())
}
