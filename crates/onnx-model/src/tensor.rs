// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Named constant tensor descriptions (initializers and tensor attributes).
//!
//! A [`TensorDescriptor`] is still *undecoded*: the element type is kept as
//! the raw ONNX code and the payload in whichever field the producer chose.
//! Turning it into a typed constant, and deciding what to do when that
//! fails, is the importer's job.

use crate::dtype::{dtype_from_onnx, onnx_code};
use tensor_core::DType;

/// Location of a payload stored outside the model file.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ExternalDataRef {
    /// Path of the data file, relative to the model's directory.
    pub location: String,
    /// Byte offset of the payload inside the data file.
    #[serde(default)]
    pub offset: u64,
    /// Payload length in bytes; `None` means "until end of file".
    #[serde(default)]
    pub length: Option<u64>,
}

/// The payload of a [`TensorDescriptor`], in the field it was stored in.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TensorData {
    /// No payload at all.
    Empty,
    /// Little-endian `raw_data`.
    Raw(Vec<u8>),
    /// `float_data`.
    Floats(Vec<f32>),
    /// `int32_data`: also carries int8/int16/uint8/uint16/bool/float16/bfloat16.
    Int32s(Vec<i32>),
    /// `int64_data`.
    Int64s(Vec<i64>),
    /// `double_data`.
    Doubles(Vec<f64>),
    /// `uint64_data`: also carries uint32.
    UInt64s(Vec<u64>),
    /// `string_data`.
    Strings(Vec<Vec<u8>>),
    /// Payload lives in an external file.
    External(ExternalDataRef),
}

impl Default for TensorData {
    fn default() -> Self {
        TensorData::Empty
    }
}

/// A named constant tensor as it appears in the model description.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TensorDescriptor {
    /// Tensor name; initializers are looked up by it.
    pub name: String,
    /// Raw ONNX element type code (see [`crate::dtype::elem_type`]).
    pub elem_type: i32,
    /// Dimensions as stored in the model (may be malformed, e.g. negative).
    #[serde(default)]
    pub dims: Vec<i64>,
    /// Payload.
    #[serde(default)]
    pub data: TensorData,
}

/// Initializers are plain tensor descriptors attached to a graph.
pub type InitializerDescriptor = TensorDescriptor;

impl TensorDescriptor {
    /// Creates a descriptor from its parts.
    pub fn new(name: impl Into<String>, elem_type: i32, dims: Vec<i64>, data: TensorData) -> Self {
        Self {
            name: name.into(),
            elem_type,
            dims,
            data,
        }
    }

    /// `float` tensor stored in `float_data`.
    pub fn from_f32(name: impl Into<String>, dims: &[i64], values: &[f32]) -> Self {
        Self::new(
            name,
            onnx_code(DType::F32),
            dims.to_vec(),
            TensorData::Floats(values.to_vec()),
        )
    }

    /// `int64` tensor stored in `int64_data`.
    pub fn from_i64(name: impl Into<String>, dims: &[i64], values: &[i64]) -> Self {
        Self::new(
            name,
            onnx_code(DType::I64),
            dims.to_vec(),
            TensorData::Int64s(values.to_vec()),
        )
    }

    /// Tensor stored as little-endian `raw_data`.
    pub fn raw(name: impl Into<String>, dtype: DType, dims: &[i64], bytes: Vec<u8>) -> Self {
        Self::new(name, onnx_code(dtype), dims.to_vec(), TensorData::Raw(bytes))
    }

    /// Tensor whose payload lives in an external file.
    pub fn external(
        name: impl Into<String>,
        dtype: DType,
        dims: &[i64],
        location: impl Into<String>,
        offset: u64,
        length: Option<u64>,
    ) -> Self {
        Self::new(
            name,
            onnx_code(dtype),
            dims.to_vec(),
            TensorData::External(ExternalDataRef {
                location: location.into(),
                offset,
                length,
            }),
        )
    }

    /// Returns the element type if it is one the IR can represent.
    pub fn dtype(&self) -> Option<DType> {
        dtype_from_onnx(self.elem_type)
    }

    /// Returns `true` if the payload is stored outside the model file.
    pub fn is_external(&self) -> bool {
        matches!(self.data, TensorData::External(_))
    }
}
