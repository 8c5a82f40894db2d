// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! Element types, shapes and constant tensors shared by the ONNX model
//! description, the graph IR and the importer.
//!
//! This crate provides:
//! - [`DType`]: the element types an ONNX tensor can carry.
//! - [`Shape`]: a fully known, static shape.
//! - [`PartialShape`] / [`Dim`]: shapes with unknown rank or unknown
//!   dimensions, as found on graph inputs and inferred operator outputs.
//! - [`Tensor`]: an owned, typed, shaped constant payload (initializers,
//!   `Constant` attributes).
//!
//! # Design Goals
//! - Payloads are stored little-endian, exactly as ONNX `raw_data` is laid out.
//! - Typed reads decode from bytes; no pointer reinterpretation.
//! - Clean error types via `thiserror`.

mod dtype;
mod error;
mod shape;
mod tensor;

pub use dtype::DType;
pub use error::TensorError;
pub use shape::{Dim, PartialShape, Shape};
pub use tensor::Tensor;
