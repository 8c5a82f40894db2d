// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # onnx-model
//!
//! The decoded form of an ONNX model, as consumed by the graph importer.
//!
//! Byte-level protobuf decoding happens once, in [`ModelLoader`]; everything
//! downstream works on plain Rust structures:
//!
//! - [`ModelDescriptor`]: opset imports plus the top-level graph.
//! - [`GraphDescriptor`]: ordered initializers, inputs, nodes and outputs.
//! - [`NodeDescriptor`]: one operation: domain, type, inputs, outputs,
//!   attributes (including nested graph bodies for control flow).
//! - [`TensorDescriptor`]: a named constant blob (initializer or attribute),
//!   inline or pointing at external data.
//! - [`ValueInfo`]: a declared graph input/output with type and shape.
//!
//! # Supported Model Formats
//! - `*.onnx`: standard ONNX protobuf.
//! - `*.json`: the descriptor types serialised with serde (handy for
//!   hand-written fixtures).
//!
//! # Example
//! ```no_run
//! use onnx_model::ModelLoader;
//! use std::path::Path;
//!
//! let model = ModelLoader::load(Path::new("./models/mnist.onnx")).unwrap();
//! println!("{}", model.summary());
//! ```

pub mod dtype;
mod error;
mod graph;
mod loader;
mod manifest;
mod node;
pub mod proto;
mod tensor;

pub use error::ModelError;
pub use graph::{normalize_domain, GraphDescriptor, ModelDescriptor, OpsetImports};
pub use loader::ModelLoader;
pub use node::{AttributeValue, NodeDescriptor, ValueInfo};
pub use tensor::{ExternalDataRef, InitializerDescriptor, TensorData, TensorDescriptor};
