// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # onnx-import
//!
//! Converts a decoded ONNX model into the directed-graph IR of
//! [`graph_ir`].
//!
//! # Design Goals
//! - **Scope-aware resolution**: every graph body has its own tensor-name
//!   cache. Control-flow bodies see their enclosing scopes read-only and
//!   turn every value they take from them into a local parameter.
//! - **Batched diagnostics**: all operators without a conversion are
//!   reported in one error, after domains the registry knows have been
//!   enabled on demand.
//! - **Degrade where possible**: a malformed initializer becomes a zero
//!   scalar with a warning; unresolvable external data stops the import.
//! - **No ambient state**: the registry is immutable and shareable, and each
//!   conversion owns its arena, caches, opset scope and statistics.
//!
//! # Example
//! ```no_run
//! use onnx_import::{Frontend, ImportConfig};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), onnx_import::ImportError> {
//! let frontend = Frontend::new(ImportConfig::default()).load(Path::new("model.onnx"))?;
//! let converted = frontend.convert()?;
//! for name in converted.result_names() {
//!     println!("{name}");
//! }
//! # Ok(())
//! # }
//! ```

mod cache;
mod config;
mod context;
mod error;
mod frontend;
mod graph;
pub mod initializer;
mod ops;
mod registry;
mod telemetry;

pub use cache::GraphCache;
pub use config::{ConversionMode, ImportConfig};
pub use context::{ConvertedSubgraph, NodeContext};
pub use error::{ErrorKind, ImportError, OpError, ValidationError};
pub use frontend::{ConvertedModel, DecodedModel, Frontend, FrontendState, Idle, Imported, Loaded};
pub use registry::{ConvertFn, OperatorRegistry, OpsetScope, RegistryBuilder};
pub use telemetry::{OpStatistics, TelemetrySink, TracingTelemetry, OP_COUNT_CATEGORY};
