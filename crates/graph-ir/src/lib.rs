// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # graph-ir
//!
//! The directed-graph intermediate representation produced by the ONNX
//! importer and consumed by later compilation stages.
//!
//! # Design Goals
//! - **Arena storage**: every node of a conversion (nested control-flow
//!   bodies included) lives in one [`IrGraph`] and is addressed by a
//!   [`NodeId`]. Edges are plain [`Output`] values, so a consumer references
//!   its producer without shared ownership.
//! - **Explicit scopes**: a [`Function`] lists its own parameters and
//!   results. Values a nested body takes from its enclosing scope are
//!   recorded as [`ParentBinding`]s rather than as cross-scope edges.
//! - **Inspectable**: [`serialize::to_json`] writes a function and every
//!   node it reaches as a JSON document.

mod arena;
mod function;
mod node;
pub mod serialize;

pub use arena::IrGraph;
pub use function::{Function, FunctionResult, ParentBinding};
pub use node::{Attribute, Node, NodeId, NodeKind, Output, OutputInfo};
