// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! What an operator conversion sees of the node it converts.

use crate::{OpError, ValidationError};
use graph_ir::{Function, IrGraph, Output, OutputInfo};
use onnx_model::NodeDescriptor;
use std::path::Path;

/// A nested body converted ahead of its owning node.
#[derive(Debug, Clone)]
pub struct ConvertedSubgraph {
    /// Attribute the body came from, e.g. `then_branch`.
    pub attribute: String,
    pub function: Function,
    /// Enclosing-scope values the body's lifted parameters stand in for,
    /// in parameter order. The owning node must consume them as inputs.
    pub inputs_from_parent: Vec<Output>,
}

/// Input to a [`ConvertFn`](crate::ConvertFn).
pub struct NodeContext<'n> {
    pub node: &'n NodeDescriptor,
    /// Resolved inputs, positionally matching `node.inputs`. Omitted
    /// optional inputs are null outputs.
    pub inputs: Vec<Output>,
    /// Bodies in attribute-name order.
    pub subgraphs: &'n [ConvertedSubgraph],
    /// Version of the node's domain in the current scope.
    pub opset_version: i64,
    /// Directory external tensor data is resolved against.
    pub base_dir: &'n Path,
    pub ir: &'n mut IrGraph,
}

impl<'n> NodeContext<'n> {
    /// Node identity for diagnostics.
    pub fn identity(&self) -> String {
        self.node.identity()
    }

    /// A validation failure for this node.
    pub fn invalid(&self, message: impl Into<String>) -> OpError {
        OpError::Validation(ValidationError {
            node: self.identity(),
            message: message.into(),
        })
    }

    /// Input `index`, which must be present and not omitted.
    pub fn input(&self, index: usize) -> Result<Output, OpError> {
        match self.inputs.get(index) {
            Some(&output) if !self.ir.is_null(output) => Ok(output),
            _ => Err(self.invalid(format!(
                "{} requires input {index}, found {} input(s)",
                self.node.op_type,
                self.inputs.len()
            ))),
        }
    }

    /// Input `index` if present and not omitted.
    pub fn optional_input(&self, index: usize) -> Option<Output> {
        self.inputs
            .get(index)
            .copied()
            .filter(|o| !self.ir.is_null(*o))
    }

    /// Fails unless the node has between `min` and `max` inputs.
    pub fn expect_inputs(&self, min: usize, max: usize) -> Result<(), OpError> {
        let n = self.inputs.len();
        if n < min || n > max {
            let expected = if min == max {
                min.to_string()
            } else {
                format!("{min}..={max}")
            };
            return Err(self.invalid(format!(
                "{} expects {expected} input(s), found {n}",
                self.node.op_type
            )));
        }
        Ok(())
    }

    /// Metadata of an input value (cloned, so the arena can be mutated next).
    pub fn info(&self, output: Output) -> OutputInfo {
        let mut info = self.ir.info(output).clone();
        info.names.clear();
        info
    }

    /// Number of declared node outputs.
    pub fn num_outputs(&self) -> usize {
        self.node.outputs.len()
    }

    /// The body converted from `attribute`.
    pub fn subgraph(&self, attribute: &str) -> Result<&'n ConvertedSubgraph, OpError> {
        let subgraphs: &'n [ConvertedSubgraph] = self.subgraphs;
        subgraphs
            .iter()
            .find(|s| s.attribute == attribute)
            .ok_or_else(|| self.invalid(format!("missing graph attribute '{attribute}'")))
    }
}
