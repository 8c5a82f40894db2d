// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Finished IR functions.

use crate::{NodeId, Output};

/// One function output: the port it reads and its friendly name.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionResult {
    pub source: Output,
    /// `<tensor name>/sink_port_<output index>`.
    pub name: String,
}

/// A parameter of a nested body that stands in for an enclosing-scope value.
#[derive(Debug, Clone, PartialEq)]
pub struct ParentBinding {
    /// The local parameter node.
    pub parameter: NodeId,
    /// Tensor name the value has in the enclosing scope.
    pub parent_name: String,
    /// The enclosing-scope value the parameter currently mirrors.
    pub source: Output,
}

/// A converted graph: ordered parameters and ordered results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Function {
    pub name: String,
    pub parameters: Vec<NodeId>,
    pub results: Vec<FunctionResult>,
    /// Empty for the top-level function.
    pub bindings: Vec<ParentBinding>,
}

impl Function {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Output handles of the parameters, in order.
    pub fn parameter_outputs(&self) -> impl Iterator<Item = Output> + '_ {
        self.parameters.iter().map(|&p| Output::new(p, 0))
    }

    /// Returns the binding for a lifted parameter, if it is one.
    pub fn binding_for(&self, parameter: NodeId) -> Option<&ParentBinding> {
        self.bindings.iter().find(|b| b.parameter == parameter)
    }

    /// Returns the result with the given friendly name.
    pub fn result(&self, name: &str) -> Option<&FunctionResult> {
        self.results.iter().find(|r| r.name == name)
    }
}
