// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! IR nodes and their outputs.

use crate::Function;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tensor_core::{DType, PartialShape, Tensor};

/// Index of a node in its [`IrGraph`](crate::IrGraph).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Position of the node in the arena.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// One output port of a node: `(producing node, output index)`.
///
/// Consumers hold copies of this handle; the port's metadata lives once,
/// in the producing node's [`OutputInfo`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct Output {
    pub node: NodeId,
    pub index: usize,
}

impl Output {
    pub fn new(node: NodeId, index: usize) -> Self {
        Self { node, index }
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.node, self.index)
    }
}

/// Type, shape and binding names of one output port.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputInfo {
    /// `None` when the element type is not known at import time.
    pub elem_type: Option<DType>,
    pub shape: PartialShape,
    /// Tensor names bound to this port, used for name-based lookup of
    /// function outputs.
    pub names: BTreeSet<String>,
}

impl OutputInfo {
    pub fn new(elem_type: Option<DType>, shape: PartialShape) -> Self {
        Self {
            elem_type,
            shape,
            names: BTreeSet::new(),
        }
    }

    /// Output with unknown type and dynamic rank.
    pub fn unknown() -> Self {
        Self::default()
    }
}

/// A scalar or list attribute attached to an operation node.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Int(i64),
    Ints(Vec<i64>),
    Float(f32),
    Floats(Vec<f32>),
    String(String),
    Type(DType),
}

/// What a node is.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// An input placeholder bound at execution time.
    Parameter,
    /// A constant value.
    Constant(Tensor),
    /// Stands in for an omitted optional value.
    Null,
    /// A converted operation. Control-flow operations own their bodies.
    Op {
        domain: String,
        op_type: String,
        attributes: BTreeMap<String, Attribute>,
        bodies: Vec<Function>,
    },
    /// An opaque placeholder for a node that was decoded but not converted.
    Framework {
        domain: String,
        op_type: String,
        /// Name of the originating model node (may be empty).
        node_name: String,
        bodies: Vec<Function>,
    },
}

impl NodeKind {
    /// Short tag used in logs and serialized output.
    pub fn tag(&self) -> &'static str {
        match self {
            NodeKind::Parameter => "parameter",
            NodeKind::Constant(_) => "constant",
            NodeKind::Null => "null",
            NodeKind::Op { .. } => "op",
            NodeKind::Framework { .. } => "framework",
        }
    }

    /// Nested body functions (empty for non-control-flow nodes).
    pub fn bodies(&self) -> &[Function] {
        match self {
            NodeKind::Op { bodies, .. } | NodeKind::Framework { bodies, .. } => bodies,
            _ => &[],
        }
    }

    pub(crate) fn bodies_mut(&mut self) -> Option<&mut Vec<Function>> {
        match self {
            NodeKind::Op { bodies, .. } | NodeKind::Framework { bodies, .. } => Some(bodies),
            _ => None,
        }
    }

    /// `(domain, op_type)` for operation and placeholder nodes.
    pub fn op(&self) -> Option<(&str, &str)> {
        match self {
            NodeKind::Op {
                domain, op_type, ..
            }
            | NodeKind::Framework {
                domain, op_type, ..
            } => Some((domain, op_type)),
            _ => None,
        }
    }
}

/// A node in the arena.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub inputs: Vec<Output>,
    pub outputs: Vec<OutputInfo>,
    /// Human-readable identifier, independent of the node's position.
    pub friendly_name: String,
}

impl Node {
    pub fn is_constant(&self) -> bool {
        matches!(self.kind, NodeKind::Constant(_))
    }

    pub fn is_parameter(&self) -> bool {
        matches!(self.kind, NodeKind::Parameter)
    }

    /// `true` for nodes that own nested bodies or are unconverted
    /// placeholders: both may consume enclosing-scope values that are not
    /// among the model node's explicit inputs.
    pub fn may_capture_scope(&self) -> bool {
        match &self.kind {
            NodeKind::Framework { .. } => true,
            NodeKind::Op { bodies, .. } => !bodies.is_empty(),
            _ => false,
        }
    }

    /// Handles to every output port of this node.
    pub fn output_handles(&self) -> impl Iterator<Item = Output> + '_ {
        (0..self.outputs.len()).map(move |i| Output::new(self.id, i))
    }
}
