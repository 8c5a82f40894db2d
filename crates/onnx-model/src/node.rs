// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Node, attribute and value-info descriptions.

use crate::{GraphDescriptor, TensorDescriptor};
use std::collections::BTreeMap;
use tensor_core::{DType, PartialShape};

/// A node attribute value.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeValue {
    Float(f32),
    Int(i64),
    String(String),
    Tensor(TensorDescriptor),
    /// A nested graph body (e.g. `If.then_branch`, `Loop.body`).
    Graph(GraphDescriptor),
    Floats(Vec<f32>),
    Ints(Vec<i64>),
    Strings(Vec<String>),
    Tensors(Vec<TensorDescriptor>),
    Graphs(Vec<GraphDescriptor>),
}

/// One operation instance in a graph.
///
/// A node's identity for caching purposes is its position in the graph's
/// node list; `name` may be empty and is only used for diagnostics and
/// friendly naming.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NodeDescriptor {
    /// Optional node name (may be empty).
    #[serde(default)]
    pub name: String,
    /// Operator type, e.g. `"Add"`.
    pub op_type: String,
    /// Operator domain; empty means the default ONNX domain.
    #[serde(default)]
    pub domain: String,
    /// Input tensor names; an empty string marks an omitted optional input.
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Output tensor names; an empty string marks an omitted optional output.
    #[serde(default)]
    pub outputs: Vec<String>,
    /// Attributes, ordered by name.
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl NodeDescriptor {
    /// Creates an unnamed node in the default domain.
    pub fn new<I, O>(op_type: impl Into<String>, inputs: I, outputs: O) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        Self {
            name: String::new(),
            op_type: op_type.into(),
            domain: String::new(),
            inputs: inputs.into_iter().map(Into::into).collect(),
            outputs: outputs.into_iter().map(Into::into).collect(),
            attributes: BTreeMap::new(),
        }
    }

    /// Sets the node name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the operator domain.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    /// Adds (or replaces) an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    /// Returns an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Returns an integer attribute.
    pub fn attr_int(&self, name: &str) -> Option<i64> {
        match self.attribute(name)? {
            AttributeValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns a float attribute.
    pub fn attr_float(&self, name: &str) -> Option<f32> {
        match self.attribute(name)? {
            AttributeValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns an integer-list attribute.
    pub fn attr_ints(&self, name: &str) -> Option<&[i64]> {
        match self.attribute(name)? {
            AttributeValue::Ints(v) => Some(v),
            _ => None,
        }
    }

    /// Returns a tensor attribute.
    pub fn attr_tensor(&self, name: &str) -> Option<&TensorDescriptor> {
        match self.attribute(name)? {
            AttributeValue::Tensor(t) => Some(t),
            _ => None,
        }
    }

    /// Returns `true` if any attribute holds a nested graph body.
    pub fn has_subgraphs(&self) -> bool {
        self.attributes
            .values()
            .any(|v| matches!(v, AttributeValue::Graph(_) | AttributeValue::Graphs(_)))
    }

    /// Returns every nested graph body, keyed by attribute name.
    ///
    /// Bodies from a `graphs` list attribute are keyed `name[i]`. Ordering
    /// follows attribute names, so it is deterministic.
    pub fn subgraphs(&self) -> Vec<(String, &GraphDescriptor)> {
        let mut out = Vec::new();
        for (name, value) in &self.attributes {
            match value {
                AttributeValue::Graph(g) => out.push((name.clone(), g)),
                AttributeValue::Graphs(gs) => {
                    for (i, g) in gs.iter().enumerate() {
                        out.push((format!("{name}[{i}]"), g));
                    }
                }
                _ => {}
            }
        }
        out
    }

    /// `"domain.op_type"`, or just `"op_type"` in the default domain.
    pub fn domain_and_op(&self) -> String {
        let domain = crate::normalize_domain(&self.domain);
        if domain.is_empty() {
            self.op_type.clone()
        } else {
            format!("{domain}.{}", self.op_type)
        }
    }

    /// A human-readable identity for diagnostics: the node name, or
    /// [`domain_and_op`](Self::domain_and_op) for unnamed nodes.
    pub fn identity(&self) -> String {
        if self.name.is_empty() {
            self.domain_and_op()
        } else {
            self.name.clone()
        }
    }
}

/// A declared graph input or output.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ValueInfo {
    /// Tensor name.
    pub name: String,
    /// Element type; `None` if the model leaves it unspecified.
    #[serde(default)]
    pub elem_type: Option<DType>,
    /// Declared shape; dynamic rank if unspecified.
    #[serde(default)]
    pub shape: PartialShape,
}

impl ValueInfo {
    /// Creates a value info with the given type and shape.
    pub fn new(name: impl Into<String>, elem_type: Option<DType>, shape: PartialShape) -> Self {
        Self {
            name: name.into(),
            elem_type,
            shape,
        }
    }

    /// Fully specified tensor value.
    pub fn tensor(name: impl Into<String>, dtype: DType, dims: &[usize]) -> Self {
        Self::new(name, Some(dtype), PartialShape::fixed(dims))
    }

    /// Value with neither type nor shape (common for graph outputs).
    pub fn untyped(name: impl Into<String>) -> Self {
        Self::new(name, None, PartialShape::dynamic())
    }
}
