// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Model and graph descriptors.
//!
//! A [`ModelDescriptor`] is immutable once decoded. The importer borrows it
//! for the duration of a conversion and never writes back into it.

use crate::{InitializerDescriptor, ModelError, NodeDescriptor, ValueInfo};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::PathBuf;

/// Alias of the default ONNX domain.
const DEFAULT_DOMAIN_ALIAS: &str = "ai.onnx";

/// Normalises a domain name: `"ai.onnx"` and `""` both mean the default
/// domain and are represented as `""`.
pub fn normalize_domain(domain: &str) -> &str {
    if domain == DEFAULT_DOMAIN_ALIAS {
        ""
    } else {
        domain
    }
}

// ── Opset imports ──────────────────────────────────────────────────

/// Domain → opset version table declared by the model.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(from = "BTreeMap<String, i64>")]
pub struct OpsetImports(BTreeMap<String, i64>);

impl OpsetImports {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `domain` at `version`. A later declaration of the same
    /// domain replaces the earlier one.
    pub fn insert(&mut self, domain: &str, version: i64) {
        self.0.insert(normalize_domain(domain).to_string(), version);
    }

    /// Returns the declared version of `domain`.
    pub fn get(&self, domain: &str) -> Option<i64> {
        self.0.get(normalize_domain(domain)).copied()
    }

    /// Iterates `(domain, version)` pairs in domain order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.0.iter().map(|(d, v)| (d.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<BTreeMap<String, i64>> for OpsetImports {
    fn from(map: BTreeMap<String, i64>) -> Self {
        let mut imports = Self::new();
        for (domain, version) in map {
            imports.insert(&domain, version);
        }
        imports
    }
}

// ── GraphDescriptor ────────────────────────────────────────────────

/// A flat graph body: the top-level model graph or a control-flow body.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GraphDescriptor {
    #[serde(default)]
    pub name: String,
    /// Named constants, in declaration order.
    #[serde(default)]
    pub initializers: Vec<InitializerDescriptor>,
    /// Declared inputs, in declaration order.
    #[serde(default)]
    pub inputs: Vec<ValueInfo>,
    /// Nodes, in topological (declaration) order.
    #[serde(default)]
    pub nodes: Vec<NodeDescriptor>,
    /// Declared outputs, in declaration order.
    #[serde(default)]
    pub outputs: Vec<ValueInfo>,
}

impl GraphDescriptor {
    /// Creates an empty graph.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_initializer(mut self, initializer: InitializerDescriptor) -> Self {
        self.initializers.push(initializer);
        self
    }

    pub fn with_input(mut self, input: ValueInfo) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn with_node(mut self, node: NodeDescriptor) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_output(mut self, output: ValueInfo) -> Self {
        self.outputs.push(output);
        self
    }

    /// Returns `true` if `name` is one of the declared outputs.
    pub fn is_declared_output(&self, name: &str) -> bool {
        self.outputs.iter().any(|o| o.name == name)
    }

    /// Total number of nodes, including nodes of nested bodies.
    pub fn total_nodes(&self) -> usize {
        self.nodes
            .iter()
            .map(|n| 1 + n.subgraphs().iter().map(|(_, g)| g.total_nodes()).sum::<usize>())
            .sum()
    }

    fn count_ops(&self, histogram: &mut BTreeMap<String, usize>) {
        for node in &self.nodes {
            *histogram.entry(node.domain_and_op()).or_insert(0) += 1;
            for (_, body) in node.subgraphs() {
                body.count_ops(histogram);
            }
        }
    }

    fn validate(&self, scope: &str) -> Result<(), ModelError> {
        let mut inputs = HashSet::new();
        for input in &self.inputs {
            if input.name.is_empty() {
                return Err(ModelError::InvalidGraph(format!(
                    "graph '{scope}' declares an input with an empty name"
                )));
            }
            if !inputs.insert(input.name.as_str()) {
                return Err(ModelError::InvalidGraph(format!(
                    "graph '{scope}' declares input '{}' more than once",
                    input.name
                )));
            }
        }

        for output in &self.outputs {
            if output.name.is_empty() {
                return Err(ModelError::InvalidGraph(format!(
                    "graph '{scope}' declares an output with an empty name"
                )));
            }
        }

        for node in &self.nodes {
            if node.op_type.is_empty() {
                return Err(ModelError::InvalidNode {
                    node: node.identity(),
                    detail: "op_type is empty".into(),
                });
            }
            if node.name.is_empty() {
                tracing::debug!("graph '{scope}': unnamed {} node", node.domain_and_op());
            }
            for (attr, body) in node.subgraphs() {
                body.validate(&format!("{scope}/{}/{attr}", node.identity()))?;
            }
        }

        Ok(())
    }
}

// ── ModelDescriptor ────────────────────────────────────────────────

/// A decoded model: opset imports plus the top-level graph.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModelDescriptor {
    #[serde(default)]
    pub ir_version: i64,
    #[serde(default)]
    pub producer_name: String,
    /// Domain → version table; empty means "default domain, latest".
    #[serde(default)]
    pub opset_imports: OpsetImports,
    pub graph: GraphDescriptor,
    /// Directory external data locations are resolved against.
    /// Set by [`ModelLoader`](crate::ModelLoader) to the model file's directory.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl ModelDescriptor {
    /// Wraps a graph with no opset imports.
    pub fn new(graph: GraphDescriptor) -> Self {
        Self {
            ir_version: 8,
            producer_name: String::new(),
            opset_imports: OpsetImports::new(),
            graph,
            base_dir: None,
        }
    }

    /// Adds an opset import.
    pub fn with_opset(mut self, domain: &str, version: i64) -> Self {
        self.opset_imports.insert(domain, version);
        self
    }

    /// Sets the external-data base directory.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Checks structural well-formedness.
    ///
    /// # Checks
    /// - Every node has a non-empty `op_type`.
    /// - Declared inputs have unique, non-empty names within each graph.
    /// - Declared outputs have non-empty names.
    ///
    /// Nested bodies are checked recursively. Whether two nodes produce the
    /// same tensor name is left to the importer, which knows the scope rules.
    pub fn validate(&self) -> Result<(), ModelError> {
        let scope = if self.graph.name.is_empty() {
            "main"
        } else {
            self.graph.name.as_str()
        };
        self.graph.validate(scope)
    }

    /// Operator usage counts keyed by `domain.op_type`, nested bodies included.
    pub fn op_histogram(&self) -> BTreeMap<String, usize> {
        let mut histogram = BTreeMap::new();
        self.graph.count_ops(&mut histogram);
        histogram
    }

    /// Returns a summary string describing the model.
    pub fn summary(&self) -> String {
        let opsets: Vec<String> = self
            .opset_imports
            .iter()
            .map(|(d, v)| {
                let d = if d.is_empty() { "ai.onnx" } else { d };
                format!("{d}:{v}")
            })
            .collect();
        format!(
            "Model '{}': {} nodes ({} total), {} initializers, {} inputs, {} outputs, opsets [{}]",
            self.graph.name,
            self.graph.nodes.len(),
            self.graph.total_nodes(),
            self.graph.initializers.len(),
            self.graph.inputs.len(),
            self.graph.outputs.len(),
            opsets.join(", "),
        )
    }
}

impl fmt::Display for ModelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}
