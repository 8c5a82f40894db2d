// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Graph conversion.
//!
//! A [`Graph`] walks one decoded graph body and appends its IR to the
//! conversion's arena. Every graph goes through the same phases:
//!
//! 1. **Initializing**: initializers become constants in the cache.
//! 2. **Input binding**: declared inputs not shadowed by an initializer
//!    become parameters.
//! 3. **Availability scan**: operator statistics are recorded, unknown
//!    domains are enabled where the registry can, and anything still
//!    unresolvable is reported in one batch.
//! 4. **Node conversion**: nested bodies first, then the node itself, then
//!    naming and caching of its outputs.
//! 5. **Finalizing**: dangling parameters are pruned (top-level graph) or
//!    enclosing-scope references are lifted into parameters (nested body).
//!
//! Nested bodies borrow their parent graph read-only; see [`subgraph`].

mod naming;
mod subgraph;

use crate::{
    initializer, ConversionMode, ConvertedSubgraph, GraphCache, ImportConfig, ImportError,
    NodeContext, OpError, OpStatistics, OperatorRegistry, OpsetScope,
};
use graph_ir::{Function, FunctionResult, IrGraph, NodeId, NodeKind, Output, OutputInfo, ParentBinding};
use onnx_model::{normalize_domain, GraphDescriptor, NodeDescriptor};
use std::collections::BTreeSet;
use std::path::Path;

/// Mutable state shared by every graph of one conversion.
#[derive(Debug, Default)]
pub(crate) struct ConversionContext {
    pub ir: IrGraph,
    pub stats: OpStatistics,
    /// Whether operator statistics are collected at all.
    pub collect_stats: bool,
}

impl ConversionContext {
    pub fn new(collect_stats: bool) -> Self {
        Self {
            collect_stats,
            ..Self::default()
        }
    }
}

/// Read-only inputs shared by every graph of one conversion.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Session<'a> {
    pub registry: &'a OperatorRegistry,
    pub config: &'a ImportConfig,
    pub base_dir: &'a Path,
    pub mode: ConversionMode,
}

/// One graph body being converted.
pub(crate) struct Graph<'a> {
    descriptor: &'a GraphDescriptor,
    session: Session<'a>,
    /// Enclosing scope; `None` for the top-level graph.
    parent: Option<&'a Graph<'a>>,
    cache: GraphCache,
    parameters: Vec<NodeId>,
    opset: OpsetScope,
    /// First arena id created by this scope.
    first_node: NodeId,
    /// Enclosing-scope values read by this scope, in first-use order.
    parent_refs: Vec<(String, Output)>,
    lifted: Vec<ParentBinding>,
}

impl<'a> Graph<'a> {
    /// Creates the top-level graph.
    pub fn root(
        descriptor: &'a GraphDescriptor,
        session: Session<'a>,
        opset: OpsetScope,
        ir: &IrGraph,
    ) -> Self {
        Self {
            descriptor,
            session,
            parent: None,
            cache: GraphCache::new(),
            parameters: Vec::new(),
            opset,
            first_node: ir.next_id(),
            parent_refs: Vec::new(),
            lifted: Vec::new(),
        }
    }

    /// Converts the top-level graph into a function.
    pub fn convert(mut self, ctx: &mut ConversionContext) -> Result<Function, ImportError> {
        self.initialize(ctx)?;
        self.check_availability(ctx)?;
        self.convert_nodes(ctx)?;
        if self.session.mode == ConversionMode::Full {
            self.remove_dangling_parameters(ctx);
        }
        self.finish(ctx)
    }

    // ── Initializing / input binding ───────────────────────────────

    fn initialize(&mut self, ctx: &mut ConversionContext) -> Result<(), ImportError> {
        for init in &self.descriptor.initializers {
            if init.name.is_empty() {
                tracing::debug!("skipping unnamed initializer in graph '{}'", self.descriptor.name);
                continue;
            }
            let output = initializer::materialize(init, self.session.base_dir, &mut ctx.ir)?;
            self.cache.emplace(init.name.clone(), output);
        }

        for input in &self.descriptor.inputs {
            if self.cache.contains(&input.name) {
                tracing::debug!("input '{}' is provided by an initializer", input.name);
                continue;
            }
            let info = OutputInfo::new(input.elem_type, input.shape.clone());
            let param = ctx.ir.add_parameter(info);
            ctx.ir.set_friendly_name(param.node, input.name.clone());
            ctx.ir.add_names(param, [input.name.clone()]);
            self.cache.emplace(input.name.clone(), param);
            self.parameters.push(param.node);
        }

        tracing::debug!(
            "graph '{}': {} initializer(s), {} parameter(s)",
            self.descriptor.name,
            self.descriptor.initializers.len(),
            self.parameters.len(),
        );
        Ok(())
    }

    // ── Availability scan ──────────────────────────────────────────

    fn check_availability(&mut self, ctx: &mut ConversionContext) -> Result<(), ImportError> {
        let registry = self.session.registry;
        let descriptor = self.descriptor;
        let mut missing_domains = BTreeSet::new();
        for node in &descriptor.nodes {
            if ctx.collect_stats {
                ctx.stats.record(&node.op_type);
            }
            if !self.opset.is_available(registry, node) {
                missing_domains.insert(normalize_domain(&node.domain));
            }
        }
        if missing_domains.is_empty() {
            return Ok(());
        }

        for domain in missing_domains {
            self.opset.enable_domain(domain, registry);
        }

        let unsupported: BTreeSet<String> = descriptor
            .nodes
            .iter()
            .filter(|node| !self.opset.is_available(registry, node))
            .map(NodeDescriptor::domain_and_op)
            .collect();
        if unsupported.is_empty() {
            return Ok(());
        }

        let operators: Vec<String> = unsupported.into_iter().collect();
        match self.session.mode {
            ConversionMode::Full => Err(ImportError::UnsupportedOperators { operators }),
            ConversionMode::Decode => {
                tracing::warn!(
                    "graph '{}' uses operators without a conversion: {}",
                    descriptor.name,
                    operators.join(", "),
                );
                Ok(())
            }
        }
    }

    // ── Node conversion ────────────────────────────────────────────

    fn convert_nodes(&mut self, ctx: &mut ConversionContext) -> Result<(), ImportError> {
        let descriptor = self.descriptor;
        for node in &descriptor.nodes {
            let subgraphs = self.convert_subgraphs(node, ctx)?;
            for binding in subgraphs.iter().flat_map(|s| &s.function.bindings) {
                if binding.source.node < self.first_node {
                    self.parent_refs
                        .push((binding.parent_name.clone(), binding.source));
                }
            }

            let outputs = match self.session.mode {
                ConversionMode::Full => self.dispatch(node, &subgraphs, ctx)?,
                ConversionMode::Decode => self.decode_node(node, subgraphs, ctx)?,
            };
            self.set_friendly_names(node, &outputs, ctx);
            self.cache_outputs(node, &outputs)?;
        }
        Ok(())
    }

    /// Converts every nested body of `node` in its own child scope.
    fn convert_subgraphs(
        &self,
        node: &'a NodeDescriptor,
        ctx: &mut ConversionContext,
    ) -> Result<Vec<ConvertedSubgraph>, ImportError> {
        let mut converted = Vec::new();
        for (attribute, body) in node.subgraphs() {
            tracing::debug!("converting body '{attribute}' of node '{}'", node.identity());
            let child = self.child(body, &ctx.ir);
            converted.push(child.convert_subgraph(attribute, ctx)?);
        }
        Ok(converted)
    }

    /// Resolves the node's input names. Omitted optional inputs become
    /// null outputs.
    fn resolve_inputs(
        &mut self,
        node: &NodeDescriptor,
        ctx: &mut ConversionContext,
    ) -> Result<Vec<Output>, ImportError> {
        let mut inputs = Vec::with_capacity(node.inputs.len());
        for name in &node.inputs {
            if name.is_empty() {
                inputs.push(ctx.ir.add_null());
                continue;
            }
            if !self.contains(name) {
                return Err(ImportError::NodeConversion {
                    node: node.identity(),
                    message: format!("input '{name}' is not defined in this scope"),
                });
            }
            let output = self.get(name);
            if !self.cache.contains(name) {
                self.parent_refs.push((name.clone(), output));
            }
            inputs.push(output);
        }
        Ok(inputs)
    }

    /// Dispatches `node` to its operator conversion.
    fn dispatch(
        &mut self,
        node: &NodeDescriptor,
        subgraphs: &[ConvertedSubgraph],
        ctx: &mut ConversionContext,
    ) -> Result<Vec<Output>, ImportError> {
        let registry = self.session.registry;
        let convert = self.opset.resolve(registry, node).ok_or_else(|| {
            ImportError::UnsupportedOperators {
                operators: vec![node.domain_and_op()],
            }
        })?;
        let opset_version = self.opset.version(&node.domain).unwrap_or_default();
        let inputs = self.resolve_inputs(node, ctx)?;

        tracing::debug!(
            "converting node '{}' ({} v{opset_version})",
            node.identity(),
            node.domain_and_op(),
        );
        let mut node_ctx = NodeContext {
            node,
            inputs,
            subgraphs,
            opset_version,
            base_dir: self.session.base_dir,
            ir: &mut ctx.ir,
        };
        convert(&mut node_ctx).map_err(|e| map_op_error(node, e))
    }

    /// Wraps `node` in an opaque framework placeholder.
    ///
    /// Nested bodies move into the placeholder; the values they take from
    /// this scope are appended to its inputs.
    fn decode_node(
        &mut self,
        node: &NodeDescriptor,
        subgraphs: Vec<ConvertedSubgraph>,
        ctx: &mut ConversionContext,
    ) -> Result<Vec<Output>, ImportError> {
        let mut inputs = self.resolve_inputs(node, ctx)?;
        let mut bodies = Vec::with_capacity(subgraphs.len());
        for subgraph in subgraphs {
            for source in subgraph.inputs_from_parent {
                if !inputs.contains(&source) {
                    inputs.push(source);
                }
            }
            bodies.push(subgraph.function);
        }

        let kind = NodeKind::Framework {
            domain: normalize_domain(&node.domain).to_string(),
            op_type: node.op_type.clone(),
            node_name: node.name.clone(),
            bodies,
        };
        let outputs = vec![OutputInfo::unknown(); node.outputs.len()];
        let id = ctx.ir.add_node(kind, inputs, outputs);
        Ok(ctx.ir.node(id).output_handles().collect())
    }

    /// Caches each declared, non-empty output name.
    fn cache_outputs(
        &mut self,
        node: &NodeDescriptor,
        outputs: &[Output],
    ) -> Result<(), ImportError> {
        if outputs.len() > node.outputs.len() {
            tracing::warn!(
                "node '{}' produced {} output(s) for {} declared; extra outputs are not cached",
                node.identity(),
                outputs.len(),
                node.outputs.len(),
            );
        }
        if let Some(missing) = node.outputs.iter().skip(outputs.len()).find(|n| !n.is_empty()) {
            return Err(ImportError::NodeConversion {
                node: node.identity(),
                message: format!(
                    "conversion produced {} output(s), declared output '{missing}' has no value",
                    outputs.len()
                ),
            });
        }

        let reject = self.session.mode == ConversionMode::Full
            && self.session.config.reject_duplicate_outputs;
        for (name, &output) in node.outputs.iter().zip(outputs) {
            if name.is_empty() {
                continue;
            }
            if reject && self.cache.contains(name) {
                return Err(ImportError::DuplicateTensor {
                    name: name.clone(),
                    node: node.identity(),
                });
            }
            if self.cache.emplace(name.clone(), output).is_some() {
                tracing::debug!("tensor '{name}' redefined by node '{}'", node.identity());
            }
        }
        Ok(())
    }

    // ── Finalizing ─────────────────────────────────────────────────

    /// Drops parameters that nothing consumes and that are not declared
    /// outputs under any of their names.
    fn remove_dangling_parameters(&mut self, ctx: &mut ConversionContext) {
        let descriptor = self.descriptor;
        let ir = &ctx.ir;
        let cache = &mut self.cache;
        self.parameters.retain(|&id| {
            let param = Output::new(id, 0);
            if !ir.consumers(param).is_empty() {
                return true;
            }
            let names = &ir.info(param).names;
            if names.iter().any(|n| descriptor.is_declared_output(n)) {
                return true;
            }
            tracing::debug!("removing dangling parameter '{}'", ir.friendly_name(id));
            for name in names {
                cache.remove(name);
            }
            false
        });
    }

    /// Assembles the function from the surviving parameters and the
    /// declared outputs.
    fn finish(self, ctx: &ConversionContext) -> Result<Function, ImportError> {
        let mut function = Function::new(self.descriptor.name.clone());
        function.parameters = self.parameters.clone();

        for declared in &self.descriptor.outputs {
            let name = &declared.name;
            if name.is_empty() {
                continue;
            }
            if !self.contains(name) {
                return Err(ImportError::MissingTensor {
                    graph: self.descriptor.name.clone(),
                    name: name.clone(),
                });
            }
            let source = self.get(name);
            if ctx.ir.is_null(source) {
                continue;
            }
            function.results.push(FunctionResult {
                source,
                name: format!("{name}/sink_port_{}", source.index),
            });
        }

        tracing::debug!(
            "graph '{}' finished: {} parameter(s), {} result(s), {} lifted",
            function.name,
            function.parameters.len(),
            function.results.len(),
            self.lifted.len(),
        );
        function.bindings = self.lifted;
        Ok(function)
    }
}

/// Maps an operator failure onto an import error.
///
/// Validation failures already name the node and pass through; other
/// failures get the node identity; unrecognised ones are logged and passed
/// through untouched.
fn map_op_error(node: &NodeDescriptor, error: OpError) -> ImportError {
    match error {
        OpError::Validation(v) => ImportError::Validation(v),
        OpError::Internal(message) => ImportError::NodeConversion {
            node: node.identity(),
            message,
        },
        OpError::Unknown(e) => {
            tracing::error!("unexpected failure while converting node '{}': {e}", node.identity());
            ImportError::Unhandled(e)
        }
    }
}
