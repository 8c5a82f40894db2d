// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Nested bodies: scope-chain lookup and input lifting.
//!
//! A body is converted as a child [`Graph`] holding a shared reference to
//! its parent. Name lookups fall through the chain; writes only ever go to
//! the child's own cache.
//!
//! While converting, a body may wire its nodes straight to values from an
//! enclosing scope, either by naming them as inputs or through the bodies
//! of its own control-flow nodes. Once the body is converted, each such
//! value is *lifted*: a local parameter replaces it, every use inside the
//! body is rewired to the parameter, and a [`ParentBinding`] records where
//! the value came from. The owning node then consumes the original values
//! as extra inputs, so no edge crosses a scope boundary.

use super::{ConversionContext, Graph};
use crate::{ConvertedSubgraph, GraphCache, ImportError};
use graph_ir::{IrGraph, Output, ParentBinding};
use onnx_model::GraphDescriptor;

impl<'a> Graph<'a> {
    /// Creates a child scope for `descriptor`.
    pub(super) fn child<'b>(&'b self, descriptor: &'b GraphDescriptor, ir: &IrGraph) -> Graph<'b> {
        Graph {
            descriptor,
            session: self.session,
            parent: Some(self),
            cache: GraphCache::new(),
            parameters: Vec::new(),
            opset: self.opset.clone(),
            first_node: ir.next_id(),
            parent_refs: Vec::new(),
            lifted: Vec::new(),
        }
    }

    /// Converts a nested body.
    ///
    /// Bodies are not pruned: their parameters are positional and carry
    /// control-flow meaning (iteration counters, loop-carried values).
    pub(super) fn convert_subgraph(
        mut self,
        attribute: String,
        ctx: &mut ConversionContext,
    ) -> Result<ConvertedSubgraph, ImportError> {
        self.initialize(ctx)?;
        self.check_availability(ctx)?;
        self.convert_nodes(ctx)?;
        self.lift_inputs(ctx);

        let function = self.finish(ctx)?;
        let inputs_from_parent = function.bindings.iter().map(|b| b.source).collect();
        Ok(ConvertedSubgraph {
            attribute,
            function,
            inputs_from_parent,
        })
    }

    /// `true` if `name` resolves in this scope or any enclosing one.
    pub(crate) fn contains(&self, name: &str) -> bool {
        self.cache.contains(name) || self.parent.map_or(false, |p| p.contains(name))
    }

    /// Resolves `name` through the scope chain.
    ///
    /// # Panics
    /// Panics if `name` resolves nowhere; check [`contains`](Self::contains)
    /// first.
    pub(crate) fn get(&self, name: &str) -> Output {
        match self.parent {
            Some(parent) if !self.cache.contains(name) => parent.get(name),
            _ => self.cache.get(name),
        }
    }

    /// Replaces enclosing-scope values used by this body with parameters.
    ///
    /// Constants are referenced in place. A value read under several names
    /// gets one parameter; every name is cached against it and recorded in
    /// the parameter's names.
    fn lift_inputs(&mut self, ctx: &mut ConversionContext) {
        let Some(parent) = self.parent else {
            return;
        };

        // A body output may be an enclosing value passed straight through.
        for declared in &self.descriptor.outputs {
            let name = &declared.name;
            if !name.is_empty() && !self.cache.contains(name) && parent.contains(name) {
                self.parent_refs.push((name.clone(), parent.get(name)));
            }
        }

        for (name, source) in std::mem::take(&mut self.parent_refs) {
            if source.node >= self.first_node || ctx.ir.is_constant(source) {
                continue;
            }
            if let Some(existing) = self.lifted.iter().find(|b| b.source == source) {
                let param = Output::new(existing.parameter, 0);
                ctx.ir.add_names(param, [name.clone()]);
                self.cache.emplace(name, param);
                continue;
            }

            let mut info = ctx.ir.info(source).clone();
            info.names.clear();
            let param = ctx.ir.add_parameter(info);
            ctx.ir.set_friendly_name(param.node, name.clone());
            ctx.ir.add_names(param, [name.clone()]);

            let rewired = ctx.ir.replace_uses_from(self.first_node, source, param);
            let aliases = self.cache.rebind(source, param);
            tracing::debug!(
                "lifted '{name}' into body '{}' ({rewired} use(s), {} cached alias(es))",
                self.descriptor.name,
                aliases.len(),
            );
            ctx.ir.add_names(param, aliases);

            self.cache.emplace(name.clone(), param);
            self.parameters.push(param.node);
            self.lifted.push(ParentBinding {
                parameter: param.node,
                parent_name: name,
                source,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{ConvertedModel, Frontend, ImportConfig};
    use graph_ir::{NodeKind, Output};
    use onnx_model::{AttributeValue, GraphDescriptor, ModelDescriptor, NodeDescriptor, TensorDescriptor, ValueInfo};
    use tensor_core::DType;

    fn convert(graph: GraphDescriptor) -> ConvertedModel {
        Frontend::new(ImportConfig::default())
            .load_model(ModelDescriptor::new(graph))
            .convert()
            .unwrap()
    }

    fn if_node(then_branch: GraphDescriptor, else_branch: GraphDescriptor) -> NodeDescriptor {
        NodeDescriptor::new("If", ["cond"], ["out"])
            .with_name("branch")
            .with_attribute("then_branch", AttributeValue::Graph(then_branch))
            .with_attribute("else_branch", AttributeValue::Graph(else_branch))
    }

    fn parent(then_branch: GraphDescriptor, else_branch: GraphDescriptor) -> GraphDescriptor {
        GraphDescriptor::new("main")
            .with_input(ValueInfo::tensor("cond", DType::Bool, &[]))
            .with_input(ValueInfo::tensor("a", DType::F32, &[3]))
            .with_node(NodeDescriptor::new("Relu", ["a"], ["x"]))
            .with_node(if_node(then_branch, else_branch))
            .with_output(ValueInfo::untyped("out"))
    }

    fn negate_x(name: &str) -> GraphDescriptor {
        GraphDescriptor::new(name)
            .with_node(NodeDescriptor::new("Neg", ["x"], ["y"]))
            .with_output(ValueInfo::untyped("y"))
    }

    #[test]
    fn test_explicit_reference_is_lifted() {
        let m = convert(parent(negate_x("then"), negate_x("else")));
        let if_out = m.function.results[0].source;
        let if_ir = m.ir.node(if_out.node);
        let then_body = &if_ir.kind.bodies()[0];

        assert_eq!(then_body.parameters.len(), 1);
        assert_eq!(then_body.bindings.len(), 1);
        let binding = &then_body.bindings[0];
        assert_eq!(binding.parent_name, "x");
        assert_eq!(m.ir.friendly_name(binding.parameter), "x");

        let neg = m.ir.node(then_body.results[0].source.node);
        assert_eq!(neg.inputs, vec![Output::new(binding.parameter, 0)]);

        // The If consumes the enclosing value once, after its condition.
        let relu = m.ir.node(binding.source.node);
        assert_eq!(relu.kind.op(), Some(("", "Relu")));
        assert_eq!(if_ir.inputs.len(), 2);
        assert_eq!(if_ir.inputs[1], binding.source);
    }

    #[test]
    fn test_lifted_parameter_copies_metadata() {
        let m = convert(parent(negate_x("then"), negate_x("else")));
        let if_ir = m.ir.node(m.function.results[0].source.node);
        let binding = &if_ir.kind.bodies()[0].bindings[0];
        let param = m.ir.info(Output::new(binding.parameter, 0));
        let source = m.ir.info(binding.source);
        assert_eq!(param.elem_type, source.elem_type);
        assert_eq!(param.shape, source.shape);
    }

    #[test]
    fn test_passthrough_output_is_lifted() {
        let passthrough = GraphDescriptor::new("else").with_output(ValueInfo::untyped("x"));
        let m = convert(parent(negate_x("then"), passthrough));
        let if_ir = m.ir.node(m.function.results[0].source.node);
        let else_body = &if_ir.kind.bodies()[1];
        assert_eq!(else_body.bindings.len(), 1);
        assert_eq!(
            else_body.results[0].source,
            Output::new(else_body.bindings[0].parameter, 0)
        );
    }

    #[test]
    fn test_identity_alias_names_the_lifted_parameter() {
        let forward = GraphDescriptor::new("then")
            .with_node(NodeDescriptor::new("Identity", ["x"], ["y"]))
            .with_output(ValueInfo::untyped("y"));
        let m = convert(parent(forward, negate_x("else")));
        let if_ir = m.ir.node(m.function.results[0].source.node);
        let then_body = &if_ir.kind.bodies()[0];

        assert_eq!(then_body.bindings.len(), 1);
        let param = Output::new(then_body.bindings[0].parameter, 0);
        assert_eq!(then_body.results[0].source, param);
        let names = &m.ir.info(param).names;
        assert!(names.contains("x"), "{names:?}");
        assert!(names.contains("y"), "{names:?}");
    }

    #[test]
    fn test_constants_are_not_lifted() {
        let body = GraphDescriptor::new("then")
            .with_node(NodeDescriptor::new("Add", ["x", "w"], ["y"]))
            .with_output(ValueInfo::untyped("y"));
        let g = parent(body, negate_x("else"))
            .with_initializer(TensorDescriptor::from_f32("w", &[3], &[1.0, 2.0, 3.0]));
        let m = convert(g);
        let if_ir = m.ir.node(m.function.results[0].source.node);
        let then_body = &if_ir.kind.bodies()[0];
        assert_eq!(then_body.bindings.len(), 1);
        assert_eq!(then_body.bindings[0].parent_name, "x");
        let add = m.ir.node(then_body.results[0].source.node);
        assert!(m.ir.is_constant(add.inputs[1]));
    }

    #[test]
    fn test_same_value_under_two_names_is_lifted_once() {
        let body = GraphDescriptor::new("then")
            .with_node(NodeDescriptor::new("Add", ["x", "x_alias"], ["y"]))
            .with_output(ValueInfo::untyped("y"));
        let mut g = parent(body, negate_x("else"));
        g.nodes.insert(1, NodeDescriptor::new("Identity", ["x"], ["x_alias"]));
        let m = convert(g);
        let if_ir = m.ir.node(m.function.results[0].source.node);
        let then_body = &if_ir.kind.bodies()[0];
        assert_eq!(then_body.parameters.len(), 1);
        let param = Output::new(then_body.parameters[0], 0);
        let add = m.ir.node(then_body.results[0].source.node);
        assert_eq!(add.inputs, vec![param, param]);
    }

    #[test]
    fn test_nested_bodies_lift_through_each_level() {
        let inner = negate_x("inner_then");
        let middle = GraphDescriptor::new("then")
            .with_input(ValueInfo::tensor("c2", DType::Bool, &[]))
            .with_node(
                NodeDescriptor::new("If", ["c2"], ["z"])
                    .with_attribute("then_branch", AttributeValue::Graph(inner))
                    .with_attribute("else_branch", AttributeValue::Graph(negate_x("inner_else"))),
            )
            .with_output(ValueInfo::untyped("z"));
        let m = convert(parent(middle, negate_x("else")));

        let outer_if = m.ir.node(m.function.results[0].source.node);
        let middle_body = &outer_if.kind.bodies()[0];
        assert_eq!(middle_body.bindings.len(), 1);
        let middle_param = Output::new(middle_body.bindings[0].parameter, 0);

        let inner_if = m.ir.node(middle_body.results[0].source.node);
        assert!(matches!(inner_if.kind, NodeKind::Op { .. }));
        // The inner If reads the middle body's parameter, never the outer value.
        assert!(inner_if.inputs.contains(&middle_param));
        let inner_binding = &inner_if.kind.bodies()[0].bindings[0];
        assert_eq!(inner_binding.source, middle_param);
    }
}
