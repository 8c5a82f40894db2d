// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Node arena.
//!
//! Nodes are only ever appended, so a [`NodeId`] stays valid for the life of
//! the graph and ids grow in creation order. The importer relies on the
//! latter: every node created while converting one scope has an id at or
//! above the arena length observed when that scope started.

use crate::{Attribute, Function, Node, NodeId, NodeKind, Output, OutputInfo};
use std::collections::BTreeMap;
use tensor_core::{PartialShape, Tensor};

/// Owns every node produced by one conversion.
#[derive(Debug, Clone, Default)]
pub struct IrGraph {
    nodes: Vec<Node>,
}

impl IrGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Id the next added node will receive.
    pub fn next_id(&self) -> NodeId {
        NodeId(self.nodes.len())
    }

    // ── Construction ───────────────────────────────────────────────

    /// Appends a node and returns its id.
    ///
    /// The friendly name defaults to `<tag>_<id>` until the importer
    /// assigns one.
    pub fn add_node(
        &mut self,
        kind: NodeKind,
        inputs: Vec<Output>,
        outputs: Vec<OutputInfo>,
    ) -> NodeId {
        let id = self.next_id();
        let friendly_name = format!("{}_{}", kind.tag(), id.0);
        self.nodes.push(Node {
            id,
            kind,
            inputs,
            outputs,
            friendly_name,
        });
        id
    }

    /// Adds an input placeholder.
    pub fn add_parameter(&mut self, info: OutputInfo) -> Output {
        Output::new(self.add_node(NodeKind::Parameter, vec![], vec![info]), 0)
    }

    /// Adds a constant node carrying `tensor`.
    pub fn add_constant(&mut self, tensor: Tensor) -> Output {
        let info = OutputInfo::new(
            Some(tensor.dtype()),
            PartialShape::from(tensor.shape()),
        );
        Output::new(
            self.add_node(NodeKind::Constant(tensor), vec![], vec![info]),
            0,
        )
    }

    /// Adds a placeholder for an omitted optional value.
    pub fn add_null(&mut self) -> Output {
        Output::new(
            self.add_node(NodeKind::Null, vec![], vec![OutputInfo::unknown()]),
            0,
        )
    }

    /// Adds an operation node with the given output metadata.
    pub fn add_op(
        &mut self,
        domain: &str,
        op_type: &str,
        inputs: Vec<Output>,
        attributes: BTreeMap<String, Attribute>,
        outputs: Vec<OutputInfo>,
        bodies: Vec<Function>,
    ) -> NodeId {
        self.add_node(
            NodeKind::Op {
                domain: domain.to_string(),
                op_type: op_type.to_string(),
                attributes,
                bodies,
            },
            inputs,
            outputs,
        )
    }

    // ── Access ─────────────────────────────────────────────────────

    /// Returns a node.
    ///
    /// # Panics
    /// Panics if `id` does not belong to this graph.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Returns a node mutably.
    ///
    /// # Panics
    /// Panics if `id` does not belong to this graph.
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Iterates nodes in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Metadata of an output port.
    ///
    /// # Panics
    /// Panics if the port does not exist.
    pub fn info(&self, output: Output) -> &OutputInfo {
        &self.nodes[output.node.0].outputs[output.index]
    }

    /// Mutable metadata of an output port.
    ///
    /// # Panics
    /// Panics if the port does not exist.
    pub fn info_mut(&mut self, output: Output) -> &mut OutputInfo {
        &mut self.nodes[output.node.0].outputs[output.index]
    }

    pub fn friendly_name(&self, id: NodeId) -> &str {
        &self.nodes[id.0].friendly_name
    }

    pub fn set_friendly_name(&mut self, id: NodeId, name: impl Into<String>) {
        self.nodes[id.0].friendly_name = name.into();
    }

    /// Adds binding names to an output port.
    pub fn add_names<I, S>(&mut self, output: Output, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.info_mut(output)
            .names
            .extend(names.into_iter().map(Into::into));
    }

    pub fn is_constant(&self, output: Output) -> bool {
        self.node(output.node).is_constant()
    }

    pub fn is_null(&self, output: Output) -> bool {
        matches!(self.node(output.node).kind, NodeKind::Null)
    }

    /// Returns the constant tensor behind `output`, if it is one.
    pub fn constant(&self, output: Output) -> Option<&Tensor> {
        match &self.node(output.node).kind {
            NodeKind::Constant(t) => Some(t),
            _ => None,
        }
    }

    // ── Edges ──────────────────────────────────────────────────────

    /// Every `(consumer, input slot)` that reads `output`.
    pub fn consumers(&self, output: Output) -> Vec<(NodeId, usize)> {
        self.nodes
            .iter()
            .flat_map(|n| {
                n.inputs
                    .iter()
                    .enumerate()
                    .filter(move |(_, i)| **i == output)
                    .map(move |(slot, _)| (n.id, slot))
            })
            .collect()
    }

    /// Points input `slot` of `node` at `source`.
    ///
    /// # Panics
    /// Panics if the node or slot does not exist.
    pub fn replace_input(&mut self, node: NodeId, slot: usize, source: Output) {
        self.nodes[node.0].inputs[slot] = source;
    }

    /// Rewrites every use of `old` by nodes with id ≥ `first` to `new`.
    ///
    /// Uses include input edges and the `source` of parent bindings recorded
    /// in the bodies those nodes own. Returns the number of rewritten uses.
    pub fn replace_uses_from(&mut self, first: NodeId, old: Output, new: Output) -> usize {
        let mut rewritten = 0;
        for node in self.nodes.iter_mut().skip(first.0) {
            for input in node.inputs.iter_mut().filter(|i| **i == old) {
                *input = new;
                rewritten += 1;
            }
            if let Some(bodies) = node.kind.bodies_mut() {
                for binding in bodies
                    .iter_mut()
                    .flat_map(|b| b.bindings.iter_mut())
                    .filter(|b| b.source == old)
                {
                    binding.source = new;
                    rewritten += 1;
                }
            }
        }
        rewritten
    }

    /// Re-copies each lifted parameter's type and shape from its current
    /// enclosing-scope source.
    ///
    /// Call before executing a body whose enclosing values may have been
    /// retyped or reshaped since import.
    pub fn refresh_bindings(&mut self, function: &Function) {
        for binding in &function.bindings {
            let source = self.info(binding.source).clone();
            let target = self.info_mut(Output::new(binding.parameter, 0));
            if target.elem_type != source.elem_type || target.shape != source.shape {
                tracing::debug!(
                    "refreshing '{}' in '{}': {} -> {}",
                    binding.parent_name,
                    function.name,
                    target.shape,
                    source.shape,
                );
            }
            target.elem_type = source.elem_type;
            target.shape = source.shape;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParentBinding;
    use tensor_core::{DType, Shape};

    fn add(ir: &mut IrGraph, a: Output, b: Output) -> Output {
        let id = ir.add_op(
            "",
            "Add",
            vec![a, b],
            BTreeMap::new(),
            vec![OutputInfo::unknown()],
            vec![],
        );
        Output::new(id, 0)
    }

    #[test]
    fn test_ids_grow_in_creation_order() {
        let mut ir = IrGraph::new();
        assert!(ir.is_empty());
        let p = ir.add_parameter(OutputInfo::unknown());
        let c = ir.add_constant(Tensor::scalar_zero(DType::F32));
        assert!(p.node < c.node);
        assert_eq!(ir.next_id().index(), 2);
        assert_eq!(ir.friendly_name(c.node), "constant_1");
    }

    #[test]
    fn test_constant_metadata() {
        let mut ir = IrGraph::new();
        let t = Tensor::from_f32(Shape::vector(3), &[1.0, 2.0, 3.0]).unwrap();
        let c = ir.add_constant(t.clone());
        assert!(ir.is_constant(c));
        assert_eq!(ir.info(c).elem_type, Some(DType::F32));
        assert_eq!(ir.info(c).shape, PartialShape::fixed(&[3]));
        assert_eq!(ir.constant(c), Some(&t));
    }

    #[test]
    fn test_consumers_and_replace_input() {
        let mut ir = IrGraph::new();
        let a = ir.add_parameter(OutputInfo::unknown());
        let b = ir.add_parameter(OutputInfo::unknown());
        let sum = add(&mut ir, a, a);

        assert_eq!(ir.consumers(a), vec![(sum.node, 0), (sum.node, 1)]);
        assert!(ir.consumers(b).is_empty());

        ir.replace_input(sum.node, 1, b);
        assert_eq!(ir.consumers(b), vec![(sum.node, 1)]);
    }

    #[test]
    fn test_replace_uses_respects_boundary() {
        let mut ir = IrGraph::new();
        let x = ir.add_parameter(OutputInfo::unknown());
        let outer = add(&mut ir, x, x);
        let first = ir.next_id();
        let lifted = ir.add_parameter(OutputInfo::unknown());
        let inner = add(&mut ir, x, outer);

        let n = ir.replace_uses_from(first, x, lifted);
        assert_eq!(n, 1);
        assert_eq!(ir.node(inner.node).inputs, vec![lifted, outer]);
        assert_eq!(ir.node(outer.node).inputs, vec![x, x]);
    }

    #[test]
    fn test_replace_uses_updates_body_bindings() {
        let mut ir = IrGraph::new();
        let x = ir.add_parameter(OutputInfo::unknown());
        let first = ir.next_id();
        let lifted = ir.add_parameter(OutputInfo::unknown());
        let inner_param = ir.add_parameter(OutputInfo::unknown());

        let mut body = Function::new("then");
        body.bindings.push(ParentBinding {
            parameter: inner_param.node,
            parent_name: "x".into(),
            source: x,
        });
        let if_node = ir.add_op(
            "",
            "If",
            vec![x],
            BTreeMap::new(),
            vec![OutputInfo::unknown()],
            vec![body],
        );

        assert_eq!(ir.replace_uses_from(first, x, lifted), 2);
        let node = ir.node(if_node);
        assert_eq!(node.inputs, vec![lifted]);
        assert_eq!(node.kind.bodies()[0].bindings[0].source, lifted);
    }

    #[test]
    fn test_refresh_bindings() {
        let mut ir = IrGraph::new();
        let x = ir.add_parameter(OutputInfo::new(Some(DType::F32), PartialShape::fixed(&[2])));
        let p = ir.add_parameter(OutputInfo::new(Some(DType::F32), PartialShape::fixed(&[2])));
        let mut body = Function::new("body");
        body.parameters.push(p.node);
        body.bindings.push(ParentBinding {
            parameter: p.node,
            parent_name: "x".into(),
            source: x,
        });

        ir.info_mut(x).shape = PartialShape::fixed(&[4, 2]);
        ir.info_mut(x).elem_type = Some(DType::F16);
        ir.refresh_bindings(&body);

        assert_eq!(ir.info(p).shape, PartialShape::fixed(&[4, 2]));
        assert_eq!(ir.info(p).elem_type, Some(DType::F16));
    }

    #[test]
    fn test_names() {
        let mut ir = IrGraph::new();
        let n = ir.add_null();
        assert!(ir.is_null(n));
        ir.add_names(n, ["a", "b"]);
        ir.add_names(n, ["a"]);
        assert_eq!(ir.info(n).names.len(), 2);
    }
}
