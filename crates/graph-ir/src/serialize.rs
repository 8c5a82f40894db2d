// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! JSON serialization of a function and the nodes it reaches.
//!
//! The document is self-contained: node ids are arena indices, edges are
//! `[node, index]` pairs, and nested bodies are serialized inline under the
//! node that owns them.
//!
//! ```json
//! {
//!   "name": "main",
//!   "parameters": [0],
//!   "results": [ { "name": "y/sink_port_0", "source": [2, 0] } ],
//!   "bindings": [],
//!   "nodes": [
//!     { "id": 0, "kind": "parameter", "friendly_name": "x", "inputs": [],
//!       "outputs": [ { "elem_type": "f32", "shape": "[1, 4]", "names": ["x"] } ] }
//!   ]
//! }
//! ```

use crate::{Attribute, Function, IrGraph, NodeId, NodeKind};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tensor_core::DType;

#[derive(Serialize)]
struct FunctionDoc<'a> {
    name: &'a str,
    parameters: Vec<usize>,
    results: Vec<ResultDoc<'a>>,
    bindings: Vec<BindingDoc<'a>>,
    nodes: Vec<NodeDoc<'a>>,
}

#[derive(Serialize)]
struct ResultDoc<'a> {
    name: &'a str,
    source: [usize; 2],
}

#[derive(Serialize)]
struct BindingDoc<'a> {
    parameter: usize,
    parent_name: &'a str,
    source: [usize; 2],
}

#[derive(Serialize)]
struct NodeDoc<'a> {
    id: usize,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    domain: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    op_type: Option<&'a str>,
    friendly_name: &'a str,
    inputs: Vec<[usize; 2]>,
    outputs: Vec<OutputDoc<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attributes: Option<&'a BTreeMap<String, Attribute>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    constant: Option<ConstantDoc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    bodies: Vec<FunctionDoc<'a>>,
}

#[derive(Serialize)]
struct OutputDoc<'a> {
    elem_type: Option<DType>,
    shape: String,
    names: &'a BTreeSet<String>,
}

#[derive(Serialize)]
struct ConstantDoc {
    dtype: DType,
    shape: Vec<usize>,
    bytes: usize,
}

/// Serializes `function` to pretty-printed JSON.
pub fn to_json(ir: &IrGraph, function: &Function) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&function_doc(ir, function))
}

/// Serializes `function` to a [`serde_json::Value`].
pub fn to_value(ir: &IrGraph, function: &Function) -> Result<serde_json::Value, serde_json::Error> {
    serde_json::to_value(function_doc(ir, function))
}

/// Ids of every node a function's results and parameters reach through
/// input edges, in ascending order. Nested bodies are not entered.
pub fn reachable(ir: &IrGraph, function: &Function) -> BTreeSet<NodeId> {
    let mut seen = BTreeSet::new();
    let mut stack: Vec<NodeId> = function
        .results
        .iter()
        .map(|r| r.source.node)
        .chain(function.parameters.iter().copied())
        .collect();

    while let Some(id) = stack.pop() {
        if seen.insert(id) {
            stack.extend(ir.node(id).inputs.iter().map(|i| i.node));
        }
    }
    seen
}

fn function_doc<'a>(ir: &'a IrGraph, function: &'a Function) -> FunctionDoc<'a> {
    let nodes = reachable(ir, function)
        .into_iter()
        .map(|id| node_doc(ir, id))
        .collect();

    FunctionDoc {
        name: &function.name,
        parameters: function.parameters.iter().map(|p| p.index()).collect(),
        results: function
            .results
            .iter()
            .map(|r| ResultDoc {
                name: &r.name,
                source: [r.source.node.index(), r.source.index],
            })
            .collect(),
        bindings: function
            .bindings
            .iter()
            .map(|b| BindingDoc {
                parameter: b.parameter.index(),
                parent_name: &b.parent_name,
                source: [b.source.node.index(), b.source.index],
            })
            .collect(),
        nodes,
    }
}

fn node_doc(ir: &IrGraph, id: NodeId) -> NodeDoc<'_> {
    let node = ir.node(id);
    let (domain, op_type) = match node.kind.op() {
        Some((d, o)) => (Some(d), Some(o)),
        None => (None, None),
    };
    let attributes = match &node.kind {
        NodeKind::Op { attributes, .. } if !attributes.is_empty() => Some(attributes),
        _ => None,
    };
    let constant = match &node.kind {
        NodeKind::Constant(t) => Some(ConstantDoc {
            dtype: t.dtype(),
            shape: t.shape().dims().to_vec(),
            bytes: t.size_bytes(),
        }),
        _ => None,
    };

    NodeDoc {
        id: id.index(),
        kind: node.kind.tag(),
        domain,
        op_type,
        friendly_name: &node.friendly_name,
        inputs: node
            .inputs
            .iter()
            .map(|i| [i.node.index(), i.index])
            .collect(),
        outputs: node
            .outputs
            .iter()
            .map(|o| OutputDoc {
                elem_type: o.elem_type,
                shape: o.shape.to_string(),
                names: &o.names,
            })
            .collect(),
        attributes,
        constant,
        bodies: node
            .kind
            .bodies()
            .iter()
            .map(|b| function_doc(ir, b))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FunctionResult, Output, OutputInfo};
    use tensor_core::{PartialShape, Tensor};

    fn sample() -> (IrGraph, Function) {
        let mut ir = IrGraph::new();
        let x = ir.add_parameter(OutputInfo::new(Some(DType::F32), PartialShape::fixed(&[1, 4])));
        ir.set_friendly_name(x.node, "x");
        ir.add_names(x, ["x"]);
        let unused = ir.add_constant(Tensor::scalar_zero(DType::F32));
        let relu = ir.add_op(
            "",
            "Relu",
            vec![x],
            BTreeMap::new(),
            vec![OutputInfo::new(Some(DType::F32), PartialShape::fixed(&[1, 4]))],
            vec![],
        );
        let _ = unused;

        let mut f = Function::new("main");
        f.parameters.push(x.node);
        f.results.push(FunctionResult {
            source: Output::new(relu, 0),
            name: "y/sink_port_0".into(),
        });
        (ir, f)
    }

    #[test]
    fn test_reachable_skips_dead_nodes() {
        let (ir, f) = sample();
        let ids: Vec<usize> = reachable(&ir, &f).into_iter().map(|i| i.index()).collect();
        assert_eq!(ids, [0, 2]);
    }

    #[test]
    fn test_document_shape() {
        let (ir, f) = sample();
        let v = to_value(&ir, &f).unwrap();

        assert_eq!(v["name"], "main");
        assert_eq!(v["parameters"], serde_json::json!([0]));
        assert_eq!(v["results"][0]["source"], serde_json::json!([2, 0]));
        assert_eq!(v["nodes"].as_array().map(Vec::len), Some(2));
        assert_eq!(v["nodes"][0]["kind"], "parameter");
        assert_eq!(v["nodes"][0]["outputs"][0]["shape"], "[1, 4]");
        assert_eq!(v["nodes"][1]["op_type"], "Relu");
        assert_eq!(v["nodes"][1]["inputs"], serde_json::json!([[0, 0]]));
    }

    #[test]
    fn test_pretty_json_parses_back() {
        let (ir, f) = sample();
        let text = to_json(&ir, &f).unwrap();
        let back: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(back["results"][0]["name"], "y/sink_port_0");
    }
}
