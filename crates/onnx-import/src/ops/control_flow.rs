// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `If` and `Loop`.
//!
//! Both own their converted bodies. Their IR inputs are the node's explicit
//! inputs followed by every enclosing-scope value the bodies lifted, each
//! value once.

use super::emit;
use crate::{ConvertedSubgraph, NodeContext, OpError, RegistryBuilder};
use graph_ir::{Output, OutputInfo};
use std::collections::BTreeMap;
use tensor_core::{Dim, PartialShape};

pub(super) fn register(builder: RegistryBuilder) -> RegistryBuilder {
    builder
        .register("", "If", 1, if_op)
        .register("", "Loop", 1, loop_op)
}

/// Appends the lifted inputs of `bodies` to `inputs`, skipping repeats.
fn with_parent_inputs(mut inputs: Vec<Output>, bodies: &[&ConvertedSubgraph]) -> Vec<Output> {
    for source in bodies.iter().flat_map(|b| &b.inputs_from_parent) {
        if !inputs.contains(source) {
            inputs.push(*source);
        }
    }
    inputs
}

fn if_op(ctx: &mut NodeContext<'_>) -> Result<Vec<Output>, OpError> {
    ctx.expect_inputs(1, 1)?;
    let cond = ctx.input(0)?;
    let then_branch = ctx.subgraph("then_branch")?;
    let else_branch = ctx.subgraph("else_branch")?;

    let (then_results, else_results) = (&then_branch.function.results, &else_branch.function.results);
    if then_results.len() != else_results.len() {
        return Err(ctx.invalid(format!(
            "then_branch yields {} output(s), else_branch {}",
            then_results.len(),
            else_results.len()
        )));
    }

    let mut outputs = Vec::with_capacity(then_results.len());
    for (t, e) in then_results.iter().zip(else_results) {
        let (t, e) = (ctx.info(t.source), ctx.info(e.source));
        let elem_type = match (t.elem_type, e.elem_type) {
            (Some(x), Some(y)) if x != y => {
                return Err(ctx.invalid(format!("branches yield {x} and {y}")));
            }
            (x, y) => x.or(y),
        };
        outputs.push(OutputInfo::new(elem_type, t.shape.merge(&e.shape)));
    }

    let inputs = with_parent_inputs(vec![cond], &[then_branch, else_branch]);
    let bodies = vec![then_branch.function.clone(), else_branch.function.clone()];
    Ok(emit(ctx, inputs, BTreeMap::new(), outputs, bodies))
}

/// `Loop(M, cond, v_initial...)`.
///
/// The body yields `cond_out`, the loop-carried values, then the scan
/// outputs; the node yields the final carried values, then each scan
/// output stacked along a new leading axis.
fn loop_op(ctx: &mut NodeContext<'_>) -> Result<Vec<Output>, OpError> {
    let body = ctx.subgraph("body")?;
    if ctx.inputs.len() < 2 {
        return Err(ctx.invalid("Loop expects at least the trip count and condition inputs"));
    }
    let carried = ctx.inputs.len() - 2;
    let results = &body.function.results;
    if results.len() < 1 + carried {
        return Err(ctx.invalid(format!(
            "body yields {} output(s), needs at least {} for {carried} carried value(s)",
            results.len(),
            1 + carried
        )));
    }

    let mut outputs = Vec::with_capacity(results.len() - 1);
    for (i, result) in results[1..=carried].iter().enumerate() {
        let initial = ctx.info(ctx.inputs[2 + i]);
        let yielded = ctx.info(result.source);
        outputs.push(OutputInfo::new(
            initial.elem_type.or(yielded.elem_type),
            initial.shape.merge(&yielded.shape),
        ));
    }
    for result in &results[1 + carried..] {
        let per_iteration = ctx.info(result.source);
        let shape = match per_iteration.shape.dims() {
            Some(dims) => {
                let mut stacked = vec![Dim::Dynamic];
                stacked.extend_from_slice(dims);
                PartialShape::Ranked(stacked)
            }
            None => PartialShape::dynamic(),
        };
        outputs.push(OutputInfo::new(per_iteration.elem_type, shape));
    }

    let inputs = with_parent_inputs(ctx.inputs.clone(), &[body]);
    let bodies = vec![body.function.clone()];
    Ok(emit(ctx, inputs, BTreeMap::new(), outputs, bodies))
}

#[cfg(test)]
mod tests {
    use crate::{ErrorKind, Frontend, ImportConfig};
    use onnx_model::{AttributeValue, GraphDescriptor, ModelDescriptor, NodeDescriptor, ValueInfo};
    use tensor_core::{DType, Dim, PartialShape};

    fn loop_model() -> ModelDescriptor {
        // Accumulates `step` into `acc` and emits each partial sum.
        let body = GraphDescriptor::new("body")
            .with_input(ValueInfo::tensor("i", DType::I64, &[]))
            .with_input(ValueInfo::tensor("c_in", DType::Bool, &[]))
            .with_input(ValueInfo::tensor("acc_in", DType::F32, &[2]))
            .with_node(NodeDescriptor::new("Identity", ["c_in"], ["c_out"]))
            .with_node(NodeDescriptor::new("Add", ["acc_in", "step"], ["acc_out"]))
            .with_node(NodeDescriptor::new("Identity", ["acc_out"], ["scan"]))
            .with_output(ValueInfo::untyped("c_out"))
            .with_output(ValueInfo::untyped("acc_out"))
            .with_output(ValueInfo::untyped("scan"));

        let graph = GraphDescriptor::new("main")
            .with_input(ValueInfo::tensor("n", DType::I64, &[]))
            .with_input(ValueInfo::tensor("go", DType::Bool, &[]))
            .with_input(ValueInfo::tensor("init", DType::F32, &[2]))
            .with_input(ValueInfo::tensor("delta", DType::F32, &[2]))
            .with_node(NodeDescriptor::new("Relu", ["delta"], ["step"]))
            .with_node(
                NodeDescriptor::new("Loop", ["n", "go", "init"], ["final", "partials"])
                    .with_attribute("body", AttributeValue::Graph(body)),
            )
            .with_output(ValueInfo::untyped("final"))
            .with_output(ValueInfo::untyped("partials"));
        ModelDescriptor::new(graph).with_opset("", 17)
    }

    #[test]
    fn test_loop_outputs_and_inputs() {
        let m = Frontend::new(ImportConfig::default())
            .load_model(loop_model())
            .convert()
            .unwrap();
        let infos = m.result_infos();
        assert_eq!(infos[0].shape, PartialShape::fixed(&[2]));
        assert_eq!(infos[1].shape, PartialShape::Ranked(vec![Dim::Dynamic, Dim::Fixed(2)]));

        let loop_node = m.ir.node(m.function.results[0].source.node);
        // n, go, init, then the lifted `step`.
        assert_eq!(loop_node.inputs.len(), 4);
        let body = &loop_node.kind.bodies()[0];
        assert_eq!(body.parameters.len(), 4);
        assert_eq!(body.bindings[0].parent_name, "step");
        assert_eq!(loop_node.inputs[3], body.bindings[0].source);
    }

    #[test]
    fn test_if_branch_count_mismatch() {
        let one = GraphDescriptor::new("then")
            .with_node(NodeDescriptor::new("Neg", ["x"], ["y"]))
            .with_output(ValueInfo::untyped("y"));
        let two = one.clone().with_output(ValueInfo::untyped("x"));
        let graph = GraphDescriptor::new("main")
            .with_input(ValueInfo::tensor("c", DType::Bool, &[]))
            .with_input(ValueInfo::tensor("x", DType::F32, &[1]))
            .with_node(
                NodeDescriptor::new("If", ["c"], ["out"])
                    .with_attribute("then_branch", AttributeValue::Graph(one))
                    .with_attribute("else_branch", AttributeValue::Graph(two)),
            )
            .with_output(ValueInfo::untyped("out"));
        let err = Frontend::new(ImportConfig::default())
            .load_model(ModelDescriptor::new(graph))
            .convert()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_if_missing_branch() {
        let graph = GraphDescriptor::new("main")
            .with_input(ValueInfo::tensor("c", DType::Bool, &[]))
            .with_node(NodeDescriptor::new("If", ["c"], ["out"]))
            .with_output(ValueInfo::untyped("out"));
        let err = Frontend::new(ImportConfig::default())
            .load_model(ModelDescriptor::new(graph))
            .convert()
            .unwrap_err();
        assert!(err.to_string().contains("then_branch"));
    }
}
