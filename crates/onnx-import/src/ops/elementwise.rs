// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Element-wise arithmetic, activations and `MatMul`.

use super::emit;
use crate::{NodeContext, OpError, RegistryBuilder};
use graph_ir::{Output, OutputInfo};
use std::collections::BTreeMap;

const BINARY: [&str; 5] = ["Add", "Sub", "Mul", "Div", "Pow"];
const UNARY: [&str; 7] = ["Relu", "Sigmoid", "Tanh", "Neg", "Abs", "Exp", "Sqrt"];

pub(super) fn register(builder: RegistryBuilder) -> RegistryBuilder {
    // Numpy broadcasting replaced the `broadcast` attribute in opset 7.
    let builder = BINARY
        .iter()
        .fold(builder, |b, op| b.register("", op, 7, binary));
    let builder = UNARY
        .iter()
        .fold(builder, |b, op| b.register("", op, 6, unary));
    builder.register("", "MatMul", 1, matmul)
}

/// Broadcasting binary operation.
///
/// Operands must share an element type, except for `Pow` whose exponent
/// may differ from the base.
fn binary(ctx: &mut NodeContext<'_>) -> Result<Vec<Output>, OpError> {
    ctx.expect_inputs(2, 2)?;
    let (a, b) = (ctx.input(0)?, ctx.input(1)?);
    let (lhs, rhs) = (ctx.info(a), ctx.info(b));

    let elem_type = if ctx.node.op_type == "Pow" {
        lhs.elem_type
    } else {
        match (lhs.elem_type, rhs.elem_type) {
            (Some(x), Some(y)) if x != y => {
                return Err(ctx.invalid(format!("operand element types differ: {x} and {y}")));
            }
            (x, y) => x.or(y),
        }
    };
    let shape = lhs.shape.broadcast(&rhs.shape).ok_or_else(|| {
        ctx.invalid(format!(
            "shapes {} and {} cannot be broadcast",
            lhs.shape, rhs.shape
        ))
    })?;

    Ok(emit(
        ctx,
        vec![a, b],
        BTreeMap::new(),
        vec![OutputInfo::new(elem_type, shape)],
        Vec::new(),
    ))
}

/// Shape- and type-preserving unary operation.
fn unary(ctx: &mut NodeContext<'_>) -> Result<Vec<Output>, OpError> {
    ctx.expect_inputs(1, 1)?;
    let x = ctx.input(0)?;
    let info = ctx.info(x);
    Ok(emit(ctx, vec![x], BTreeMap::new(), vec![info], Vec::new()))
}

fn matmul(ctx: &mut NodeContext<'_>) -> Result<Vec<Output>, OpError> {
    ctx.expect_inputs(2, 2)?;
    let (a, b) = (ctx.input(0)?, ctx.input(1)?);
    let (lhs, rhs) = (ctx.info(a), ctx.info(b));

    if let (Some(x), Some(y)) = (lhs.elem_type, rhs.elem_type) {
        if x != y {
            return Err(ctx.invalid(format!("operand element types differ: {x} and {y}")));
        }
    }
    let shape = lhs.shape.matmul(&rhs.shape).ok_or_else(|| {
        ctx.invalid(format!(
            "cannot multiply {} by {}",
            lhs.shape, rhs.shape
        ))
    })?;

    Ok(emit(
        ctx,
        vec![a, b],
        BTreeMap::new(),
        vec![OutputInfo::new(lhs.elem_type.or(rhs.elem_type), shape)],
        Vec::new(),
    ))
}

#[cfg(test)]
mod tests {
    use crate::{ErrorKind, Frontend, ImportConfig, ImportError};
    use onnx_model::{GraphDescriptor, ModelDescriptor, NodeDescriptor, ValueInfo};
    use tensor_core::{DType, Dim, PartialShape};

    fn two_inputs(op: &str, a: ValueInfo, b: ValueInfo) -> Result<crate::ConvertedModel, ImportError> {
        let graph = GraphDescriptor::new("g")
            .with_input(a)
            .with_input(b)
            .with_node(NodeDescriptor::new(op, ["a", "b"], ["c"]).with_name("n"))
            .with_output(ValueInfo::untyped("c"));
        Frontend::new(ImportConfig::default())
            .load_model(ModelDescriptor::new(graph).with_opset("", 17))
            .convert()
    }

    #[test]
    fn test_add_broadcasts() {
        let a = ValueInfo::tensor("a", DType::F32, &[4, 1]);
        let b = ValueInfo::new("b", Some(DType::F32), PartialShape::Ranked(vec![Dim::Dynamic, Dim::Fixed(3)]));
        let m = two_inputs("Add", a, b).unwrap();
        let info = m.result_infos()[0];
        assert_eq!(info.elem_type, Some(DType::F32));
        assert_eq!(info.shape, PartialShape::fixed(&[4, 3]));
    }

    #[test]
    fn test_mixed_types_rejected() {
        let a = ValueInfo::tensor("a", DType::F32, &[2]);
        let b = ValueInfo::tensor("b", DType::I64, &[2]);
        let err = two_inputs("Mul", a, b).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("'n'"));
    }

    #[test]
    fn test_pow_keeps_base_type() {
        let a = ValueInfo::tensor("a", DType::F32, &[2]);
        let b = ValueInfo::tensor("b", DType::I32, &[]);
        let m = two_inputs("Pow", a, b).unwrap();
        assert_eq!(m.result_infos()[0].elem_type, Some(DType::F32));
    }

    #[test]
    fn test_matmul_shape() {
        let a = ValueInfo::tensor("a", DType::F32, &[8, 2, 3]);
        let b = ValueInfo::tensor("b", DType::F32, &[3, 5]);
        let m = two_inputs("MatMul", a, b).unwrap();
        assert_eq!(m.result_infos()[0].shape, PartialShape::fixed(&[8, 2, 5]));

        let a = ValueInfo::tensor("a", DType::F32, &[2, 3]);
        let b = ValueInfo::tensor("b", DType::F32, &[4, 5]);
        assert_eq!(two_inputs("MatMul", a, b).unwrap_err().kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_unary_preserves_info() {
        let graph = GraphDescriptor::new("g")
            .with_input(ValueInfo::tensor("x", DType::F16, &[1, 7]))
            .with_node(NodeDescriptor::new("Tanh", ["x"], ["y"]))
            .with_output(ValueInfo::untyped("y"));
        let m = Frontend::new(ImportConfig::default())
            .load_model(ModelDescriptor::new(graph))
            .convert()
            .unwrap();
        let info = m.result_infos()[0];
        assert_eq!(info.elem_type, Some(DType::F16));
        assert_eq!(info.shape, PartialShape::fixed(&[1, 7]));
    }
}
