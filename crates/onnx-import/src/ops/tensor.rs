// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Data movement and constant-producing operators.

use super::emit;
use crate::initializer::decode_tensor;
use crate::{NodeContext, OpError, RegistryBuilder};
use graph_ir::{Attribute, Output, OutputInfo};
use onnx_model::dtype::dtype_from_onnx;
use std::collections::BTreeMap;
use tensor_core::{Dim, PartialShape, Shape, Tensor};

pub(super) fn register(builder: RegistryBuilder) -> RegistryBuilder {
    builder
        .register("", "Identity", 1, identity)
        .register("", "Cast", 6, cast)
        .register("", "Constant", 1, constant)
        .register("", "Split", 1, split_attribute)
        .register("", "Split", 13, split_input)
        .register("", "Dropout", 1, dropout)
        .register("", "Dropout", 12, dropout)
}

fn identity(ctx: &mut NodeContext<'_>) -> Result<Vec<Output>, OpError> {
    ctx.expect_inputs(1, 1)?;
    Ok(vec![ctx.input(0)?])
}

fn cast(ctx: &mut NodeContext<'_>) -> Result<Vec<Output>, OpError> {
    ctx.expect_inputs(1, 1)?;
    let x = ctx.input(0)?;
    let to = ctx
        .node
        .attr_int("to")
        .ok_or_else(|| ctx.invalid("missing attribute 'to'"))?;
    let dtype = i32::try_from(to)
        .ok()
        .and_then(dtype_from_onnx)
        .ok_or_else(|| ctx.invalid(format!("unsupported target element type {to}")))?;

    let info = OutputInfo::new(Some(dtype), ctx.info(x).shape);
    let attributes = BTreeMap::from([("to".to_string(), Attribute::Type(dtype))]);
    Ok(emit(ctx, vec![x], attributes, vec![info], Vec::new()))
}

/// `Constant` becomes a constant node; no operation is emitted.
fn constant(ctx: &mut NodeContext<'_>) -> Result<Vec<Output>, OpError> {
    ctx.expect_inputs(0, 0)?;
    let node = ctx.node;
    let tensor = if let Some(desc) = node.attr_tensor("value") {
        decode_tensor(desc, ctx.base_dir).map_err(|e| OpError::Internal(e.to_string()))?
    } else if let Some(v) = node.attr_float("value_float") {
        Tensor::from_f32(Shape::scalar(), &[v])?
    } else if let Some(v) = node.attr_int("value_int") {
        Tensor::from_i64(Shape::scalar(), &[v])?
    } else if let Some(vs) = node.attr_ints("value_ints") {
        Tensor::from_i64(Shape::vector(vs.len()), vs)?
    } else if let Some(onnx_model::AttributeValue::Floats(vs)) = node.attribute("value_floats") {
        Tensor::from_f32(Shape::vector(vs.len()), vs)?
    } else {
        return Err(ctx.invalid(
            "expected one of 'value', 'value_float', 'value_floats', 'value_int', 'value_ints'",
        ));
    };
    Ok(vec![ctx.ir.add_constant(tensor)])
}

/// Opsets 1–12: sizes come from the `split` attribute.
fn split_attribute(ctx: &mut NodeContext<'_>) -> Result<Vec<Output>, OpError> {
    let sizes = ctx.node.attr_ints("split").map(<[i64]>::to_vec);
    split(ctx, sizes)
}

/// Opset 13+: sizes come from an optional constant second input.
fn split_input(ctx: &mut NodeContext<'_>) -> Result<Vec<Output>, OpError> {
    let sizes = match ctx.optional_input(1) {
        Some(s) => {
            let tensor = ctx
                .ir
                .constant(s)
                .ok_or_else(|| ctx.invalid("split sizes must be a constant"))?;
            Some(tensor.to_i64_vec()?)
        }
        None => None,
    };
    split(ctx, sizes)
}

/// One IR node with one output per declared node output.
fn split(ctx: &mut NodeContext<'_>, sizes: Option<Vec<i64>>) -> Result<Vec<Output>, OpError> {
    ctx.expect_inputs(1, 2)?;
    let x = ctx.input(0)?;
    let info = ctx.info(x);
    let parts = ctx.num_outputs();
    if parts == 0 {
        return Err(ctx.invalid("Split must declare at least one output"));
    }
    if let Some(s) = &sizes {
        if s.len() != parts {
            return Err(ctx.invalid(format!(
                "{} split size(s) for {parts} output(s)",
                s.len()
            )));
        }
        if let Some(bad) = s.iter().find(|&&v| v < 0) {
            return Err(ctx.invalid(format!("negative split size {bad}")));
        }
    }

    let axis = ctx.node.attr_int("axis").unwrap_or(0);
    let mut attributes = BTreeMap::from([("axis".to_string(), Attribute::Int(axis))]);
    if let Some(s) = &sizes {
        attributes.insert("split".to_string(), Attribute::Ints(s.clone()));
    }

    let outputs = match info.shape.dims() {
        None => vec![OutputInfo::new(info.elem_type, PartialShape::dynamic()); parts],
        Some(dims) => {
            let rank = dims.len() as i64;
            let normalized = if axis < 0 { axis + rank } else { axis };
            if !(0..rank).contains(&normalized) {
                return Err(ctx.invalid(format!("axis {axis} is out of range for rank {rank}")));
            }
            let axis = normalized as usize;
            let extents = split_extents(ctx, dims[axis], sizes.as_deref(), parts)?;
            extents
                .into_iter()
                .map(|extent| {
                    let mut part = dims.to_vec();
                    part[axis] = extent;
                    OutputInfo::new(info.elem_type, PartialShape::Ranked(part))
                })
                .collect()
        }
    };
    Ok(emit(ctx, vec![x], attributes, outputs, Vec::new()))
}

fn split_extents(
    ctx: &NodeContext<'_>,
    dim: Dim,
    sizes: Option<&[i64]>,
    parts: usize,
) -> Result<Vec<Dim>, OpError> {
    if let Some(s) = sizes {
        let extents = s
            .iter()
            .map(|&v| usize::try_from(v).map_err(|_| ctx.invalid(format!("negative split size {v}"))))
            .collect::<Result<Vec<_>, _>>()?;
        if let Dim::Fixed(n) = dim {
            let total = extents.iter().try_fold(0usize, |acc, &e| acc.checked_add(e));
            if total != Some(n) {
                return Err(ctx.invalid(format!("split sizes {s:?} do not add up to axis extent {n}")));
            }
        }
        return Ok(extents.into_iter().map(Dim::Fixed).collect());
    }
    match dim {
        Dim::Fixed(n) if n % parts != 0 => Err(ctx.invalid(format!(
            "axis of extent {n} cannot be split evenly into {parts}"
        ))),
        Dim::Fixed(n) => Ok(vec![Dim::Fixed(n / parts); parts]),
        Dim::Dynamic => Ok(vec![Dim::Dynamic; parts]),
    }
}

/// Inference-time `Dropout`: the data passes through and the optional mask
/// is a scalar `true` constant, which broadcasts against the data.
fn dropout(ctx: &mut NodeContext<'_>) -> Result<Vec<Output>, OpError> {
    ctx.expect_inputs(1, 3)?;
    let x = ctx.input(0)?;
    let mut outputs = vec![x];
    if ctx.num_outputs() > 1 {
        let mask = Tensor::from_bool(Shape::scalar(), &[true])?;
        outputs.push(ctx.ir.add_constant(mask));
    }
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use crate::{ConvertedModel, ErrorKind, Frontend, ImportConfig, ImportError};
    use onnx_model::{AttributeValue, GraphDescriptor, ModelDescriptor, NodeDescriptor, TensorDescriptor, ValueInfo};
    use tensor_core::{DType, PartialShape};

    fn convert(graph: GraphDescriptor, opset: i64) -> Result<ConvertedModel, ImportError> {
        Frontend::new(ImportConfig::default())
            .load_model(ModelDescriptor::new(graph).with_opset("", opset))
            .convert()
    }

    fn split_graph(node: NodeDescriptor) -> GraphDescriptor {
        let outputs = node.outputs.clone();
        let mut g = GraphDescriptor::new("g")
            .with_input(ValueInfo::tensor("x", DType::F32, &[2, 6]))
            .with_node(node);
        for name in outputs {
            g = g.with_output(ValueInfo::untyped(name));
        }
        g
    }

    #[test]
    fn test_split_even() {
        let node = NodeDescriptor::new("Split", ["x"], ["a", "b", "c"])
            .with_attribute("axis", AttributeValue::Int(-1));
        let m = convert(split_graph(node), 17).unwrap();
        for info in m.result_infos() {
            assert_eq!(info.shape, PartialShape::fixed(&[2, 2]));
        }
    }

    #[test]
    fn test_split_attribute_sizes() {
        let node = NodeDescriptor::new("Split", ["x"], ["a", "b"])
            .with_attribute("axis", AttributeValue::Int(1))
            .with_attribute("split", AttributeValue::Ints(vec![2, 4]));
        let m = convert(split_graph(node), 11).unwrap();
        let shapes: Vec<_> = m.result_infos().iter().map(|i| i.shape.clone()).collect();
        assert_eq!(shapes, vec![PartialShape::fixed(&[2, 2]), PartialShape::fixed(&[2, 4])]);
    }

    #[test]
    fn test_split_input_sizes() {
        let node = NodeDescriptor::new("Split", ["x", "sizes"], ["a", "b"])
            .with_attribute("axis", AttributeValue::Int(1));
        let g = split_graph(node).with_initializer(TensorDescriptor::from_i64("sizes", &[2], &[5, 1]));
        let m = convert(g, 13).unwrap();
        assert_eq!(m.result_infos()[1].shape, PartialShape::fixed(&[2, 1]));
    }

    #[test]
    fn test_split_uneven_rejected() {
        let node = NodeDescriptor::new("Split", ["x"], ["a", "b", "c", "d"]).with_attribute("axis", AttributeValue::Int(1));
        assert_eq!(convert(split_graph(node), 17).unwrap_err().kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_split_sizes_out_of_range_rejected() {
        for sizes in [vec![i64::MAX, i64::MAX], vec![-2, 8]] {
            let node = NodeDescriptor::new("Split", ["x"], ["a", "b"])
                .with_attribute("axis", AttributeValue::Int(1))
                .with_attribute("split", AttributeValue::Ints(sizes.clone()));
            let err = convert(split_graph(node), 11).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{sizes:?}: {err}");
        }
    }

    #[test]
    fn test_cast() {
        let g = GraphDescriptor::new("g")
            .with_input(ValueInfo::tensor("x", DType::F32, &[3]))
            .with_node(NodeDescriptor::new("Cast", ["x"], ["y"]).with_attribute("to", AttributeValue::Int(7)))
            .with_output(ValueInfo::untyped("y"));
        let m = convert(g, 17).unwrap();
        assert_eq!(m.result_infos()[0].elem_type, Some(DType::I64));
    }

    #[test]
    fn test_constant_variants() {
        let g = GraphDescriptor::new("g")
            .with_node(
                NodeDescriptor::new("Constant", Vec::<String>::new(), ["t"])
                    .with_attribute("value", AttributeValue::Tensor(TensorDescriptor::from_f32("t", &[2], &[1.0, 2.0]))),
            )
            .with_node(
                NodeDescriptor::new("Constant", Vec::<String>::new(), ["i"])
                    .with_attribute("value_ints", AttributeValue::Ints(vec![4, 5, 6])),
            )
            .with_output(ValueInfo::untyped("t"))
            .with_output(ValueInfo::untyped("i"));
        let m = convert(g, 17).unwrap();
        let t = m.ir.constant(m.function.results[0].source).unwrap();
        assert_eq!(t.to_f32_vec().unwrap(), vec![1.0, 2.0]);
        let i = m.ir.constant(m.function.results[1].source).unwrap();
        assert_eq!(i.to_i64_vec().unwrap(), vec![4, 5, 6]);
        assert_eq!(m.ir.friendly_name(m.function.results[1].source.node), "i");
    }

    #[test]
    fn test_constant_without_value() {
        let g = GraphDescriptor::new("g")
            .with_node(NodeDescriptor::new("Constant", Vec::<String>::new(), ["t"]))
            .with_output(ValueInfo::untyped("t"));
        assert_eq!(convert(g, 17).unwrap_err().kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_dropout_mask() {
        let g = GraphDescriptor::new("g")
            .with_input(ValueInfo::tensor("x", DType::F32, &[2, 2]))
            .with_node(NodeDescriptor::new("Dropout", ["x"], ["y", "mask"]))
            .with_output(ValueInfo::untyped("y"))
            .with_output(ValueInfo::untyped("mask"));
        let m = convert(g, 17).unwrap();
        let mask = m.ir.constant(m.function.results[1].source).unwrap();
        assert_eq!(mask.dtype(), DType::Bool);
        assert_eq!(mask.shape().rank(), 0);
        assert_eq!(mask.to_bool_vec().unwrap(), vec![true]);
    }

    #[test]
    fn test_dropout_mask_on_huge_input() {
        let g = GraphDescriptor::new("g")
            .with_input(ValueInfo::tensor("x", DType::F32, &[1 << 40, 1 << 40]))
            .with_node(NodeDescriptor::new("Dropout", ["x"], ["y", "mask"]))
            .with_output(ValueInfo::untyped("y"))
            .with_output(ValueInfo::untyped("mask"));
        let m = convert(g, 17).unwrap();
        let mask = m.ir.constant(m.function.results[1].source).unwrap();
        assert_eq!(mask.num_elements(), 1);
        assert_eq!(m.result_infos()[0].shape, PartialShape::fixed(&[1 << 40, 1 << 40]));
    }
}
