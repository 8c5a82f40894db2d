// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Built-in operator conversions, all in the default ONNX domain.
//!
//! Each conversion validates its node, infers output element types and
//! shapes as far as the inputs allow, and appends IR nodes through
//! [`NodeContext::ir`]. Conversions never look up tensor names; inputs and
//! nested bodies arrive already resolved.

mod control_flow;
mod elementwise;
mod tensor;

use crate::{NodeContext, RegistryBuilder};
use graph_ir::{Attribute, Function, Output, OutputInfo};
use onnx_model::normalize_domain;
use std::collections::BTreeMap;

/// Registers every built-in conversion.
pub fn register_defaults(builder: RegistryBuilder) -> RegistryBuilder {
    let builder = elementwise::register(builder);
    let builder = tensor::register(builder);
    control_flow::register(builder)
}

/// Appends one IR operation mirroring the model node and returns its outputs.
fn emit(
    ctx: &mut NodeContext<'_>,
    inputs: Vec<Output>,
    attributes: BTreeMap<String, Attribute>,
    outputs: Vec<OutputInfo>,
    bodies: Vec<Function>,
) -> Vec<Output> {
    let node = ctx.node;
    let id = ctx.ir.add_op(
        normalize_domain(&node.domain),
        &node.op_type,
        inputs,
        attributes,
        outputs,
        bodies,
    );
    ctx.ir.node(id).output_handles().collect()
}

#[cfg(test)]
mod tests {
    use crate::OperatorRegistry;

    #[test]
    fn test_default_set() {
        let registry = OperatorRegistry::with_defaults();
        for op in [
            "Identity", "Add", "Sub", "Mul", "Div", "Pow", "Relu", "Sigmoid", "Tanh", "Neg",
            "Abs", "Exp", "Sqrt", "MatMul", "Cast", "Constant", "Split", "Dropout", "If", "Loop",
        ] {
            assert!(registry.resolve("", op, 17).is_some(), "{op} is not registered");
        }
        assert!(!registry.knows_domain("custom.ops"));
    }

    #[test]
    fn test_split_versions() {
        let registry = OperatorRegistry::with_defaults();
        assert_eq!(registry.resolved_since("", "Split", 11), Some(1));
        assert_eq!(registry.resolved_since("", "Split", 17), Some(13));
    }
}
