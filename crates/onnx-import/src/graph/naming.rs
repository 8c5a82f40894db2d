// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Friendly names and binding names for converted node outputs.

use super::{ConversionContext, Graph};
use graph_ir::Output;
use onnx_model::{normalize_domain, NodeDescriptor};

impl<'a> Graph<'a> {
    /// Names the IR nodes behind `outputs` after the model node.
    ///
    /// - `Identity` only adds its output names to the value it passes on.
    /// - An unnamed node: each producer takes the name of its output. When
    ///   several outputs share one producer, the last output's name is the
    ///   one that sticks.
    /// - A named node whose outputs share one producer: the producer takes
    ///   the node name.
    /// - A named node with distinct producers: each takes
    ///   `<node name>_<output name>`.
    ///
    /// Every named, non-null output also gets its output name as a binding
    /// name. Empty (omitted) outputs are skipped. Parameters and values from
    /// an enclosing scope keep their friendly names.
    pub(super) fn set_friendly_names(
        &self,
        node: &NodeDescriptor,
        outputs: &[Output],
        ctx: &mut ConversionContext,
    ) {
        let named = node.outputs.iter().zip(outputs).filter(|(name, _)| !name.is_empty());

        if node.op_type == "Identity" && normalize_domain(&node.domain).is_empty() {
            for (name, &output) in named {
                if self.owns(output) {
                    ctx.ir.add_names(output, [name.clone()]);
                }
            }
            return;
        }

        let declared = outputs.len().min(node.outputs.len());
        let common = outputs[..declared]
            .windows(2)
            .all(|pair| pair[0].node == pair[1].node);

        for (name, &output) in named {
            if !self.owns(output) || ctx.ir.is_null(output) {
                continue;
            }
            if !ctx.ir.node(output.node).is_parameter() {
                let friendly = if node.name.is_empty() {
                    name.clone()
                } else if common {
                    node.name.clone()
                } else {
                    format!("{}_{name}", node.name)
                };
                ctx.ir.set_friendly_name(output.node, friendly);
            }
            ctx.ir.add_names(output, [name.clone()]);
        }
    }

    /// `true` if `output` was created in this scope.
    fn owns(&self, output: Output) -> bool {
        output.node >= self.first_node
    }
}
