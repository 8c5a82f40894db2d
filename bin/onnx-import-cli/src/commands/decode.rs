// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `onnx-import decode` command: decode-only import.
//!
//! Every node becomes a framework placeholder, so models with operators
//! that have no conversion can still be examined.

use super::{banner, truncate};
use graph_ir::NodeKind;
use onnx_import::{Frontend, ImportConfig};
use std::path::PathBuf;

pub async fn execute(model: PathBuf, config: ImportConfig) -> anyhow::Result<()> {
    banner("Decoder");

    let frontend = Frontend::new(config).load(&model).map_err(|e| {
        anyhow::anyhow!("failed to load model from '{}': {e}", model.display())
    })?;
    let decoded = frontend.decode()?;
    let ir = decoded.decoded();

    println!("  {}", decoded.source().summary());
    println!(
        "  IR nodes: {}  parameters: {}  results: {}",
        ir.ir.len(),
        ir.function.parameters.len(),
        ir.function.results.len(),
    );
    println!();

    // ── Placeholders ───────────────────────────────────────────
    println!(
        "  {:<6} {:<28} {:<24} {:>4} {:>4} {:>6}",
        "Id", "Name", "Operator", "In", "Out", "Bodies",
    );
    println!("  {}", "-".repeat(78));
    for node in ir.framework_nodes() {
        let NodeKind::Framework {
            domain,
            op_type,
            bodies,
            ..
        } = &node.kind
        else {
            continue;
        };
        let op = if domain.is_empty() {
            op_type.clone()
        } else {
            format!("{domain}.{op_type}")
        };
        println!(
            "  {:<6} {:<28} {:<24} {:>4} {:>4} {:>6}",
            node.id.to_string(),
            truncate(&node.friendly_name, 28),
            truncate(&op, 24),
            node.inputs.len(),
            node.outputs.len(),
            bodies.len(),
        );
    }
    println!();

    let unsupported = frontend.unsupported_operators();
    if !unsupported.is_empty() {
        println!("  Full conversion would fail on: {}", unsupported.join(", "));
        println!();
    }
    Ok(())
}
