// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `onnx-import inspect` command: describe a model without converting it.
//!
//! Prints the graph interface, initializers, the operator histogram (nested
//! bodies included) and the operators the registry cannot resolve.

use super::{banner, truncate};
use onnx_import::{Frontend, ImportConfig};
use onnx_model::ValueInfo;
use std::path::PathBuf;

pub async fn execute(model: PathBuf, config: ImportConfig) -> anyhow::Result<()> {
    banner("Model Inspector");

    let frontend = Frontend::new(config).load(&model).map_err(|e| {
        anyhow::anyhow!("failed to load model from '{}': {e}", model.display())
    })?;
    let descriptor = frontend.model();
    let graph = &descriptor.graph;

    // ── Summary ────────────────────────────────────────────────
    println!("  {}", descriptor.summary());
    let imports: Vec<String> = descriptor
        .opset_imports
        .iter()
        .map(|(domain, version)| {
            let domain = if domain.is_empty() { "ai.onnx" } else { domain };
            format!("{domain}:{version}")
        })
        .collect();
    println!("  Opsets: {}", imports.join(", "));
    println!();

    // ── Interface ──────────────────────────────────────────────
    print_values("Inputs", &graph.inputs);
    print_values("Outputs", &graph.outputs);

    println!("  Initializers ({})", graph.initializers.len());
    for init in &graph.initializers {
        let dtype = init
            .dtype()
            .map(|d| d.to_string())
            .unwrap_or_else(|| format!("code {}", init.elem_type));
        let location = if init.is_external() { "external" } else { "inline" };
        println!(
            "   {:<36} {:<8} {:<16} {location}",
            truncate(&init.name, 36),
            dtype,
            format!("{:?}", init.dims),
        );
    }
    println!();

    // ── Operators ──────────────────────────────────────────────
    println!("  {:<36} {:>6}", "Operator", "Count");
    println!("  {}", "-".repeat(43));
    for (op, count) in descriptor.op_histogram() {
        println!("  {:<36} {:>6}", truncate(&op, 36), count);
    }
    println!();

    let unsupported = frontend.unsupported_operators();
    if unsupported.is_empty() {
        println!("  All operators have a conversion.");
    } else {
        println!("  No conversion for: {}", unsupported.join(", "));
    }
    println!();
    Ok(())
}

fn print_values(title: &str, values: &[ValueInfo]) {
    println!("  {title} ({})", values.len());
    for value in values {
        let dtype = value
            .elem_type
            .map(|d| d.to_string())
            .unwrap_or_else(|| "?".to_string());
        println!("   {:<36} {:<8} {}", truncate(&value.name, 36), dtype, value.shape);
    }
    println!();
}
