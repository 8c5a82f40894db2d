// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `onnx-import ops` command: list the built-in operator conversions.

use super::banner;
use onnx_import::OperatorRegistry;
use onnx_model::normalize_domain;

pub async fn execute(domain: Option<String>) -> anyhow::Result<()> {
    banner("Operator Registry");

    let registry = OperatorRegistry::with_defaults();
    let filter = domain.as_deref().map(normalize_domain);

    println!("  {:<20} {:<20} {:>6}", "Domain", "Operator", "Since");
    println!("  {}", "-".repeat(48));
    let mut shown = 0usize;
    for (d, op, since) in registry.entries() {
        if filter.map_or(false, |f| f != d) {
            continue;
        }
        let d = if d.is_empty() { "ai.onnx" } else { d };
        println!("  {:<20} {:<20} {:>6}", d, op, since);
        shown += 1;
    }
    println!();
    println!("  {shown} of {} registration(s)", registry.len());
    Ok(())
}
