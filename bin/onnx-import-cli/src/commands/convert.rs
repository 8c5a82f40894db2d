// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `onnx-import convert` command: full conversion of one or more models.
//!
//! Each model is loaded and converted on its own blocking worker with its
//! own conversion state; the shared registry is only read. A conversion
//! that exceeds `--timeout-secs` counts as a decode failure.

use super::{banner, truncate};
use onnx_import::{ConvertedModel, ErrorKind, Frontend, ImportConfig, ImportError, OperatorRegistry};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How one model's conversion ended.
enum Outcome {
    Converted(ConvertedModel),
    Failed { kind: ErrorKind, message: String },
}

struct Report {
    model: PathBuf,
    outcome: Outcome,
    elapsed: Duration,
}

pub async fn execute(
    models: Vec<PathBuf>,
    output: Option<PathBuf>,
    timeout_secs: Option<u64>,
    config: ImportConfig,
) -> anyhow::Result<()> {
    banner("Converter");

    let registry = Arc::new(OperatorRegistry::with_defaults());
    let timeout = timeout_secs.map(Duration::from_secs);

    println!("  Models:   {}", models.len());
    println!("  Mode:     full");
    if let Some(t) = timeout {
        println!("  Timeout:  {}s per model", t.as_secs());
    }
    println!();

    let tasks: Vec<_> = models
        .into_iter()
        .map(|model| {
            let registry = Arc::clone(&registry);
            let config = config.clone();
            tokio::spawn(async move { convert_one(model, registry, config, timeout).await })
        })
        .collect();

    let mut reports = Vec::with_capacity(tasks.len());
    for task in tasks {
        reports.push(task.await?);
    }

    // ── Results Table ──────────────────────────────────────────
    println!(
        "  {:<36} {:>8} {:>8} {:>8} {:>10}",
        "Model", "Nodes", "Params", "Results", "Time",
    );
    println!("  {}", "-".repeat(74));
    let mut failures = 0usize;
    for report in &reports {
        let name = truncate(&report.model.display().to_string(), 36);
        let ms = report.elapsed.as_secs_f64() * 1000.0;
        match &report.outcome {
            Outcome::Converted(m) => println!(
                "  {:<36} {:>8} {:>8} {:>8} {:>8.1}ms",
                name,
                m.ir.len(),
                m.function.parameters.len(),
                m.function.results.len(),
                ms,
            ),
            Outcome::Failed { kind, message } => {
                failures += 1;
                println!("  {:<36} {kind} failure after {ms:.1}ms", name);
                println!("    {message}");
            }
        }
    }
    println!();

    if let Some(output) = output {
        write_outputs(&reports, &output)?;
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} conversion(s) failed", reports.len());
    }
    Ok(())
}

async fn convert_one(
    model: PathBuf,
    registry: Arc<OperatorRegistry>,
    config: ImportConfig,
    timeout: Option<Duration>,
) -> Report {
    let start = Instant::now();
    let path = model.clone();
    let work = tokio::task::spawn_blocking(move || -> Result<ConvertedModel, ImportError> {
        Frontend::new(config)
            .with_registry(registry)
            .load(&path)?
            .convert()
    });

    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, work).await {
            Ok(joined) => joined,
            Err(_) => {
                tracing::warn!("conversion of '{}' exceeded {limit:?}", model.display());
                return Report {
                    model,
                    outcome: Outcome::Failed {
                        kind: ErrorKind::Decode,
                        message: format!("conversion exceeded {}s", limit.as_secs()),
                    },
                    elapsed: start.elapsed(),
                };
            }
        },
        None => work.await,
    };

    let outcome = match joined {
        Ok(Ok(converted)) => {
            tracing::info!("converted '{}': {}", model.display(), converted.stats.summary());
            Outcome::Converted(converted)
        }
        Ok(Err(e)) => Outcome::Failed {
            kind: e.kind(),
            message: e.to_string(),
        },
        Err(e) => Outcome::Failed {
            kind: ErrorKind::Unknown,
            message: format!("conversion task failed: {e}"),
        },
    };
    Report {
        model,
        outcome,
        elapsed: start.elapsed(),
    }
}

/// Writes each converted model's IR as JSON.
///
/// A single model goes to `output` itself; several go to
/// `output/<file stem>.ir.json`.
fn write_outputs(reports: &[Report], output: &Path) -> anyhow::Result<()> {
    let converted: Vec<(&Path, &ConvertedModel)> = reports
        .iter()
        .filter_map(|r| match &r.outcome {
            Outcome::Converted(m) => Some((r.model.as_path(), m)),
            Outcome::Failed { .. } => None,
        })
        .collect();

    if reports.len() == 1 {
        if let Some((_, m)) = converted.first() {
            std::fs::write(output, m.to_json()?)?;
            println!("  Wrote {}", output.display());
        }
        return Ok(());
    }

    std::fs::create_dir_all(output)?;
    for (model, m) in converted {
        let stem = model
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());
        let path = output.join(format!("{stem}.ir.json"));
        std::fs::write(&path, m.to_json()?)?;
        println!("  Wrote {}", path.display());
    }
    Ok(())
}
