// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # onnx-import
//!
//! Command-line interface for the ONNX graph importer.
//!
//! ## Usage
//! ```bash
//! # Summarise a model and list operators without a conversion
//! onnx-import inspect --model ./models/resnet18.onnx
//!
//! # Convert several models concurrently, writing the IR as JSON
//! onnx-import convert --model a.onnx --model b.onnx --output ./ir --timeout-secs 30
//!
//! # Decode-only import: every node becomes a placeholder
//! onnx-import decode --model ./models/custom.onnx
//!
//! # List the registered operator conversions
//! onnx-import ops
//! ```

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "onnx-import",
    about = "Import ONNX models into the graph IR",
    version,
    author
)]
struct Cli {
    /// Path to a TOML import configuration (flags below override it).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory external tensor data is resolved against.
    #[arg(long, global = true)]
    external_data_dir: Option<PathBuf>,

    /// Enable an operator domain before the availability scan (repeatable).
    #[arg(long = "enable-domain", global = true)]
    enable_domains: Vec<String>,

    /// Do not collect operator statistics.
    #[arg(long, global = true)]
    no_telemetry: bool,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarise a model: inputs, outputs, initializers, operators.
    Inspect {
        /// Path to a `.onnx` or `.json` model.
        #[arg(short, long)]
        model: PathBuf,
    },

    /// Fully convert one or more models.
    Convert {
        /// Model paths; several are converted concurrently.
        #[arg(short, long, required = true, num_args = 1..)]
        model: Vec<PathBuf>,

        /// Write the IR as JSON: a file for one model, a directory for several.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Give up on a conversion after this many seconds.
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Decode-only import: map every node to a placeholder.
    Decode {
        /// Path to a `.onnx` or `.json` model.
        #[arg(short, long)]
        model: PathBuf,
    },

    /// List registered operator conversions.
    Ops {
        /// Only show this domain ("" for the default domain).
        #[arg(short, long)]
        domain: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);

    let overrides = commands::Overrides {
        external_data_dir: cli.external_data_dir,
        enable_domains: cli.enable_domains,
        no_telemetry: cli.no_telemetry,
    };
    let config = commands::load_config(cli.config.as_deref(), overrides)?;

    match cli.command {
        Commands::Inspect { model } => commands::inspect::execute(model, config).await,
        Commands::Convert {
            model,
            output,
            timeout_secs,
        } => commands::convert::execute(model, output, timeout_secs, config).await,
        Commands::Decode { model } => commands::decode::execute(model, config).await,
        Commands::Ops { domain } => commands::ops::execute(domain).await,
    }
}
