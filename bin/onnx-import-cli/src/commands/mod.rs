// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subcommands and the setup they share.

pub mod convert;
pub mod decode;
pub mod inspect;
pub mod ops;

use onnx_import::ImportConfig;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG` wins over `-v`.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub external_data_dir: Option<PathBuf>,
    pub enable_domains: Vec<String>,
    pub no_telemetry: bool,
}

/// Reads the config file, if any, then applies `overrides`.
pub fn load_config(path: Option<&Path>, overrides: Overrides) -> anyhow::Result<ImportConfig> {
    let mut config = match path {
        Some(path) => ImportConfig::from_file(path)?,
        None => ImportConfig::default(),
    };
    if overrides.external_data_dir.is_some() {
        config.external_data_dir = overrides.external_data_dir;
    }
    for domain in overrides.enable_domains {
        if !config.enable_domains.contains(&domain) {
            config.enable_domains.push(domain);
        }
    }
    if overrides.no_telemetry {
        config.telemetry = false;
    }
    tracing::debug!(?config, "import configuration");
    Ok(config)
}

/// Prints the banner every command opens with.
pub fn banner(title: &str) {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║  {:<52}║", format!("onnx-import · {title}"));
    println!("╚══════════════════════════════════════════════════════╝");
    println!();
}

/// Truncates a string to `max_len` characters with an ellipsis.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply() {
        let overrides = Overrides {
            external_data_dir: Some(PathBuf::from("/data")),
            enable_domains: vec!["custom.ops".into(), "custom.ops".into()],
            no_telemetry: true,
        };
        let config = load_config(None, overrides).unwrap();
        assert_eq!(config.external_data_dir, Some(PathBuf::from("/data")));
        assert_eq!(config.enable_domains, vec!["custom.ops".to_string()]);
        assert!(!config.telemetry);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a_rather_long_node_name", 10), "a_rathe...");
    }
}
