// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Importer configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! mode = "full"
//! external_data_dir = "./weights"
//! telemetry = true
//! enable_domains = ["custom.ops"]
//! reject_duplicate_outputs = true
//! ```

use crate::ImportError;
use std::path::{Path, PathBuf};

/// What the importer produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionMode {
    /// Every node is dispatched to its operator conversion.
    #[default]
    Full,
    /// Every node becomes an opaque framework placeholder.
    Decode,
}

/// Configuration for one import.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub mode: ConversionMode,
    /// Directory external tensor data is resolved against. Defaults to the
    /// model file's directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_data_dir: Option<PathBuf>,
    /// Collect operator statistics and hand them to the telemetry sink.
    pub telemetry: bool,
    /// Domains enabled at their latest registered version before the
    /// availability scan, whether or not the model imports them.
    pub enable_domains: Vec<String>,
    /// Fail when a node output reuses a tensor name already defined in the
    /// same scope, instead of overwriting it.
    pub reject_duplicate_outputs: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            mode: ConversionMode::Full,
            external_data_dir: None,
            telemetry: true,
            enable_domains: Vec::new(),
            reject_duplicate_outputs: true,
        }
    }
}

impl ImportConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ImportError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ImportError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ImportError> {
        toml::from_str(toml_str)
            .map_err(|e| ImportError::Config(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, ImportError> {
        toml::to_string_pretty(self)
            .map_err(|e| ImportError::Config(format!("TOML serialise error: {e}")))
    }

    /// Resolves the external-data base directory: the configured directory,
    /// else the model's own directory, else the working directory.
    pub fn resolve_base_dir(&self, model_dir: Option<&Path>) -> PathBuf {
        self.external_data_dir
            .clone()
            .or_else(|| model_dir.map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
