// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Operator registry and per-conversion opset scope.
//!
//! The registry maps `(domain, op_type, since_version)` to a conversion
//! function. It is built once, is immutable afterwards, and can be shared
//! between concurrent conversions behind an `Arc`.
//!
//! Which domains are usable, and at which version, is *per conversion*
//! state: an [`OpsetScope`] starts from the model's opset imports and grows
//! when the availability scan enables a domain the model did not import.

use crate::{NodeContext, OpError};
use graph_ir::Output;
use onnx_model::{normalize_domain, NodeDescriptor, OpsetImports};
use std::collections::BTreeMap;

/// Converts one decoded node into IR outputs, one per declared node output.
pub type ConvertFn = fn(&mut NodeContext<'_>) -> Result<Vec<Output>, OpError>;

type VersionTable = BTreeMap<i64, ConvertFn>;

/// Immutable table of operator conversions.
#[derive(Clone, Default)]
pub struct OperatorRegistry {
    domains: BTreeMap<String, BTreeMap<String, VersionTable>>,
}

impl std::fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorRegistry")
            .field("domains", &self.domains.keys().collect::<Vec<_>>())
            .field("entries", &self.len())
            .finish()
    }
}

impl OperatorRegistry {
    /// Starts an empty registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Starts from the built-in operator set; add custom domains on top.
    pub fn builder_with_defaults() -> RegistryBuilder {
        crate::ops::register_defaults(Self::builder())
    }

    /// Registry with the built-in operator set.
    pub fn with_defaults() -> Self {
        Self::builder_with_defaults().build()
    }

    /// Returns `true` if any operator is registered in `domain`.
    pub fn knows_domain(&self, domain: &str) -> bool {
        self.domains.contains_key(normalize_domain(domain))
    }

    /// Highest `since_version` registered in `domain`.
    pub fn latest_version(&self, domain: &str) -> Option<i64> {
        self.domains
            .get(normalize_domain(domain))?
            .values()
            .filter_map(|versions| versions.keys().next_back().copied())
            .max()
    }

    /// Resolves an operator for an imported domain version: the entry with
    /// the highest `since_version` not above `version`.
    pub fn resolve(&self, domain: &str, op_type: &str, version: i64) -> Option<ConvertFn> {
        self.lookup(domain, op_type, version).map(|(_, f)| f)
    }

    /// The `since_version` [`resolve`](Self::resolve) would pick.
    pub fn resolved_since(&self, domain: &str, op_type: &str, version: i64) -> Option<i64> {
        self.lookup(domain, op_type, version).map(|(since, _)| since)
    }

    fn lookup(&self, domain: &str, op_type: &str, version: i64) -> Option<(i64, ConvertFn)> {
        self.domains
            .get(normalize_domain(domain))?
            .get(op_type)?
            .range(..=version)
            .next_back()
            .map(|(since, f)| (*since, *f))
    }

    /// Every `(domain, op_type, since_version)` entry, sorted.
    pub fn entries(&self) -> Vec<(&str, &str, i64)> {
        self.domains
            .iter()
            .flat_map(|(domain, ops)| {
                ops.iter().flat_map(move |(op, versions)| {
                    versions
                        .keys()
                        .map(move |v| (domain.as_str(), op.as_str(), *v))
                })
            })
            .collect()
    }

    /// Number of registered `(domain, op_type, since_version)` entries.
    pub fn len(&self) -> usize {
        self.domains
            .values()
            .flat_map(|ops| ops.values())
            .map(|versions| versions.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

/// Collects registrations, then freezes them into an [`OperatorRegistry`].
#[derive(Default)]
pub struct RegistryBuilder {
    domains: BTreeMap<String, BTreeMap<String, VersionTable>>,
}

impl RegistryBuilder {
    /// Registers `f` for `op_type` in `domain` from opset `since_version` on.
    /// Registering the same triple twice keeps the later function.
    pub fn register(
        mut self,
        domain: &str,
        op_type: &str,
        since_version: i64,
        f: ConvertFn,
    ) -> Self {
        self.domains
            .entry(normalize_domain(domain).to_string())
            .or_default()
            .entry(op_type.to_string())
            .or_default()
            .insert(since_version, f);
        self
    }

    pub fn build(self) -> OperatorRegistry {
        OperatorRegistry {
            domains: self.domains,
        }
    }
}

// ── OpsetScope ─────────────────────────────────────────────────────

/// Domain versions usable by one conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpsetScope {
    versions: BTreeMap<String, i64>,
}

impl OpsetScope {
    /// Builds the scope from a model's opset imports.
    ///
    /// A model with no imports gets the default domain at the latest
    /// version the registry knows.
    pub fn from_imports(imports: &OpsetImports, registry: &OperatorRegistry) -> Self {
        let mut versions: BTreeMap<String, i64> = imports
            .iter()
            .map(|(d, v)| (d.to_string(), v))
            .collect();
        if versions.is_empty() {
            if let Some(latest) = registry.latest_version("") {
                versions.insert(String::new(), latest);
            }
        }
        Self { versions }
    }

    /// Version of `domain` in this scope.
    pub fn version(&self, domain: &str) -> Option<i64> {
        self.versions.get(normalize_domain(domain)).copied()
    }

    /// Enables a domain the model did not import, at the latest version
    /// the registry has for it.
    ///
    /// Returns `true` if the domain was newly enabled. An already enabled
    /// domain is left at its version; a domain the registry knows nothing
    /// about is not enabled.
    pub fn enable_domain(&mut self, domain: &str, registry: &OperatorRegistry) -> bool {
        let domain = normalize_domain(domain);
        if self.versions.contains_key(domain) {
            return false;
        }
        match registry.latest_version(domain) {
            Some(version) => {
                tracing::info!("enabling operator domain '{domain}' at version {version}");
                self.versions.insert(domain.to_string(), version);
                true
            }
            None => {
                tracing::warn!("operator domain '{domain}' is not recognised by the registry");
                false
            }
        }
    }

    /// Resolves the conversion for `node` in this scope.
    pub fn resolve(&self, registry: &OperatorRegistry, node: &NodeDescriptor) -> Option<ConvertFn> {
        let version = self.version(&node.domain)?;
        registry.resolve(&node.domain, &node.op_type, version)
    }

    pub fn is_available(&self, registry: &OperatorRegistry, node: &NodeDescriptor) -> bool {
        self.resolve(registry, node).is_some()
    }
}
