// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The conversion driver with a type-state–enforced pipeline.
//!
//! ```text
//! Frontend<Idle>
//!     │  .load() / .load_model()
//!     ▼
//! Frontend<Loaded> ──.decode()──▶ DecodedModel
//!     │  .convert()                   │ .convert()
//!     ▼                               ▼
//!  ConvertedModel  ◀──────────────────┘
//! ```
//!
//! A loaded frontend is immutable: every conversion builds its own arena,
//! cache and opset scope, so one `Frontend<Loaded>` can serve concurrent
//! conversions from several threads.

use crate::graph::{ConversionContext, Graph, Session};
use crate::{
    ConversionMode, ImportConfig, ImportError, OpStatistics, OperatorRegistry, OpsetScope,
    TelemetrySink,
};
use graph_ir::{Function, IrGraph, Node, NodeKind, OutputInfo};
use onnx_model::{GraphDescriptor, ModelDescriptor, ModelLoader};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

// ── Type-state markers ─────────────────────────────────────────

/// No model is loaded yet.
#[derive(Debug)]
pub struct Idle;

/// A decoded model is loaded and ready for conversion.
#[derive(Debug)]
pub struct Loaded {
    model: Arc<ModelDescriptor>,
}

/// Sealed trait for frontend states.
pub trait FrontendState: std::fmt::Debug {}
impl FrontendState for Idle {}
impl FrontendState for Loaded {}

// ── Frontend ───────────────────────────────────────────────────

/// Entry point of the importer.
///
/// # Example
/// ```no_run
/// use onnx_import::{Frontend, ImportConfig};
///
/// # fn example() -> Result<(), onnx_import::ImportError> {
/// let converted = Frontend::new(ImportConfig::default())
///     .load("model.onnx".as_ref())?
///     .convert()?;
/// println!("{}", converted.stats.summary());
/// # Ok(())
/// # }
/// ```
pub struct Frontend<S: FrontendState = Idle> {
    config: ImportConfig,
    registry: Arc<OperatorRegistry>,
    telemetry: Option<Arc<dyn TelemetrySink>>,
    state: S,
}

impl Frontend<Idle> {
    /// Creates a frontend with the built-in operator set.
    pub fn new(config: ImportConfig) -> Self {
        Self {
            config,
            registry: Arc::new(OperatorRegistry::with_defaults()),
            telemetry: None,
            state: Idle,
        }
    }

    /// Replaces the operator registry.
    pub fn with_registry(mut self, registry: Arc<OperatorRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Sets the sink operator statistics are reported to.
    pub fn with_telemetry(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = Some(sink);
        self
    }

    /// Loads a `.onnx` or `.json` model from disk.
    pub fn load(self, path: &Path) -> Result<Frontend<Loaded>, ImportError> {
        let model = ModelLoader::load(path)?;
        tracing::info!("{}", model.summary());
        Ok(self.load_model(model))
    }

    /// Uses an already decoded model.
    pub fn load_model(self, model: ModelDescriptor) -> Frontend<Loaded> {
        Frontend {
            config: self.config,
            registry: self.registry,
            telemetry: self.telemetry,
            state: Loaded {
                model: Arc::new(model),
            },
        }
    }
}

impl Frontend<Loaded> {
    pub fn model(&self) -> &ModelDescriptor {
        &self.state.model
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    pub fn registry(&self) -> &OperatorRegistry {
        &self.registry
    }

    /// Full conversion: every node goes through its operator conversion.
    pub fn convert(&self) -> Result<ConvertedModel, ImportError> {
        convert_model(
            &self.state.model,
            &self.registry,
            &self.config,
            self.telemetry.as_deref(),
            ConversionMode::Full,
        )
    }

    /// Decode-only conversion: every node becomes a framework placeholder.
    pub fn decode(&self) -> Result<DecodedModel, ImportError> {
        let decoded = convert_model(
            &self.state.model,
            &self.registry,
            &self.config,
            self.telemetry.as_deref(),
            ConversionMode::Decode,
        )?;
        Ok(DecodedModel {
            decoded,
            model: Arc::clone(&self.state.model),
            registry: Arc::clone(&self.registry),
            config: self.config.clone(),
            telemetry: self.telemetry.clone(),
        })
    }

    /// Converts in the mode the configuration asks for.
    pub fn import(&self) -> Result<Imported, ImportError> {
        match self.config.mode {
            ConversionMode::Full => self.convert().map(Imported::Converted),
            ConversionMode::Decode => self.decode().map(Imported::Decoded),
        }
    }

    /// Operators no registered conversion can handle, after enabling every
    /// domain the registry knows. Entries are `domain.op_type`, sorted.
    pub fn unsupported_operators(&self) -> Vec<String> {
        let registry = &*self.registry;
        let mut scope = initial_scope(&self.state.model, registry, &self.config);

        let mut nodes = Vec::new();
        collect_nodes(&self.state.model.graph, &mut nodes);
        for node in &nodes {
            if !scope.is_available(registry, node) {
                scope.enable_domain(&node.domain, registry);
            }
        }
        nodes
            .iter()
            .filter(|node| !scope.is_available(registry, node))
            .map(|node| node.domain_and_op())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl<S: FrontendState> std::fmt::Debug for Frontend<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frontend")
            .field("state", &self.state)
            .field("mode", &self.config.mode)
            .field("registry", &self.registry)
            .field("has_telemetry", &self.telemetry.is_some())
            .finish()
    }
}

// ── Results ────────────────────────────────────────────────────

/// The IR produced by one conversion.
#[derive(Debug, Clone)]
pub struct ConvertedModel {
    pub ir: IrGraph,
    pub function: Function,
    /// Operator counts, nested bodies included. Empty when telemetry is off.
    pub stats: OpStatistics,
}

impl ConvertedModel {
    /// Friendly names of the parameters, in order.
    pub fn parameter_names(&self) -> Vec<&str> {
        self.function
            .parameters
            .iter()
            .map(|&p| self.ir.friendly_name(p))
            .collect()
    }

    /// Friendly names of the results, in order.
    pub fn result_names(&self) -> Vec<&str> {
        self.function.results.iter().map(|r| r.name.as_str()).collect()
    }

    /// Metadata of each result, in order.
    pub fn result_infos(&self) -> Vec<&OutputInfo> {
        self.function
            .results
            .iter()
            .map(|r| self.ir.info(r.source))
            .collect()
    }

    /// Framework placeholders anywhere in the arena.
    pub fn framework_nodes(&self) -> Vec<&Node> {
        self.ir
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Framework { .. }))
            .collect()
    }

    /// Pretty JSON dump of the function and everything it reaches.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        graph_ir::serialize::to_json(&self.ir, &self.function)
    }
}

/// A decode-only conversion, still tied to the model it came from.
pub struct DecodedModel {
    decoded: ConvertedModel,
    model: Arc<ModelDescriptor>,
    registry: Arc<OperatorRegistry>,
    config: ImportConfig,
    telemetry: Option<Arc<dyn TelemetrySink>>,
}

impl DecodedModel {
    /// The placeholder graph.
    pub fn decoded(&self) -> &ConvertedModel {
        &self.decoded
    }

    /// The model the placeholders were decoded from.
    pub fn source(&self) -> &ModelDescriptor {
        &self.model
    }

    /// Runs a full conversion of the originating model.
    pub fn convert(&self) -> Result<ConvertedModel, ImportError> {
        convert_model(
            &self.model,
            &self.registry,
            &self.config,
            self.telemetry.as_deref(),
            ConversionMode::Full,
        )
    }

    pub fn into_decoded(self) -> ConvertedModel {
        self.decoded
    }
}

impl std::fmt::Debug for DecodedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedModel")
            .field("graph", &self.model.graph.name)
            .field("nodes", &self.decoded.ir.len())
            .field("placeholders", &self.decoded.framework_nodes().len())
            .finish()
    }
}

/// Output of [`Frontend::import`].
#[derive(Debug)]
pub enum Imported {
    Converted(ConvertedModel),
    Decoded(DecodedModel),
}

// ── Driver ─────────────────────────────────────────────────────

/// Converts `model` end to end.
///
/// Operator statistics are handed to `telemetry` once, whether or not the
/// conversion succeeded.
fn convert_model(
    model: &ModelDescriptor,
    registry: &OperatorRegistry,
    config: &ImportConfig,
    telemetry: Option<&dyn TelemetrySink>,
    mode: ConversionMode,
) -> Result<ConvertedModel, ImportError> {
    model.validate()?;
    let base_dir = config.resolve_base_dir(model.base_dir.as_deref());
    let opset = initial_scope(model, registry, config);
    let session = Session {
        registry,
        config,
        base_dir: &base_dir,
        mode,
    };

    tracing::info!("converting graph '{}' ({mode:?})", model.graph.name);
    let mut ctx = ConversionContext::new(config.telemetry);
    let result = Graph::root(&model.graph, session, opset, &ctx.ir).convert(&mut ctx);
    if config.telemetry {
        ctx.stats.report(telemetry);
    }
    let function = result?;

    tracing::info!(
        "graph '{}' converted: {} IR node(s), {} parameter(s), {} result(s)",
        model.graph.name,
        ctx.ir.len(),
        function.parameters.len(),
        function.results.len(),
    );
    Ok(ConvertedModel {
        ir: ctx.ir,
        function,
        stats: ctx.stats,
    })
}

/// Opset scope from the model imports plus configured extra domains.
fn initial_scope(model: &ModelDescriptor, registry: &OperatorRegistry, config: &ImportConfig) -> OpsetScope {
    let mut scope = OpsetScope::from_imports(&model.opset_imports, registry);
    for domain in &config.enable_domains {
        scope.enable_domain(domain, registry);
    }
    scope
}

fn collect_nodes<'g>(graph: &'g GraphDescriptor, out: &mut Vec<&'g onnx_model::NodeDescriptor>) {
    for node in &graph.nodes {
        out.push(node);
        for (_, body) in node.subgraphs() {
            collect_nodes(body, out);
        }
    }
}
