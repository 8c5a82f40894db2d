// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the importer.
//!
//! Operator conversions report [`OpError`]; the graph maps each variant onto
//! an [`ImportError`] according to how much context it already carries.
//! Callers branch on [`ImportError::kind`] rather than on variants.

use std::fmt;

/// A node failed an operator-specific validity check.
///
/// Carries the node's identity already, so it is propagated unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("node '{node}': {message}")]
pub struct ValidationError {
    pub node: String,
    pub message: String,
}

/// Failure reported by an operator conversion function.
#[derive(Debug, thiserror::Error)]
pub enum OpError {
    /// The node is invalid for this operator (wrong arity, bad attribute,
    /// incompatible shapes).
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Conversion failed; the graph prefixes the node identity.
    #[error("{0}")]
    Internal(String),

    /// A failure of a type the importer has no policy for.
    #[error(transparent)]
    Unknown(Box<dyn std::error::Error + Send + Sync>),
}

impl From<tensor_core::TensorError> for OpError {
    fn from(e: tensor_core::TensorError) -> Self {
        OpError::Internal(e.to_string())
    }
}

/// Coarse classification of an [`ImportError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An initializer's external data could not be resolved.
    Decode,
    /// One or more operators have no conversion.
    Unsupported,
    /// A node failed validation.
    Validation,
    /// A node conversion or graph assembly step failed.
    Internal,
    /// A failure of unrecognised type, re-raised unchanged.
    Unknown,
    /// The model could not be loaded or is structurally malformed.
    Model,
    /// The configuration is invalid.
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Decode => "decode",
            ErrorKind::Unsupported => "unsupported",
            ErrorKind::Validation => "validation",
            ErrorKind::Internal => "internal",
            ErrorKind::Unknown => "unknown",
            ErrorKind::Model => "model",
            ErrorKind::Config => "config",
        };
        f.write_str(s)
    }
}

/// Errors that can occur while importing a model.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// An initializer references external data that cannot be resolved.
    #[error("invalid external data for initializer '{name}': {detail}")]
    InvalidExternalData { name: String, detail: String },

    /// Operators that stayed unresolvable after lazy domain registration.
    /// Entries are `domain.op_type` (just `op_type` in the default domain),
    /// sorted.
    #[error("the importer does not support the following ONNX operations: {}", operators.join(", "))]
    UnsupportedOperators { operators: Vec<String> },

    /// A node failed an operator validity check.
    #[error("validation failed for {0}")]
    Validation(#[from] ValidationError),

    /// A node conversion failed.
    #[error("while converting node '{node}': {message}")]
    NodeConversion { node: String, message: String },

    /// A failure of unrecognised type, passed through untouched.
    #[error(transparent)]
    Unhandled(Box<dyn std::error::Error + Send + Sync>),

    /// A declared graph output is not produced by anything in scope.
    #[error("graph '{graph}': output '{name}' is not produced by any node")]
    MissingTensor { graph: String, name: String },

    /// Two nodes in one scope produce the same tensor name.
    #[error("tensor '{name}' produced by node '{node}' is already defined in this scope")]
    DuplicateTensor { name: String, node: String },

    /// The model failed to load or validate.
    #[error("model error: {0}")]
    Model(#[from] onnx_model::ModelError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ImportError {
    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ImportError::InvalidExternalData { .. } => ErrorKind::Decode,
            ImportError::UnsupportedOperators { .. } => ErrorKind::Unsupported,
            ImportError::Validation(_) | ImportError::DuplicateTensor { .. } => {
                ErrorKind::Validation
            }
            ImportError::NodeConversion { .. } | ImportError::MissingTensor { .. } => {
                ErrorKind::Internal
            }
            ImportError::Unhandled(_) => ErrorKind::Unknown,
            ImportError::Model(_) => ErrorKind::Model,
            ImportError::Config(_) => ErrorKind::Config,
        }
    }
}
