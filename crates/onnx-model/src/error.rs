// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for model loading and structural validation.

/// Errors that can occur when loading or validating a model description.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The model file could not be read.
    #[error("failed to read model: {0}")]
    Io(#[from] std::io::Error),

    /// The JSON model description is malformed.
    #[error("failed to parse model JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The ONNX protobuf payload is malformed.
    #[error("failed to decode ONNX protobuf: {0}")]
    Protobuf(#[from] prost::DecodeError),

    /// The model has no `graph` field.
    #[error("model contains no graph")]
    MissingGraph,

    /// The file extension is not one the loader understands.
    #[error("unsupported model format '{path}': expected .onnx or .json")]
    UnsupportedFormat { path: String },

    /// A node definition is invalid.
    #[error("invalid node '{node}': {detail}")]
    InvalidNode { node: String, detail: String },

    /// The graph is structurally malformed.
    #[error("invalid model graph: {0}")]
    InvalidGraph(String),
}
