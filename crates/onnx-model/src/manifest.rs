// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! JSON model format.
//!
//! The descriptor types serialise directly with serde, which gives a
//! readable model format for fixtures and hand-written test models.
//!
//! # Format
//! ```json
//! {
//!   "opset_imports": { "": 17 },
//!   "graph": {
//!     "name": "add",
//!     "initializers": [
//!       { "name": "b", "elem_type": 1, "dims": [2], "data": { "floats": [1.0, 2.0] } }
//!     ],
//!     "inputs":  [ { "name": "a", "elem_type": "f32", "shape": { "ranked": [ { "fixed": 2 } ] } } ],
//!     "nodes":   [ { "op_type": "Add", "inputs": ["a", "b"], "outputs": ["c"] } ],
//!     "outputs": [ { "name": "c" } ]
//!   }
//! }
//! ```

use crate::{ModelDescriptor, ModelError};
use std::path::Path;

impl ModelDescriptor {
    /// Parses a model from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let model: Self = serde_json::from_str(json)?;
        Ok(model)
    }

    /// Loads a model from a JSON file.
    ///
    /// The external-data base directory is set to the file's directory.
    pub fn from_json_file(path: &Path) -> Result<Self, ModelError> {
        let content = std::fs::read_to_string(path)?;
        let mut model = Self::from_json(&content)?;
        model.base_dir = path.parent().map(Path::to_path_buf);
        Ok(model)
    }

    /// Serialises the model to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
