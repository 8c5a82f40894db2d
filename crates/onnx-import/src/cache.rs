// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Scope-local tensor-name → IR output table.

use graph_ir::Output;
use std::collections::HashMap;

/// Maps each tensor name produced in one scope to the IR output carrying it.
///
/// Lookups into enclosing scopes are the graph's business; a cache only
/// knows its own entries.
#[derive(Debug, Clone, Default)]
pub struct GraphCache {
    entries: HashMap<String, Output>,
}

impl GraphCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Returns the output cached under `name`.
    ///
    /// # Panics
    /// Panics if `name` is not cached. Callers check [`contains`](Self::contains)
    /// first; a miss here is a bug in the importer, not a model error.
    pub fn get(&self, name: &str) -> Output {
        match self.entries.get(name) {
            Some(output) => *output,
            None => panic!("tensor '{name}' is not in the graph cache"),
        }
    }

    /// Non-panicking lookup.
    pub fn try_get(&self, name: &str) -> Option<Output> {
        self.entries.get(name).copied()
    }

    /// Inserts or overwrites `name`, returning the previous output.
    pub fn emplace(&mut self, name: impl Into<String>, output: Output) -> Option<Output> {
        self.entries.insert(name.into(), output)
    }

    pub fn remove(&mut self, name: &str) -> Option<Output> {
        self.entries.remove(name)
    }

    /// Points every entry that holds `old` at `new`; returns the moved
    /// names in sorted order.
    pub fn rebind(&mut self, old: Output, new: Output) -> Vec<String> {
        let mut moved = Vec::new();
        for (name, value) in self.entries.iter_mut().filter(|(_, v)| **v == old) {
            *value = new;
            moved.push(name.clone());
        }
        moved.sort();
        moved
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
