// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Operator usage statistics and the telemetry sink they are reported to.
//!
//! [`OpStatistics`] is an explicit accumulator threaded through one
//! conversion. It is handed to a [`TelemetrySink`] once, when the
//! conversion ends; a missing sink means nothing is sent.

use std::collections::BTreeMap;

/// Event category used for operator counts.
pub const OP_COUNT_CATEGORY: &str = "op_count";

/// Occurrence count per operator type, nested bodies included.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct OpStatistics {
    counts: BTreeMap<String, u64>,
}

impl OpStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one occurrence of `op_type`.
    pub fn record(&mut self, op_type: &str) {
        *self.counts.entry(op_type.to_string()).or_insert(0) += 1;
    }

    pub fn get(&self, op_type: &str) -> u64 {
        self.counts.get(op_type).copied().unwrap_or(0)
    }

    /// Iterates `(op_type, count)` in operator order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Total number of recorded nodes.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sends one `op_count` event per operator type to `sink`.
    pub fn report(&self, sink: Option<&dyn TelemetrySink>) {
        let Some(sink) = sink else {
            return;
        };
        for (op, count) in self.iter() {
            sink.send_event(OP_COUNT_CATEGORY, &format!("onnx_{op}"), count);
        }
    }

    /// Returns a human-readable summary suitable for CLI output.
    pub fn summary(&self) -> String {
        let parts: Vec<String> = self.iter().map(|(op, n)| format!("{op}×{n}")).collect();
        format!(
            "{} nodes, {} operator types: {}",
            self.total(),
            self.counts.len(),
            parts.join(" "),
        )
    }
}

/// Receiver of telemetry events.
pub trait TelemetrySink: Send + Sync {
    fn send_event(&self, category: &str, action: &str, value: u64);
}

/// Sink that emits each event as an `info`-level tracing event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetry;

impl TelemetrySink for TracingTelemetry {
    fn send_event(&self, category: &str, action: &str, value: u64) {
        tracing::info!(category, action, value, "telemetry event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(String, String, u64)>>);

    impl TelemetrySink for Recorder {
        fn send_event(&self, category: &str, action: &str, value: u64) {
            if let Ok(mut events) = self.0.lock() {
                events.push((category.into(), action.into(), value));
            }
        }
    }

    #[test]
    fn test_record_and_total() {
        let mut s = OpStatistics::new();
        assert!(s.is_empty());
        s.record("Add");
        s.record("Add");
        s.record("Relu");
        assert_eq!(s.get("Add"), 2);
        assert_eq!(s.get("Conv"), 0);
        assert_eq!(s.total(), 3);
    }

    #[test]
    fn test_report_one_event_per_operator() {
        let mut s = OpStatistics::new();
        s.record("Relu");
        s.record("Add");
        s.record("Relu");

        let sink = Recorder::default();
        s.report(Some(&sink));
        let events = sink.0.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                ("op_count".to_string(), "onnx_Add".to_string(), 1),
                ("op_count".to_string(), "onnx_Relu".to_string(), 2),
            ]
        );
    }

    #[test]
    fn test_report_without_sink() {
        let mut s = OpStatistics::new();
        s.record("Add");
        s.report(None);
    }

    #[test]
    fn test_summary_format() {
        let mut s = OpStatistics::new();
        s.record("Add");
        let text = s.summary();
        assert!(text.contains("1 nodes"));
        assert!(text.contains("Add×1"));
    }
}
