//! Metrics sink used by the top-level operations.
//!
//! Each operation reports exactly once, with a flat JSON object of timing
//! and size figures.

use std::sync::Mutex;

use serde_json::{Map, Value};

pub trait MetricsSink: Send + Sync {
    fn record_metric(&self, name: &str, data: &Map<String, Value>);
}

/// Default sink: writes metrics to the `log` facade.
#[derive(Debug, Default)]
pub struct LogMetrics;

impl MetricsSink for LogMetrics {
    fn record_metric(&self, name: &str, data: &Map<String, Value>) {
        log::info!(target: "stylecut::metrics", "{} {}", name, Value::Object(data.clone()));
    }
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn record_metric(&self, _name: &str, _data: &Map<String, Value>) {}
}

/// Keeps every recorded metric in memory, in call order.
#[derive(Debug, Default)]
pub struct MemoryMetrics {
    records: Mutex<Vec<(String, Map<String, Value>)>>,
}

impl MemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<(String, Map<String, Value>)> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl MetricsSink for MemoryMetrics {
    fn record_metric(&self, name: &str, data: &Map<String, Value>) {
        let mut records = match self.records.lock() {
            Ok(records) => records,
            Err(poisoned) => poisoned.into_inner(),
        };
        records.push((name.to_string(), data.clone()));
    }
}

/// Round to two decimals, the precision every reported percentage uses.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
