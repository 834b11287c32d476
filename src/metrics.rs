//! Metrics collection and reporting for ingestion runs.
//!
//! A [`MetricsCollector`] holds named metrics plus a start/end clock. A
//! finished load records its counters with
//! [`LoadSummary::record_into`](crate::load::LoadSummary::record_into); the
//! collector can then print them or save them as JSON.
//!
//! # Example
//!
//! ```no_run
//! use yearload::metrics::{CounterMetric, MetricsCollector};
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut metrics = MetricsCollector::new();
//! metrics.record_start();
//! metrics.register(Box::new(CounterMetric::with_value("rows_loaded", 42)));
//! metrics.increment_counter("rows_malformed", 1);
//! metrics.record_end();
//!
//! metrics.print();
//! metrics.save_to_file("metrics.json")?;
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// A named metric with a JSON value.
pub trait Metric: Send + Sync {
    /// The name of this metric (e.g. `rows_loaded`).
    fn name(&self) -> &str;

    /// The current value of this metric as a JSON value.
    fn value(&self) -> Value;

    /// Optional description of what this metric measures.
    fn description(&self) -> Option<&str> {
        None
    }

    /// Counter value, if this metric is a counter.
    fn as_counter(&self) -> Option<u64> {
        None
    }
}

/// Thread-safe container for run metrics. Clones share state.
#[derive(Clone, Default)]
pub struct MetricsCollector {
    registry: Arc<Mutex<Registry>>,
}

#[derive(Default)]
struct Registry {
    metrics: HashMap<String, Box<dyn Metric>>,
    started: Option<Instant>,
    stopped: Option<Instant>,
}

impl MetricsCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        // Metrics are advisory; a poisoned lock still holds usable numbers.
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a metric, replacing any metric of the same name.
    pub fn register(&mut self, metric: Box<dyn Metric>) {
        self.registry().metrics.insert(metric.name().to_string(), metric);
    }

    /// Register multiple metrics at once.
    pub fn register_all(&mut self, metrics: Vec<Box<dyn Metric>>) {
        for metric in metrics {
            self.register(metric);
        }
    }

    pub fn record_start(&self) {
        self.registry().started = Some(Instant::now());
    }

    pub fn record_end(&self) {
        self.registry().stopped = Some(Instant::now());
    }

    /// Time between [`record_start`](Self::record_start) and
    /// [`record_end`](Self::record_end), if both were called.
    #[must_use]
    pub fn elapsed(&self) -> Option<Duration> {
        let reg = self.registry();
        match (reg.started, reg.stopped) {
            (Some(start), Some(end)) => Some(end.duration_since(start)),
            _ => None,
        }
    }

    /// Add `value` to a counter, creating it at zero first if needed. A
    /// non-counter metric of the same name is replaced.
    pub fn increment_counter(&self, name: &str, value: u64) {
        let mut reg = self.registry();
        let current = reg
            .metrics
            .get(name)
            .and_then(|m| m.as_counter())
            .unwrap_or(0);
        reg.metrics.insert(
            name.to_string(),
            Box::new(CounterMetric::with_value(name, current + value)),
        );
    }

    /// Set a counter to a specific value.
    pub fn set_counter(&self, name: &str, value: u64) {
        self.registry()
            .metrics
            .insert(name.to_string(), Box::new(CounterMetric::with_value(name, value)));
    }

    /// Set a gauge to a specific value.
    pub fn set_gauge(&self, name: &str, value: f64) {
        self.registry()
            .metrics
            .insert(name.to_string(), Box::new(GaugeMetric::new(name, value)));
    }

    /// All metrics as one JSON object, plus `execution_time_ms` when the
    /// clock was started and stopped.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let reg = self.registry();
        let mut out = serde_json::Map::new();

        for (name, metric) in &reg.metrics {
            let mut obj = serde_json::Map::new();
            obj.insert("value".to_string(), metric.value());
            if let Some(desc) = metric.description() {
                obj.insert("description".to_string(), json!(desc));
            }
            out.insert(name.clone(), Value::Object(obj));
        }

        if let (Some(start), Some(end)) = (reg.started, reg.stopped) {
            out.insert(
                "execution_time_ms".to_string(),
                json!({
                    "value": end.duration_since(start).as_millis(),
                    "description": "Total run time in milliseconds",
                }),
            );
        }
        Value::Object(out)
    }

    /// Print all metrics to stdout, sorted by name.
    pub fn print(&self) {
        let reg = self.registry();
        println!("\n========== Run Metrics ==========");
        if let (Some(start), Some(end)) = (reg.started, reg.stopped) {
            let elapsed = end.duration_since(start);
            println!(
                "Execution Time: {:.3}s ({} ms)",
                elapsed.as_secs_f64(),
                elapsed.as_millis()
            );
            println!("---------------------------------");
        }
        let mut sorted: Vec<_> = reg.metrics.iter().collect();
        sorted.sort_by_key(|(name, _)| *name);
        for (name, metric) in sorted {
            match metric.description() {
                Some(desc) => println!("{name}: {} ({desc})", metric.value()),
                None => println!("{name}: {}", metric.value()),
            }
        }
        println!("=================================\n");
    }

    /// Save all metrics to a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let formatted = serde_json::to_string_pretty(&self.to_json())?;
        std::fs::write(path, formatted).with_context(|| format!("write {}", path.display()))
    }

    /// Snapshot of all metric names and values.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.registry()
            .metrics
            .iter()
            .map(|(name, metric)| (name.clone(), metric.value()))
            .collect()
    }
}

/// A monotonically increasing count.
pub struct CounterMetric {
    name: String,
    count: u64,
}

impl CounterMetric {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_value(name, 0)
    }

    pub fn with_value(name: impl Into<String>, count: u64) -> Self {
        Self {
            name: name.into(),
            count,
        }
    }
}

impl Metric for CounterMetric {
    fn name(&self) -> &str {
        &self.name
    }

    fn value(&self) -> Value {
        json!(self.count)
    }

    fn as_counter(&self) -> Option<u64> {
        Some(self.count)
    }
}

/// A single numeric reading.
pub struct GaugeMetric {
    name: String,
    value: f64,
    description: Option<String>,
}

impl GaugeMetric {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            description: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl Metric for GaugeMetric {
    fn name(&self) -> &str {
        &self.name
    }

    fn value(&self) -> Value {
        json!(self.value)
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}
