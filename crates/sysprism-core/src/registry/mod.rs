//! In-process metrics registry.
//!
//! Series are registered once at wiring time and then written by a single
//! sampler while any number of readers render them. Values are `f64` stored
//! as raw bits in `AtomicU64`, so a scalar is never torn; a rendered snapshot
//! may still mix values written by different ticks.
//!
//! Label tuples are keyed by their values in registration order of the label
//! keys. Tuples are never evicted: a partition that disappears keeps its last
//! value until the process restarts.

mod exposition;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::{Result, SysPrismError};

/// Series type, rendered as the `# TYPE` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Gauge,
    Counter,
}

impl MetricKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
        }
    }
}

struct Series {
    name: String,
    help: String,
    kind: MetricKind,
    label_keys: Vec<String>,
    values: DashMap<Vec<String>, AtomicU64>,
}

impl Series {
    fn key(&self, label_values: &[&str]) -> Result<Vec<String>> {
        if label_values.len() != self.label_keys.len() {
            return Err(SysPrismError::LabelArity {
                name: self.name.clone(),
                expected: self.label_keys.len(),
                got: label_values.len(),
            });
        }
        Ok(label_values.iter().map(|v| v.to_string()).collect())
    }

    fn same_shape(&self, kind: MetricKind, label_keys: &[&str]) -> bool {
        self.kind == kind
            && self.label_keys.len() == label_keys.len()
            && self.label_keys.iter().zip(label_keys).all(|(a, b)| a == b)
    }

    /// Copy out the current values, sorted by label tuple.
    fn snapshot(&self) -> Vec<(Vec<String>, f64)> {
        let mut out: Vec<(Vec<String>, f64)> = self
            .values
            .iter()
            .map(|r| (r.key().clone(), f64::from_bits(r.value().load(Ordering::Relaxed))))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

/// Cheap, cloneable reference to one registered series.
#[derive(Clone)]
pub struct SeriesHandle {
    series: Arc<Series>,
}

impl std::fmt::Debug for SeriesHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeriesHandle")
            .field("name", &self.series.name)
            .field("kind", &self.series.kind)
            .field("label_keys", &self.series.label_keys)
            .finish()
    }
}

impl SeriesHandle {
    pub fn name(&self) -> &str {
        &self.series.name
    }

    pub fn kind(&self) -> MetricKind {
        self.series.kind
    }

    pub fn label_keys(&self) -> &[String] {
        &self.series.label_keys
    }

    /// Overwrite the value for one label tuple.
    /// Fails with `LabelArity` (and leaves the series untouched) when the
    /// number of label values differs from the number of label keys.
    pub fn set(&self, label_values: &[&str], value: f64) -> Result<()> {
        let key = self.series.key(label_values)?;
        let bits = value.to_bits();
        self.series
            .values
            .entry(key)
            .or_insert_with(|| AtomicU64::new(bits))
            .store(bits, Ordering::Relaxed);
        Ok(())
    }

    /// Add `delta` to the value for one label tuple (absent tuples start at 0).
    pub fn add(&self, label_values: &[&str], delta: f64) -> Result<()> {
        let key = self.series.key(label_values)?;
        let cell = self
            .series
            .values
            .entry(key)
            .or_insert_with(|| AtomicU64::new(0f64.to_bits()));
        let _ = cell.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
            Some((f64::from_bits(bits) + delta).to_bits())
        });
        Ok(())
    }

    /// Current value for one label tuple, if it was ever written.
    pub fn get(&self, label_values: &[&str]) -> Result<Option<f64>> {
        let key = self.series.key(label_values)?;
        Ok(self
            .series
            .values
            .get(&key)
            .map(|v| f64::from_bits(v.load(Ordering::Relaxed))))
    }
}

/// Set of named series for one exporter instance.
#[derive(Default)]
pub struct Registry {
    series: DashMap<String, Arc<Series>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            series: DashMap::new(),
        }
    }

    /// Register a series, or return the existing one if `name` is already
    /// registered with the same kind and label keys.
    pub fn register(
        &self,
        name: &str,
        help: &str,
        kind: MetricKind,
        label_keys: &[&str],
    ) -> Result<SeriesHandle> {
        validate_metric_name(name)?;
        for (i, key) in label_keys.iter().enumerate() {
            validate_label_key(name, key)?;
            if label_keys[..i].contains(key) {
                return Err(SysPrismError::InvalidName(format!(
                    "series {name} repeats label key {key}"
                )));
            }
        }

        let series = match self.series.entry(name.to_string()) {
            Entry::Occupied(e) => {
                if !e.get().same_shape(kind, label_keys) {
                    return Err(SysPrismError::DuplicateSeries {
                        name: name.to_string(),
                    });
                }
                Arc::clone(e.get())
            }
            Entry::Vacant(v) => {
                let series = Arc::new(Series {
                    name: name.to_string(),
                    help: help.to_string(),
                    kind,
                    label_keys: label_keys.iter().map(|k| k.to_string()).collect(),
                    values: DashMap::new(),
                });
                v.insert(Arc::clone(&series));
                tracing::debug!(series = %name, ?kind, labels = label_keys.len(), "series registered");
                series
            }
        };
        Ok(SeriesHandle { series })
    }

    /// Like [`SeriesHandle::set`], but fails with `ForeignSeries` when
    /// `handle` was registered in a different registry.
    pub fn set(&self, handle: &SeriesHandle, label_values: &[&str], value: f64) -> Result<()> {
        self.check_owned(handle)?;
        handle.set(label_values, value)
    }

    pub fn add(&self, handle: &SeriesHandle, label_values: &[&str], delta: f64) -> Result<()> {
        self.check_owned(handle)?;
        handle.add(label_values, delta)
    }

    pub fn get(&self, handle: &SeriesHandle, label_values: &[&str]) -> Result<Option<f64>> {
        self.check_owned(handle)?;
        handle.get(label_values)
    }

    fn check_owned(&self, handle: &SeriesHandle) -> Result<()> {
        let owned = self
            .series
            .get(handle.name())
            .is_some_and(|s| Arc::ptr_eq(s.value(), &handle.series));
        if !owned {
            return Err(SysPrismError::ForeignSeries {
                name: handle.name().to_string(),
            });
        }
        Ok(())
    }

    /// Number of registered series.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Render all series in Prometheus text exposition format.
    ///
    /// Output is ordered by series name, then by label tuple. Series that
    /// have never been written are omitted entirely.
    pub fn render(&self) -> String {
        let mut all: Vec<Arc<Series>> = self.series.iter().map(|r| Arc::clone(r.value())).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));

        let mut out = String::new();
        for s in &all {
            let values = s.snapshot();
            if values.is_empty() {
                continue;
            }
            exposition::write_series(
                &mut out,
                &s.name,
                &s.help,
                s.kind,
                &s.label_keys,
                &values,
            );
        }
        out
    }
}

fn validate_metric_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let ok = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
        }
        _ => false,
    };
    if !ok {
        return Err(SysPrismError::InvalidName(format!("metric name {name:?}")));
    }
    Ok(())
}

fn validate_label_key(series: &str, key: &str) -> Result<()> {
    let mut chars = key.chars();
    let ok = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    // `__` prefix is reserved for scraper-internal labels.
    if !ok || key.starts_with("__") {
        return Err(SysPrismError::InvalidName(format!(
            "series {series} label key {key:?}"
        )));
    }
    Ok(())
}
