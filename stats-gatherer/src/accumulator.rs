//! The sink that metric records and collection errors are written to.

use crate::error::CollectError;
use chrono::{
    DateTime,
    Utc,
};
use serde::Serialize;
use std::{
    collections::BTreeMap,
    fmt,
    sync::{
        Mutex,
        MutexGuard,
        PoisonError,
    },
};

pub type Tags = BTreeMap<String, String>;
pub type Fields = BTreeMap<String, FieldValue>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    String(String),
}

impl FieldValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

/// One metric record: a measurement name, its tags and fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub measurement: String,
    pub tags: Tags,
    pub fields: Fields,
    pub timestamp: DateTime<Utc>,
}

impl Metric {
    pub fn new(measurement: impl Into<String>, fields: Fields, tags: Tags) -> Self {
        Self {
            measurement: measurement.into(),
            tags,
            fields,
            timestamp: Utc::now(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags.get(name).map(String::as_str)
    }
}

fn escape(value: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// InfluxDB line protocol.
impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", escape(&self.measurement, &[',', ' ']))?;
        for (key, value) in &self.tags {
            if value.is_empty() {
                continue;
            }
            write!(
                f,
                ",{}={}",
                escape(key, &[',', '=', ' ']),
                escape(value, &[',', '=', ' '])
            )?;
        }

        let mut separator = ' ';
        for (key, value) in &self.fields {
            write!(f, "{separator}{}=", escape(key, &[',', '=', ' ']))?;
            match value {
                FieldValue::Integer(value) => write!(f, "{value}i")?,
                FieldValue::Float(value) => write!(f, "{value}")?,
                FieldValue::String(value) => write!(f, "\"{}\"", escape(value, &['"', '\\']))?,
            }
            separator = ',';
        }

        write!(f, " {}", self.timestamp.timestamp_nanos_opt().unwrap_or_default())
    }
}

/// Receives metric records and collection errors.
///
/// Publishers for several nodes and categories write concurrently, so
/// implementations must be safe to share between tasks.
pub trait Accumulator: Send + Sync {
    fn add_fields(&self, measurement: &str, fields: Fields, tags: Tags);

    fn add_error(&self, error: CollectError);
}

/// Keeps everything it receives in memory.
#[derive(Debug, Default)]
pub struct MemoryAccumulator {
    metrics: Mutex<Vec<Metric>>,
    errors: Mutex<Vec<CollectError>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metrics(&self) -> Vec<Metric> {
        lock(&self.metrics).clone()
    }

    pub fn metrics_named(&self, measurement: &str) -> Vec<Metric> {
        lock(&self.metrics)
            .iter()
            .filter(|metric| metric.measurement == measurement)
            .cloned()
            .collect()
    }

    pub fn error_messages(&self) -> Vec<String> {
        lock(&self.errors).iter().map(ToString::to_string).collect()
    }

    pub fn take_errors(&self) -> Vec<CollectError> {
        std::mem::take(&mut *lock(&self.errors))
    }

    pub fn error_count(&self) -> usize {
        lock(&self.errors).len()
    }
}

impl Accumulator for MemoryAccumulator {
    fn add_fields(&self, measurement: &str, fields: Fields, tags: Tags) {
        lock(&self.metrics).push(Metric::new(measurement, fields, tags));
    }

    fn add_error(&self, error: CollectError) {
        lock(&self.errors).push(error);
    }
}
