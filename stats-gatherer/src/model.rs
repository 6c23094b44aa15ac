//! # Response Model
//!
//! Typed view of the node stats document served by a Logstash node.
//!
//! Decoding is tolerant: unknown keys are ignored, and missing keys as well
//! as explicit `null`s fall back to zero values. Two schema generations exist
//! and are told apart by the `version` field:
//!
//! - **5.x (legacy)**: a single pipeline under the `pipeline` key, no
//!   top-level event counters
//! - **6.x and later (current)**: the pipeline summary under `pipelines`
//!
//! The generation is resolved once while decoding into [`PipelineSchema`].

use serde::{
    Deserialize,
    Deserializer,
    Serialize,
};
use serde_json::{
    Map,
    Value,
};
use std::collections::BTreeMap;

/// Legacy (5.x) nodes use the singular pipeline key and report no events.
pub fn is_legacy_version(version: &str) -> bool {
    version.starts_with("5.")
}

/// Reads an explicit `null` as the field's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessStats {
    #[serde(deserialize_with = "null_as_default")]
    pub open_file_descriptors: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub peak_open_file_descriptors: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub max_file_descriptors: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub mem: ProcessMem,
    #[serde(deserialize_with = "null_as_default")]
    pub cpu: ProcessCpu,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessMem {
    #[serde(deserialize_with = "null_as_default")]
    pub total_virtual_in_bytes: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessCpu {
    #[serde(deserialize_with = "null_as_default")]
    pub total_in_millis: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub percent: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub load_average: LoadAverage,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadAverage {
    #[serde(rename = "1m", deserialize_with = "null_as_default")]
    pub one_minute: f64,
    #[serde(rename = "5m", deserialize_with = "null_as_default")]
    pub five_minutes: f64,
    #[serde(rename = "15m", deserialize_with = "null_as_default")]
    pub fifteen_minutes: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JvmStats {
    #[serde(deserialize_with = "null_as_default")]
    pub threads: JvmThreads,
    #[serde(deserialize_with = "null_as_default")]
    pub mem: JvmMem,
    #[serde(deserialize_with = "null_as_default")]
    pub gc: JvmGc,
    #[serde(deserialize_with = "null_as_default")]
    pub uptime_in_millis: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JvmThreads {
    #[serde(deserialize_with = "null_as_default")]
    pub count: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub peak_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JvmMem {
    #[serde(deserialize_with = "null_as_default")]
    pub heap_used_percent: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub heap_committed_in_bytes: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub heap_max_in_bytes: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub heap_used_in_bytes: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub non_heap_used_in_bytes: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub non_heap_committed_in_bytes: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub pools: MemoryPools,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryPools {
    #[serde(deserialize_with = "null_as_default")]
    pub survivor: MemoryPool,
    #[serde(deserialize_with = "null_as_default")]
    pub old: MemoryPool,
    #[serde(deserialize_with = "null_as_default")]
    pub young: MemoryPool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryPool {
    #[serde(deserialize_with = "null_as_default")]
    pub peak_used_in_bytes: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub used_in_bytes: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub peak_max_in_bytes: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub max_in_bytes: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub committed_in_bytes: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JvmGc {
    #[serde(deserialize_with = "null_as_default")]
    pub collectors: GcCollectors,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GcCollectors {
    #[serde(deserialize_with = "null_as_default")]
    pub old: GcCollector,
    #[serde(deserialize_with = "null_as_default")]
    pub young: GcCollector,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GcCollector {
    #[serde(deserialize_with = "null_as_default")]
    pub collection_time_in_millis: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub collection_count: i64,
}

/// Event counters, reported per node (6.x) and per pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventStats {
    #[serde(deserialize_with = "null_as_default")]
    pub r#in: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub out: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub filtered: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub duration_in_millis: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub queue_push_duration_in_millis: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineStats {
    #[serde(deserialize_with = "null_as_default")]
    pub events: EventStats,
    #[serde(deserialize_with = "null_as_default")]
    pub plugins: PipelinePlugins,
    #[serde(deserialize_with = "null_as_default")]
    pub reloads: ReloadStats,
    #[serde(deserialize_with = "null_as_default")]
    pub queue: QueueStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelinePlugins {
    #[serde(deserialize_with = "null_as_default")]
    pub inputs: Vec<PluginStats>,
    #[serde(deserialize_with = "null_as_default")]
    pub filters: Vec<PluginStats>,
    #[serde(deserialize_with = "null_as_default")]
    pub outputs: Vec<PluginStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReloadStats {
    #[serde(deserialize_with = "null_as_default")]
    pub successes: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub failures: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueStats {
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub kind: String,
}

/// A free-form plugin attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Attribute {
    Integer(i64),
    Float(f64),
    String(String),
    Map(BTreeMap<String, Attribute>),
}

impl Attribute {
    /// Converts a JSON value, dropping nulls, booleans and arrays.
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Number(number) => number
                .as_i64()
                .map(Attribute::Integer)
                .or_else(|| number.as_f64().map(Attribute::Float)),
            Value::String(value) => Some(Attribute::String(value)),
            Value::Object(map) => Some(Attribute::Map(attributes_from_json(map))),
            Value::Null | Value::Bool(_) | Value::Array(_) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Attribute::Integer(value) => Value::from(*value),
            Attribute::Float(value) => serde_json::Number::from_f64(*value)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Attribute::String(value) => Value::String(value.clone()),
            Attribute::Map(map) => Value::Object(map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect()),
        }
    }

    /// Numeric value truncated towards zero.
    pub fn as_truncated_i64(&self) -> Option<i64> {
        match self {
            Attribute::Integer(value) => Some(*value),
            Attribute::Float(value) => Some(value.trunc() as i64),
            Attribute::String(_) | Attribute::Map(_) => None,
        }
    }
}

fn attributes_from_json(map: Map<String, Value>) -> BTreeMap<String, Attribute> {
    map.into_iter()
        .filter_map(|(key, value)| Attribute::from_json(value).map(|value| (key, value)))
        .collect()
}

/// Statistics of one input, filter or output plugin.
///
/// `id`, `name` and `events` are lifted out of the raw entry; everything else
/// the node reports for the plugin ends up in `attributes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct PluginStats {
    pub id: Option<String>,
    pub name: Option<String>,
    pub events: Option<BTreeMap<String, Attribute>>,
    pub attributes: BTreeMap<String, Attribute>,
}

impl PluginStats {
    /// Identifier, name and event counters, if the entry carries all three.
    pub fn complete(&self) -> Option<(&str, &str, &BTreeMap<String, Attribute>)> {
        Some((self.id.as_deref()?, self.name.as_deref()?, self.events.as_ref()?))
    }
}

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(value) => Some(value),
        other => Some(other.to_string()),
    }
}

impl From<Map<String, Value>> for PluginStats {
    fn from(mut raw: Map<String, Value>) -> Self {
        let id = raw.remove("id").and_then(scalar_to_string);
        let name = raw.remove("name").and_then(scalar_to_string);
        let events = match raw.remove("events") {
            Some(Value::Object(events)) => Some(attributes_from_json(events)),
            _ => None,
        };
        Self {
            id,
            name,
            events,
            attributes: attributes_from_json(raw),
        }
    }
}

impl From<PluginStats> for Map<String, Value> {
    fn from(plugin: PluginStats) -> Self {
        let mut raw: Map<String, Value> = plugin
            .attributes
            .iter()
            .map(|(key, value)| (key.clone(), value.to_json()))
            .collect();
        if let Some(id) = plugin.id {
            raw.insert("id".to_string(), Value::String(id));
        }
        if let Some(name) = plugin.name {
            raw.insert("name".to_string(), Value::String(name));
        }
        if let Some(events) = plugin.events {
            raw.insert(
                "events".to_string(),
                Value::Object(events.iter().map(|(k, v)| (k.clone(), v.to_json())).collect()),
            );
        }
        raw
    }
}

/// The pipeline summary in the shape the node's version dictates.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineSchema {
    /// 5.x, read from `pipeline`
    Legacy(PipelineStats),
    /// 6.x and later, read from `pipelines`
    Current(PipelineStats),
}

impl Default for PipelineSchema {
    fn default() -> Self {
        PipelineSchema::Current(PipelineStats::default())
    }
}

impl PipelineSchema {
    pub fn stats(&self) -> &PipelineStats {
        match self {
            PipelineSchema::Legacy(stats) | PipelineSchema::Current(stats) => stats,
        }
    }

    /// The document key the summary is read from.
    pub fn key(&self) -> &'static str {
        match self {
            PipelineSchema::Legacy(_) => "pipeline",
            PipelineSchema::Current(_) => "pipelines",
        }
    }
}

/// Decoded response of one node at one poll instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireStatusDocument", into = "WireStatusDocument")]
pub struct StatusDocument {
    pub host: String,
    pub version: String,
    pub http_address: String,
    pub id: String,
    pub name: String,
    pub jvm: JvmStats,
    pub process: ProcessStats,
    /// Node level event counters, absent on 5.x nodes.
    pub events: Option<EventStats>,
    pub pipeline: PipelineSchema,
}

impl StatusDocument {
    pub fn is_legacy(&self) -> bool {
        matches!(self.pipeline, PipelineSchema::Legacy(_))
    }

    pub fn pipeline_stats(&self) -> &PipelineStats {
        self.pipeline.stats()
    }

    /// Node level event counters, falling back to the pipeline's counters
    /// when the node does not report them separately.
    pub fn event_stats(&self) -> &EventStats {
        self.events.as_ref().unwrap_or(&self.pipeline_stats().events)
    }
}

/// The document as it appears on the wire, carrying both pipeline keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct WireStatusDocument {
    #[serde(deserialize_with = "null_as_default")]
    host: String,
    #[serde(deserialize_with = "null_as_default")]
    version: String,
    #[serde(deserialize_with = "null_as_default")]
    http_address: String,
    #[serde(deserialize_with = "null_as_default")]
    id: String,
    #[serde(deserialize_with = "null_as_default")]
    name: String,
    #[serde(deserialize_with = "null_as_default")]
    jvm: JvmStats,
    #[serde(deserialize_with = "null_as_default")]
    process: ProcessStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    events: Option<EventStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pipeline: Option<PipelineStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pipelines: Option<PipelineStats>,
}

impl From<WireStatusDocument> for StatusDocument {
    fn from(wire: WireStatusDocument) -> Self {
        let pipeline = if is_legacy_version(&wire.version) {
            PipelineSchema::Legacy(wire.pipeline.unwrap_or_default())
        } else {
            PipelineSchema::Current(wire.pipelines.unwrap_or_default())
        };
        Self {
            host: wire.host,
            version: wire.version,
            http_address: wire.http_address,
            id: wire.id,
            name: wire.name,
            jvm: wire.jvm,
            process: wire.process,
            events: wire.events,
            pipeline,
        }
    }
}

impl From<StatusDocument> for WireStatusDocument {
    fn from(doc: StatusDocument) -> Self {
        let (pipeline, pipelines) = match doc.pipeline {
            PipelineSchema::Legacy(stats) => (Some(stats), None),
            PipelineSchema::Current(stats) => (None, Some(stats)),
        };
        Self {
            host: doc.host,
            version: doc.version,
            http_address: doc.http_address,
            id: doc.id,
            name: doc.name,
            jvm: doc.jvm,
            process: doc.process,
            events: doc.events,
            pipeline,
            pipelines,
        }
    }
}
