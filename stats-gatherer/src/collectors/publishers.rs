//! # Category Publishers
//!
//! One publisher per [`Category`]. Each turns a decoded [`StatusDocument`]
//! into metric records tagged with the node identity and writes them to an
//! [`Accumulator`]. Publishers never fail: missing or ill-formed parts of the
//! document simply produce fewer records.

use crate::{
    accumulator::{
        Accumulator,
        FieldValue,
        Fields,
        Tags,
    },
    model::{
        Attribute,
        EventStats,
        GcCollector,
        MemoryPool,
        PluginStats,
        StatusDocument,
    },
};
use logstash_gatherer_config::Category;
use std::collections::BTreeMap;
use tracing::debug;

pub const PROCESS_MEASUREMENT: &str = "logstash_process";
pub const JVM_MEASUREMENT: &str = "logstash_jvm";
pub const PIPELINE_MEASUREMENT: &str = "logstash_pipeline";
pub const PLUGINS_MEASUREMENT: &str = "logstash_plugins";
pub const EVENTS_MEASUREMENT: &str = "logstash_events";

pub fn publish(category: Category, doc: &StatusDocument, acc: &dyn Accumulator) {
    match category {
        Category::Jvm => publish_jvm(doc, acc),
        Category::Process => publish_process(doc, acc),
        Category::Events => publish_events(doc, acc),
        Category::Pipeline => publish_pipeline(doc, acc),
    }
}

/// Tags identifying the node a document was fetched from.
pub fn node_tags(doc: &StatusDocument) -> Tags {
    Tags::from([
        ("node_id".to_string(), doc.id.clone()),
        ("node_name".to_string(), doc.name.clone()),
        ("node_host".to_string(), doc.host.clone()),
        ("node_version".to_string(), doc.version.clone()),
        ("node_http_address".to_string(), doc.http_address.clone()),
    ])
}

fn fields<const N: usize>(entries: [(&str, FieldValue); N]) -> Fields {
    entries
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

pub fn publish_process(doc: &StatusDocument, acc: &dyn Accumulator) {
    let process = &doc.process;
    let fields = fields([
        ("open_file_descriptors", process.open_file_descriptors.into()),
        ("peak_open_file_descriptors", process.peak_open_file_descriptors.into()),
        ("max_file_descriptors", process.max_file_descriptors.into()),
        ("mem_total_virtual_in_bytes", process.mem.total_virtual_in_bytes.into()),
        ("cpu_total_in_millis", process.cpu.total_in_millis.into()),
        ("cpu_percent", process.cpu.percent.into()),
        ("cpu_load_average_1m", process.cpu.load_average.one_minute.into()),
        ("cpu_load_average_5m", process.cpu.load_average.five_minutes.into()),
        ("cpu_load_average_15m", process.cpu.load_average.fifteen_minutes.into()),
    ]);
    acc.add_fields(PROCESS_MEASUREMENT, fields, node_tags(doc));
}

pub fn publish_jvm(doc: &StatusDocument, acc: &dyn Accumulator) {
    let jvm = &doc.jvm;
    let mut fields = fields([
        ("uptime_in_millis", jvm.uptime_in_millis.into()),
        ("threads_count", jvm.threads.count.into()),
        ("threads_peak_count", jvm.threads.peak_count.into()),
        ("mem_heap_used_percent", jvm.mem.heap_used_percent.into()),
        ("mem_heap_committed_in_bytes", jvm.mem.heap_committed_in_bytes.into()),
        ("mem_heap_max_in_bytes", jvm.mem.heap_max_in_bytes.into()),
        ("mem_heap_used_in_bytes", jvm.mem.heap_used_in_bytes.into()),
        ("mem_non_heap_used_in_bytes", jvm.mem.non_heap_used_in_bytes.into()),
        ("mem_non_heap_committed_in_bytes", jvm.mem.non_heap_committed_in_bytes.into()),
    ]);

    let pools: [(&str, &MemoryPool); 3] = [
        ("survivor", &jvm.mem.pools.survivor),
        ("old", &jvm.mem.pools.old),
        ("young", &jvm.mem.pools.young),
    ];
    for (pool, stats) in pools {
        for (name, value) in [
            ("peak_used_in_bytes", stats.peak_used_in_bytes),
            ("used_in_bytes", stats.used_in_bytes),
            ("peak_max_in_bytes", stats.peak_max_in_bytes),
            ("max_in_bytes", stats.max_in_bytes),
            ("committed_in_bytes", stats.committed_in_bytes),
        ] {
            fields.insert(format!("mem_pools_{pool}_{name}"), value.into());
        }
    }

    let collectors: [(&str, &GcCollector); 2] = [
        ("old", &jvm.gc.collectors.old),
        ("young", &jvm.gc.collectors.young),
    ];
    for (generation, stats) in collectors {
        fields.insert(
            format!("gc_collectors_{generation}_collection_time_in_millis"),
            stats.collection_time_in_millis.into(),
        );
        fields.insert(
            format!("gc_collectors_{generation}_collection_count"),
            stats.collection_count.into(),
        );
    }

    acc.add_fields(JVM_MEASUREMENT, fields, node_tags(doc));
}

pub fn publish_pipeline(doc: &StatusDocument, acc: &dyn Accumulator) {
    let pipeline = doc.pipeline_stats();

    let mut tags = node_tags(doc);
    if !pipeline.queue.kind.is_empty() {
        tags.insert("queue_type".to_string(), pipeline.queue.kind.clone());
    }
    let mut fields = event_fields(&pipeline.events);
    fields.insert(
        "queue_push_duration_in_millis".to_string(),
        pipeline.events.queue_push_duration_in_millis.into(),
    );
    fields.insert("reloads_successes".to_string(), pipeline.reloads.successes.into());
    fields.insert("reloads_failures".to_string(), pipeline.reloads.failures.into());
    acc.add_fields(PIPELINE_MEASUREMENT, fields, tags);

    publish_plugins(doc, "input", &pipeline.plugins.inputs, acc);
    publish_plugins(doc, "filter", &pipeline.plugins.filters, acc);
    publish_plugins(doc, "output", &pipeline.plugins.outputs, acc);
}

/// Emits one record per numeric event counter of every complete plugin entry.
fn publish_plugins(doc: &StatusDocument, kind: &str, plugins: &[PluginStats], acc: &dyn Accumulator) {
    for plugin in plugins {
        let Some((id, name, events)) = plugin.complete() else {
            debug!(kind, id = ?plugin.id, name = ?plugin.name, "Skipping incomplete plugin entry");
            continue;
        };

        let mut extra = Fields::new();
        flatten_attributes("", &plugin.attributes, &mut extra);

        let mut tags = node_tags(doc);
        tags.insert("plugin_id".to_string(), id.to_string());
        tags.insert("plugin_name".to_string(), name.to_string());
        tags.insert("plugin_type".to_string(), kind.to_string());

        for (event, value) in events {
            let Some(count) = value.as_truncated_i64() else {
                debug!(kind, id, %event, "Skipping non-numeric plugin event counter");
                continue;
            };
            let mut fields = extra.clone();
            fields.insert(event.clone(), count.into());
            acc.add_fields(PLUGINS_MEASUREMENT, fields, tags.clone());
        }
    }
}

fn flatten_attributes(prefix: &str, attributes: &BTreeMap<String, Attribute>, fields: &mut Fields) {
    for (key, value) in attributes {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}_{key}")
        };
        match value {
            Attribute::Integer(value) => {
                fields.insert(name, (*value).into());
            }
            Attribute::Float(value) => {
                fields.insert(name, (*value).into());
            }
            Attribute::String(value) => {
                fields.insert(name, value.clone().into());
            }
            Attribute::Map(nested) => flatten_attributes(&name, nested, fields),
        }
    }
}

fn event_fields(events: &EventStats) -> Fields {
    fields([
        ("in", events.r#in.into()),
        ("out", events.out.into()),
        ("filtered", events.filtered.into()),
        ("duration_in_millis", events.duration_in_millis.into()),
    ])
}

/// Node level event counters; 5.x nodes do not report them.
pub fn publish_events(doc: &StatusDocument, acc: &dyn Accumulator) {
    if doc.is_legacy() {
        return;
    }
    acc.add_fields(EVENTS_MEASUREMENT, event_fields(doc.event_stats()), node_tags(doc));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        accumulator::MemoryAccumulator,
        model::tests::{
            LOGSTASH_5,
            LOGSTASH_6,
        },
    };
    use pretty_assertions::assert_eq;

    fn decode(body: &str) -> StatusDocument {
        serde_json::from_str(body).unwrap()
    }

    fn int(metric: &crate::Metric, name: &str) -> Option<i64> {
        metric.field(name).and_then(FieldValue::as_i64)
    }

    #[test]
    fn events_skipped_for_legacy_nodes() {
        for version in ["5.0.0", "5.6.16"] {
            let doc = decode(&format!(r#"{{"version":"{version}","events":{{"in":3}}}}"#));
            let acc = MemoryAccumulator::new();
            publish_events(&doc, &acc);
            assert!(acc.metrics().is_empty(), "{version}");
        }

        let acc = MemoryAccumulator::new();
        publish_events(&decode(LOGSTASH_5), &acc);
        assert!(acc.metrics().is_empty());
    }

    #[test]
    fn events_published_for_current_nodes() {
        let doc = decode(LOGSTASH_6);
        let acc = MemoryAccumulator::new();
        publish_events(&doc, &acc);

        let metrics = acc.metrics();
        assert_eq!(metrics.len(), 1);
        let events = &metrics[0];
        assert_eq!(events.measurement, EVENTS_MEASUREMENT);
        assert_eq!(
            events.fields,
            fields([
                ("in", FieldValue::Integer(1468)),
                ("out", FieldValue::Integer(1466)),
                ("filtered", FieldValue::Integer(1468)),
                ("duration_in_millis", FieldValue::Integer(2390)),
            ])
        );
        assert_eq!(events.tag("node_name"), Some("node-6-test"));
        assert_eq!(events.tag("node_version"), Some("6.4.2"));

        for version in ["6.0.0", "7.10.1", "10.0.0", "unknown"] {
            let doc = decode(&format!(r#"{{"version":"{version}"}}"#));
            let acc = MemoryAccumulator::new();
            publish_events(&doc, &acc);
            assert_eq!(acc.metrics().len(), 1, "{version}");
        }
    }

    #[test]
    fn process_fields() {
        let acc = MemoryAccumulator::new();
        publish_process(&decode(LOGSTASH_5), &acc);
        let metrics = acc.metrics_named(PROCESS_MEASUREMENT);
        assert_eq!(metrics.len(), 1);
        let process = &metrics[0];
        assert_eq!(int(process, "open_file_descriptors"), Some(89));
        assert_eq!(int(process, "mem_total_virtual_in_bytes"), Some(5111140352));
        assert_eq!(process.field("cpu_percent"), Some(&FieldValue::Float(1.0)));
        assert_eq!(process.field("cpu_load_average_15m"), Some(&FieldValue::Float(0.08)));
        assert_eq!(process.tag("node_id"), Some("a360d8cf-6289-429d-8419-6145e324b574"));
    }

    #[test]
    fn jvm_fields() {
        let acc = MemoryAccumulator::new();
        publish_jvm(&decode(LOGSTASH_6), &acc);
        let metrics = acc.metrics_named(JVM_MEASUREMENT);
        assert_eq!(metrics.len(), 1);
        let jvm = &metrics[0];
        assert_eq!(jvm.fields.len(), 9 + 3 * 5 + 2 * 2);
        assert_eq!(int(jvm, "uptime_in_millis"), Some(5032089));
        assert_eq!(int(jvm, "threads_peak_count"), Some(62));
        assert_eq!(int(jvm, "mem_pools_old_max_in_bytes"), Some(15215050752));
        assert_eq!(int(jvm, "mem_pools_survivor_used_in_bytes"), Some(0));
        assert_eq!(int(jvm, "gc_collectors_young_collection_count"), Some(8));
        assert_eq!(int(jvm, "gc_collectors_young_collection_time_in_millis"), Some(2023));
    }

    #[test]
    fn legacy_pipeline_and_plugins() {
        let acc = MemoryAccumulator::new();
        publish_pipeline(&decode(LOGSTASH_5), &acc);

        let pipeline = acc.metrics_named(PIPELINE_MEASUREMENT);
        assert_eq!(pipeline.len(), 1);
        assert_eq!(int(&pipeline[0], "in"), Some(1269));
        assert_eq!(int(&pipeline[0], "queue_push_duration_in_millis"), Some(37));
        assert_eq!(pipeline[0].tag("queue_type"), Some("memory"));

        // beats: 2 counters, split: 3, drop: none, stdout: 3
        let plugins = acc.metrics_named(PLUGINS_MEASUREMENT);
        assert_eq!(plugins.len(), 8);
        assert!(plugins.iter().all(|metric| metric.tag("plugin_name") != Some("drop")));

        let beats: Vec<_> = plugins
            .iter()
            .filter(|metric| metric.tag("plugin_name") == Some("beats"))
            .collect();
        assert_eq!(beats.len(), 2);
        for metric in beats {
            assert_eq!(metric.tag("plugin_type"), Some("input"));
            assert_eq!(
                metric.tag("plugin_id"),
                Some("a35197a509596954e905e38521bae12b1498b17d-1")
            );
            assert_eq!(int(metric, "current_connections"), Some(1));
            assert_eq!(int(metric, "peak_connections"), Some(1));
        }
    }

    #[test]
    fn current_pipeline_flattens_nested_attributes() {
        let acc = MemoryAccumulator::new();
        publish_pipeline(&decode(LOGSTASH_6), &acc);

        let pipeline = acc.metrics_named(PIPELINE_MEASUREMENT);
        assert_eq!(int(&pipeline[0], "out"), Some(1466));
        assert_eq!(int(&pipeline[0], "reloads_successes"), Some(1));
        assert_eq!(pipeline[0].tag("queue_type"), Some("persisted"));

        let plugins = acc.metrics_named(PLUGINS_MEASUREMENT);
        assert_eq!(plugins.len(), 2 + 3 + 3 + 3);

        let output = plugins
            .iter()
            .find(|metric| metric.tag("plugin_id") == Some("es-out") && metric.field("in").is_some())
            .unwrap();
        assert_eq!(output.tag("plugin_type"), Some("output"));
        assert_eq!(int(output, "in"), Some(1466));
        assert_eq!(int(output, "documents_successes"), Some(1466));
        assert_eq!(int(output, "bulk_requests_responses_200"), Some(12));
        assert!(output.field("id").is_none());
        assert!(output.field("events").is_none());
    }

    #[test]
    fn plugin_entries_need_id_name_and_events() {
        let doc = decode(
            r#"{
                "version": "6.2.4",
                "pipelines": {
                    "plugins": {
                        "inputs": [{"name": "generator", "events": {"out": 3}}],
                        "filters": [
                            {"id": "f1", "events": {"in": 3}},
                            {"id": "f2", "name": "grok", "events": {"in": 3.9, "out": 2.2, "note": "x"}, "patterns": {"ok": 2, "failed": 1}}
                        ],
                        "outputs": [{"id": "o1", "name": "null"}]
                    }
                }
            }"#,
        );
        let acc = MemoryAccumulator::new();
        publish_pipeline(&doc, &acc);

        let plugins = acc.metrics_named(PLUGINS_MEASUREMENT);
        assert_eq!(plugins.len(), 2);
        for metric in &plugins {
            assert_eq!(metric.tag("plugin_id"), Some("f2"));
            assert_eq!(metric.tag("plugin_name"), Some("grok"));
            assert_eq!(metric.tag("plugin_type"), Some("filter"));
            assert_eq!(int(metric, "patterns_ok"), Some(2));
            assert_eq!(int(metric, "patterns_failed"), Some(1));
        }
        let counters: Vec<_> = plugins
            .iter()
            .filter_map(|metric| int(metric, "in").or_else(|| int(metric, "out")))
            .collect();
        assert_eq!(counters, vec![3, 2]);
    }

    #[test]
    fn dispatch_by_category() {
        let doc = decode(LOGSTASH_6);
        for (category, measurement) in [
            (Category::Jvm, JVM_MEASUREMENT),
            (Category::Process, PROCESS_MEASUREMENT),
            (Category::Events, EVENTS_MEASUREMENT),
            (Category::Pipeline, PIPELINE_MEASUREMENT),
        ] {
            let acc = MemoryAccumulator::new();
            publish(category, &doc, &acc);
            assert_eq!(acc.metrics_named(measurement).len(), 1, "{category}");
        }
    }
}
