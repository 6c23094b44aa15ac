use logstash_gatherer_config::OutputFormat;
use logstash_stats_gatherer::{
    Accumulator,
    CollectError,
    Fields,
    Metric,
    Tags,
};
use std::{
    io::Write,
    sync::{
        atomic::{
            AtomicUsize,
            Ordering,
        },
        Mutex,
        PoisonError,
    },
};

/// Writes every record as one line and logs collection errors.
#[derive(Debug)]
pub struct OutputAccumulator<W> {
    format: OutputFormat,
    writer: Mutex<W>,
    errors: AtomicUsize,
}

impl OutputAccumulator<std::io::Stdout> {
    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(format, std::io::stdout())
    }
}

impl<W: Write + Send> OutputAccumulator<W> {
    pub fn new(format: OutputFormat, writer: W) -> Self {
        Self {
            format,
            writer: Mutex::new(writer),
            errors: AtomicUsize::new(0),
        }
    }

    /// Number of errors reported since the last call.
    pub fn take_error_count(&self) -> usize {
        self.errors.swap(0, Ordering::Relaxed)
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn render(&self, metric: &Metric) -> Result<String, serde_json::Error> {
        match self.format {
            OutputFormat::Line => Ok(metric.to_string()),
            OutputFormat::Json => serde_json::to_string(metric),
        }
    }
}

impl<W: Write + Send> Accumulator for OutputAccumulator<W> {
    fn add_fields(&self, measurement: &str, fields: Fields, tags: Tags) {
        let metric = Metric::new(measurement, fields, tags);
        let line = match self.render(&metric) {
            Ok(line) => line,
            Err(err) => {
                error!(%err, measurement, "Cannot serialize record");
                return;
            }
        };
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = writeln!(writer, "{line}").and_then(|_| writer.flush()) {
            error!(%err, "Cannot write record");
        }
    }

    fn add_error(&self, error: CollectError) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        error!(host = error.host(), %error, "Collection failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logstash_stats_gatherer::FieldValue;
    use pretty_assertions::assert_eq;

    fn record(acc: &dyn Accumulator) {
        acc.add_fields(
            "logstash_jvm",
            Fields::from([("uptime_in_millis".to_string(), FieldValue::Integer(1000))]),
            Tags::from([("node_name".to_string(), "node 1".to_string())]),
        );
    }

    #[test]
    fn line_protocol_output() {
        let acc = OutputAccumulator::new(OutputFormat::Line, Vec::new());
        record(&acc);
        let output = String::from_utf8(acc.into_inner()).unwrap();
        assert!(
            output.starts_with("logstash_jvm,node_name=node\\ 1 uptime_in_millis=1000i "),
            "{output}"
        );
        assert!(output.ends_with('\n'));
        assert_eq!(output.lines().count(), 1);
    }

    #[test]
    fn json_output() {
        let acc = OutputAccumulator::new(OutputFormat::Json, Vec::new());
        record(&acc);
        record(&acc);
        let output = String::from_utf8(acc.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = output.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["measurement"], "logstash_jvm");
        assert_eq!(lines[0]["fields"]["uptime_in_millis"], 1000);
        assert_eq!(lines[0]["tags"]["node_name"], "node 1");
    }

    #[test]
    fn errors_are_counted_per_cycle() {
        let acc = OutputAccumulator::new(OutputFormat::Line, Vec::new());
        acc.add_error(CollectError::Task {
            host: "http://localhost:9600".to_string(),
            reason: "cancelled".to_string(),
        });
        assert_eq!(acc.take_error_count(), 1);
        assert_eq!(acc.take_error_count(), 0);
    }
}
