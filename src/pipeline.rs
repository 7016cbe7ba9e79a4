use crate::config::ServiceConfig;
use crate::file_sink::{FileSink, JSON_LOG_FILE, TEXT_LOG_FILE};
use crate::format::{Formatter, JsonFormatter, TextFormatter};
use crate::record::{Enricher, Fields, Level, LogRecord};
use crate::sink::LogSink;
use std::io;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// One output representation: enrich, format, then append to a sink.
///
/// Records less severe than the pipeline threshold are skipped before
/// enrichment. A sink failure is returned to the caller and counted; it is
/// never retried.
pub struct Pipeline {
    name: &'static str,
    threshold: Level,
    enricher: Enricher,
    formatter: Arc<dyn Formatter>,
    sink: Arc<dyn LogSink>,
    /// Records accepted by the threshold.
    pub emitted: Arc<AtomicU64>,
    /// Records the sink accepted.
    pub written: Arc<AtomicU64>,
    /// Records the sink rejected.
    pub failed: Arc<AtomicU64>,
}

impl Pipeline {
    pub fn new(
        name: &'static str,
        threshold: Level,
        enricher: Enricher,
        formatter: Arc<dyn Formatter>,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            name,
            threshold,
            enricher,
            formatter,
            sink,
            emitted: Arc::new(AtomicU64::new(0)),
            written: Arc::new(AtomicU64::new(0)),
            failed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Pipeline producing the human-readable line format.
    pub fn text(threshold: Level, enricher: Enricher, sink: Arc<dyn LogSink>) -> Self {
        Self::new("text", threshold, enricher, Arc::new(TextFormatter), sink)
    }

    /// Pipeline producing one JSON object per record.
    pub fn json(threshold: Level, enricher: Enricher, sink: Arc<dyn LogSink>) -> Self {
        Self::new("json", threshold, enricher, Arc::new(JsonFormatter), sink)
    }

    /// Log `message` with auxiliary `fields`.
    pub async fn emit(&self, level: Level, message: impl Into<String>, fields: Fields) -> io::Result<()> {
        if !level.passes(self.threshold) {
            return Ok(());
        }
        self.write(LogRecord::new(level, message, fields)).await
    }

    /// Log an object payload whose `message` entry is the message.
    pub async fn emit_object(&self, level: Level, fields: Fields) -> io::Result<()> {
        if !level.passes(self.threshold) {
            return Ok(());
        }
        self.write(LogRecord::from_fields(level, fields)).await
    }

    async fn write(&self, record: LogRecord) -> io::Result<()> {
        self.emitted.fetch_add(1, Ordering::Relaxed);
        let enriched = self.enricher.enrich(record);
        let line = self.formatter.format(&enriched);

        match self.sink.append(&line).await {
            Ok(()) => {
                self.written.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(pipeline = self.name, error = %e, "log sink append failed");
                Err(e)
            }
        }
    }

    pub async fn flush(&self) -> io::Result<()> {
        self.sink.flush().await
    }
}

/// The text and JSON pipelines owned by the composition root.
///
/// Every call site drives both. They share no mutable state, so one failing
/// does not affect the other.
pub struct Loggers {
    pub text: Pipeline,
    pub json: Pipeline,
}

impl Loggers {
    pub fn new(text: Pipeline, json: Pipeline) -> Self {
        Self { text, json }
    }

    /// File-backed pipelines writing `text.log` and `json.log` under the
    /// configured log directory.
    pub fn open(config: &ServiceConfig) -> Self {
        let enricher = Enricher::new(config.service_name.as_str());
        let text_sink = FileSink::new(config.log_dir.join(TEXT_LOG_FILE));
        let json_sink = FileSink::new(config.log_dir.join(JSON_LOG_FILE));

        Self::new(
            Pipeline::text(config.level, enricher.clone(), Arc::new(text_sink)),
            Pipeline::json(config.level, enricher, Arc::new(json_sink)),
        )
    }

    /// Log the same event on both pipelines with identical payloads.
    /// Returns each pipeline's outcome, text first.
    pub async fn emit_both(
        &self,
        level: Level,
        message: &str,
        fields: Fields,
    ) -> (io::Result<()>, io::Result<()>) {
        tokio::join!(
            self.text.emit(level, message, fields.clone()),
            self.json.emit(level, message, fields),
        )
    }

    pub async fn flush(&self) {
        let (text, json) = tokio::join!(self.text.flush(), self.json.flush());
        for (name, result) in [("text", text), ("json", json)] {
            if let Err(e) = result {
                tracing::warn!(pipeline = name, error = %e, "log sink flush failed");
            }
        }
    }
}
