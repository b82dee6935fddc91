//! Prometheus text exporter for substrate and purge-set snapshots.
//!
//! Writes the Prometheus text exposition format so the output can be scraped
//! directly or forwarded to an OpenTelemetry collector.

use std::io::{self, Write};

use tracing::warn;

use crate::purge_set::PurgeSetSnapshot;
use crate::stats::{LruStatsSnapshot, StatsSink};

/// Publishes a snapshot type to a monitoring backend.
pub trait MetricsExporter<S> {
    fn export(&mut self, snapshot: &S) -> io::Result<()>;
}

#[derive(Debug)]
pub struct PrometheusTextExporter<W: Write> {
    prefix: String,
    writer: W,
}

impl<W: Write> PrometheusTextExporter<W> {
    pub fn new(prefix: impl Into<String>, writer: W) -> Self {
        Self {
            prefix: prefix.into(),
            writer,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_counter(&mut self, suffix: &str, value: u64) -> io::Result<()> {
        let name = self.metric_name(suffix);
        writeln!(self.writer, "# TYPE {name} counter")?;
        writeln!(self.writer, "{name} {value}")
    }

    fn write_gauge(&mut self, suffix: &str, value: i64) -> io::Result<()> {
        let name = self.metric_name(suffix);
        writeln!(self.writer, "# TYPE {name} gauge")?;
        writeln!(self.writer, "{name} {value}")
    }

    fn metric_name(&self, suffix: &str) -> String {
        if self.prefix.is_empty() {
            suffix.to_string()
        } else {
            format!("{}_{}", self.prefix, suffix)
        }
    }
}

fn gauge(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl<W: Write> MetricsExporter<LruStatsSnapshot> for PrometheusTextExporter<W> {
    fn export(&mut self, snapshot: &LruStatsSnapshot) -> io::Result<()> {
        self.write_counter("hits_total", snapshot.hits)?;
        self.write_counter("misses_total", snapshot.misses)?;
        self.write_counter("inserts_total", snapshot.inserts)?;
        self.write_counter("evictions_total", snapshot.evictions)?;
        self.write_counter("deletes_total", snapshot.deletes)?;
        self.write_counter("identical_reinserts_total", snapshot.identical_reinserts)?;
        self.write_gauge("elements", gauge(snapshot.num_elements))?;
        self.write_gauge("size_bytes", gauge(snapshot.size_bytes))?;
        self.write_gauge("max_bytes", gauge(snapshot.max_bytes))?;
        self.writer.flush()
    }
}

impl<W: Write> MetricsExporter<PurgeSetSnapshot> for PrometheusTextExporter<W> {
    fn export(&mut self, snapshot: &PurgeSetSnapshot) -> io::Result<()> {
        MetricsExporter::<LruStatsSnapshot>::export(self, &snapshot.lru)?;
        self.write_gauge(
            "global_invalidation_timestamp_ms",
            snapshot.global_invalidation_timestamp_ms,
        )?;
        self.write_gauge("last_seen_timestamp_ms", snapshot.last_seen_timestamp_ms)?;
        self.writer.flush()
    }
}

impl<W: Write> StatsSink for PrometheusTextExporter<W> {
    fn record(&mut self, snapshot: &LruStatsSnapshot) {
        if let Err(err) = MetricsExporter::<LruStatsSnapshot>::export(self, snapshot) {
            warn!(error = %err, "failed to export cache statistics");
        }
    }
}
