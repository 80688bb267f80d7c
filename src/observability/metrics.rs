use crate::error::{AppError, ErrorKind, Result};
use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Global metrics instance.
pub static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Metrics collector for the ledger core. Calls are no-ops until a recorder
/// is installed.
#[derive(Debug, Clone, Default)]
pub struct Metrics;

impl Metrics {
    pub fn new() -> Self {
        Self
    }

    pub fn record_account_created(&self, account_type: &str) {
        counter!("ledger_accounts_created_total", "account_type" => account_type.to_string())
            .increment(1);
    }

    pub fn record_journal_entry_created(&self, line_count: usize) {
        counter!("ledger_journal_entries_created_total").increment(1);
        histogram!("ledger_journal_entry_line_count").record(line_count as f64);
    }

    pub fn record_journal_entry_posted(&self) {
        counter!("ledger_journal_entries_posted_total").increment(1);
    }

    pub fn record_payment_recorded(&self, settled: bool) {
        counter!("ledger_payments_recorded_total", "settled" => settled.to_string()).increment(1);
    }

    pub fn record_note_created(&self, kind: &str) {
        counter!("ledger_notes_created_total", "kind" => kind.to_string()).increment(1);
    }

    pub fn record_rejection(&self, operation: &str, kind: ErrorKind) {
        counter!(
            "ledger_rejections_total",
            "operation" => operation.to_string(),
            "kind" => kind.as_str()
        )
        .increment(1);
    }

    pub fn record_write_latency(&self, operation: &str, duration_ms: f64) {
        histogram!("ledger_write_duration_ms", "operation" => operation.to_string())
            .record(duration_ms);
    }
}

/// Timer for measuring operation latency.
pub struct LatencyTimer {
    start: Instant,
}

impl LatencyTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for LatencyTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Installs the Prometheus recorder once and returns its handle.
pub fn init_metrics() -> Result<PrometheusHandle> {
    if let Some(handle) = METRICS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
        AppError::Internal(anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))
    })?;
    describe_metrics();

    METRICS.get_or_init(Metrics::new);
    Ok(METRICS_HANDLE.get_or_init(|| handle).clone())
}

fn describe_metrics() {
    describe_counter!(
        "ledger_accounts_created_total",
        Unit::Count,
        "Total number of accounts created"
    );
    describe_counter!(
        "ledger_journal_entries_created_total",
        Unit::Count,
        "Total number of journal entries created"
    );
    describe_counter!(
        "ledger_journal_entries_posted_total",
        Unit::Count,
        "Total number of journal entries posted"
    );
    describe_histogram!(
        "ledger_journal_entry_line_count",
        Unit::Count,
        "Number of lines per journal entry"
    );

    describe_counter!(

        "ledger_payments_recorded_total",

        Unit::Count,

        "Total number of payments recorded"

    );
    describe_counter!(
        "ledger_notes_created_total",
        Unit::Count,
        "Total number of credit and debit notes created"
    );

    describe_counter!(

        "ledger_rejections_total",

        Unit::Count,

        "Operations rejected, by operation and error kind"

    );
    describe_histogram!(
        "ledger_write_duration_ms",
        Unit::Milliseconds,
        "Write operation latency in milliseconds"
    );
}

/// Returns the global metrics instance.
pub fn get_metrics() -> &'static Metrics {
    METRICS.get_or_init(Metrics::new)
}
