use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up in the rendered output).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "deals_articles_fetched_total",
            "Articles returned by news providers."
        );
        describe_counter!(
            "deals_provider_errors_total",
            "Provider fetch/parse errors."
        );
        describe_counter!(
            "deals_articles_classified_total",
            "Articles passing the deal classifier."
        );
        describe_counter!(
            "deals_oracle_errors_total",
            "LLM oracle calls that failed."
        );
        describe_counter!(
            "deals_parse_failures_total",
            "LLM responses without a recoverable JSON object."
        );
        describe_counter!("deals_extracted_total", "Structured deals extracted.");
        describe_counter!(
            "deals_dedup_removed_total",
            "Deals merged away by the deduplicator."
        );
        describe_counter!("deals_persisted_total", "Rows written across backends.");
        describe_histogram!("deals_fetch_parse_ms", "Provider parse time in milliseconds.");
        describe_histogram!("deals_oracle_ms", "LLM oracle latency in milliseconds.");
        describe_gauge!(
            "deals_pipeline_last_run_ts",
            "Unix ts when the pipeline last ran."
        );
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install a process-wide Prometheus recorder.
    pub fn install() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        ensure_metrics_described();
        Ok(Self { handle })
    }

    /// Prometheus exposition text for everything recorded so far.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}
