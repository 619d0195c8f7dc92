//! Defense deal pipeline: binary entrypoint.
//! Loads config, wires fetcher / oracle / writers, runs the pipeline once and
//! prints a summary.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use defense_deal_pipeline::bootstrap::build_pipeline;
use defense_deal_pipeline::config::PipelineConfig;
use defense_deal_pipeline::metrics::Metrics;
use defense_deal_pipeline::PipelineReport;

#[derive(Debug, Parser)]
#[command(name = "defense-deal-pipeline", version, about = "Extract defense deals from news")]
struct Args {
    /// Pipeline config (TOML). Defaults to $DEAL_PIPELINE_CONFIG, then config/pipeline.toml.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Search query; repeatable. Replaces the configured queries.
    #[arg(long = "query", short = 'q')]
    queries: Vec<String>,

    /// Emit JSON log lines instead of compact text.
    #[arg(long, env = "DEAL_PIPELINE_JSON_LOGS")]
    json_logs: bool,

    /// Print Prometheus metrics after the run.
    #[arg(long)]
    print_metrics: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("defense_deal_pipeline=info,warn"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

fn print_summary(report: &PipelineReport) {
    println!("fetched:            {}", report.fetched);
    println!("after keyword gate: {}", report.after_keyword_filter);
    println!("classified as deal: {}", report.classified);
    println!("skipped (empty):    {}", report.skipped_empty);
    println!("oracle failures:    {}", report.oracle_failures);
    println!("parse failures:     {}", report.parse_failures);
    println!("extracted:          {}", report.extracted);
    println!("unique deals:       {}", report.deals.len());
    for d in &report.deals {
        println!(
            "  {} | {} <- {} | value={} | conf={:.2} | {}",
            d.ingestion_timestamp_iso(),
            d.fields.buyer.as_deref().unwrap_or("?"),
            d.fields.seller.as_deref().unwrap_or("?"),
            d.deal_value_normalized
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".to_string()),
            d.confidence,
            d.source_url()
        );
    }
    for w in &report.writes {
        match &w.result {
            Ok(r) => println!(
                "{:<8} written={} skipped={} failed={}",
                w.writer, r.written, r.skipped_duplicates, r.failed
            ),
            Err(e) => println!("{:<8} error: {e}", w.writer),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    init_tracing(args.json_logs);

    // Metrics are diagnostics only; a recorder failure never fails the run.
    let metrics = if args.print_metrics {
        Metrics::install()
            .map_err(|e| warn!(error = ?e, "metrics recorder unavailable"))
            .ok()
    } else {
        None
    };

    let cfg = match &args.config {
        Some(p) => PipelineConfig::load_from(p),
        None => PipelineConfig::load_default(),
    }
    .context("loading pipeline config")?;

    let queries = if args.queries.is_empty() {
        cfg.fetch.queries.clone()
    } else {
        args.queries.clone()
    };

    let pipeline = build_pipeline(&cfg)
        .await
        .context("building pipeline from config")?;
    info!(target: "pipeline", queries = queries.len(), "starting run");

    let report = pipeline.run(&queries).await;
    print_summary(&report);

    if let Some(m) = metrics {
        println!("{}", m.render());
    }
    Ok(())
}
