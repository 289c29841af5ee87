use std::sync::Arc;
use tracing::{error, info, warn};

use job_harvester::store::{JsonFileStore, PersistenceGate};
use job_harvester::{load_harvest_config, CancelToken, HarvestRunner, ScrapeSession};

struct CliArgs {
    max_records: Option<usize>,
    store_path: Option<String>,
    queries: Vec<String>,
    no_warmup: bool,
}

fn parse_args() -> CliArgs {
    let mut out = CliArgs {
        max_records: None,
        store_path: None,
        queries: Vec::new(),
        no_warmup: false,
    };
    let mut args = std::env::args().skip(1).peekable();
    while let Some(a) = args.next() {
        match a.as_str() {
            "--max-jobs" => {
                if let Some(v) = args.next() {
                    if let Ok(n) = v.parse::<usize>() {
                        out.max_records = Some(n);
                    }
                }
            }
            "--store" => {
                if let Some(v) = args.next() {
                    out.store_path = Some(v);
                }
            }
            "--query" => {
                if let Some(v) = args.next() {
                    out.queries.push(v);
                }
            }
            "--no-warmup" => out.no_warmup = true,
            other => {
                if let Some(rest) = other.strip_prefix("--max-jobs=") {
                    if let Ok(n) = rest.parse::<usize>() {
                        out.max_records = Some(n);
                    }
                } else if let Some(rest) = other.strip_prefix("--store=") {
                    out.store_path = Some(rest.to_string());
                } else if let Some(rest) = other.strip_prefix("--query=") {
                    out.queries.push(rest.to_string());
                }
            }
        }
    }
    out
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let args = parse_args();
    let mut cfg = load_harvest_config();
    if let Some(n) = args.max_records {
        cfg.max_records = n;
    }
    if let Some(p) = args.store_path {
        cfg.store_path = p;
    }
    if !args.queries.is_empty() {
        cfg.queries = args.queries;
    }
    if args.no_warmup {
        cfg.warm_up = false;
    }

    info!("🎯 Job harvester starting");
    info!(
        "Target: {} records from {} across {} queries",
        cfg.max_records,
        cfg.source,
        cfg.queries.len()
    );

    let store = Arc::new(JsonFileStore::open(&cfg.store_path).await?);
    let gate = PersistenceGate::new(store, cfg.fuzzy_dedup);

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("🛑 Interrupt received - finishing current step, then stopping");
                cancel.cancel();
            }
        });
    }

    // Launch failure is fatal: report and exit, no retry loop.
    let session = match ScrapeSession::launch().await {
        Ok(s) => s,
        Err(e) => {
            error!("❌ Could not start a browser session: {}", e);
            error!("Troubleshooting:");
            error!("  1. Install Chrome or Chromium (or set CHROME_EXECUTABLE)");
            error!("  2. Check that the sandbox restrictions allow a headless launch");
            std::process::exit(1);
        }
    };

    if cfg.warm_up && !cancel.is_cancelled() {
        session.warm_up(&cfg).await;
    }

    let runner = HarvestRunner::new(cfg, gate);
    let outcome = runner.run(&session, &cancel).await;

    // The session is released on every exit path.
    session.close().await;

    match outcome {
        Ok(report) => {
            info!("📊 HARVEST SUMMARY");
            info!(
                "Queries: {} attempted, {} failed",
                report.queries_attempted, report.queries_failed
            );
            info!("Records: {} extracted", report.extracted);
            info!(
                "Store: {} saved, {} skipped, {} errors",
                report.save.saved,
                report.save.skipped,
                report.save.errors.len()
            );
            for sample in &report.save.samples {
                info!("  saved: {}", sample);
            }
            for err in &report.save.errors {
                warn!("  error: {} - {}", err.title, err.reason);
            }
            for shot in &report.screenshots {
                info!("  screenshot: {}", shot);
            }
            info!("🎉 Harvest complete");
            Ok(())
        }
        Err(e) => {
            error!("❌ Harvest failed: {}", e);
            std::process::exit(2);
        }
    }
}
