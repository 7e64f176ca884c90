use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use unfurl_common::Config;
use unfurl_pipeline::{InputFormat, JsonlSink, ProgressLog, RecordReader, RunStats};
use unfurl_resolver::HttpTransport;

#[derive(Debug, Parser)]
#[command(name = "unfurl", about = "Resolve shortened URLs from social media post archives")]
struct Cli {
    /// Line-delimited input file (post records or raw URLs).
    input: PathBuf,

    /// Shape of the input file.
    #[arg(long, value_enum, default_value = "posts")]
    format: InputFormat,

    /// Output file, one resolution outcome per line.
    #[arg(long, default_value = "resolved.jsonl")]
    output: PathBuf,

    /// Progress log for resumable runs.
    #[arg(long, default_value = "unfurl-progress.txt")]
    progress: PathBuf,

    /// Override the resolver worker count.
    #[arg(long, env = "UNFURL_WORKER_COUNT")]
    workers: Option<usize>,

    /// Override the redirect hop limit.
    #[arg(long, env = "UNFURL_MAX_HOPS")]
    max_hops: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("unfurl=info".parse()?))
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(workers) = cli.workers {
        config.worker_count = workers;
    }
    if let Some(max_hops) = cli.max_hops {
        config.max_hops = max_hops;
    }
    config.validate()?;

    let run_id = uuid::Uuid::new_v4();
    info!(
        %run_id,
        input = %cli.input.display(),
        output = %cli.output.display(),
        format = ?cli.format,
        "Unfurl starting..."
    );

    let stats = Arc::new(RunStats::new());
    let source = RecordReader::open(&cli.input, cli.format, stats.clone()).await?;
    let sink = JsonlSink::create(&cli.output).await?;
    let (progress, done) = ProgressLog::open(&cli.progress).await?;
    let transport = Arc::new(HttpTransport::new(
        std::time::Duration::from_secs(config.http_timeout_secs),
        &config.user_agent,
    )?);

    // Flip the shutdown flag on ctrl-c so in-flight work drains cleanly.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupt received, draining in-flight work");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                // Keep the sender alive; dropping it reads as a shutdown.
                warn!(error = %e, "Cannot listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        }
    });

    let summary = unfurl_pipeline::run(
        &config,
        transport,
        Box::new(source),
        Box::new(sink),
        progress,
        done,
        stats,
        shutdown_rx,
    )
    .await?;

    info!("Run complete. {summary}");
    Ok(())
}
