//! Producer → work queue → worker pool → result queue → consumer.
//!
//! All four stages run as independent tokio tasks talking only through the
//! two queues; the cache is the single piece of shared state and is
//! internally synchronized. End-of-work is signalled by closing the
//! channels (the producer drops the work sender, the workers drop the
//! result senders) rather than by a recv-timeout heuristic, so a long gap
//! in producer throughput can never shut the pool down early.

use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use unfurl_common::{Config, UnfurlError};
use unfurl_resolver::{
    HopTransport, Resolution, ResolutionCache, ResolutionStatus, Resolver,
};

use crate::input::RequestSource;
use crate::progress::ProgressLog;
use crate::sink::OutcomeSink;
use crate::stats::{RunStats, RunSummary};
use crate::types::{ResolutionOutcome, ResolutionRequest};

/// Durability bound: buffered output and progress are flushed at least this
/// often, independent of the batch-size trigger.
const FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// Cadence of the periodic counter log line.
const REPORT_INTERVAL: Duration = Duration::from_secs(10);

/// Run the full pipeline to completion (or until `shutdown` flips).
///
/// Returns the final counter snapshot. Per-item failures never surface
/// here; only progress-log I/O and task panics are fatal.
pub async fn run(
    config: &Config,
    transport: Arc<dyn HopTransport>,
    source: Box<dyn RequestSource>,
    sink: Box<dyn OutcomeSink>,
    progress: ProgressLog,
    done: HashSet<String>,
    stats: Arc<RunStats>,
    shutdown: watch::Receiver<bool>,
) -> Result<RunSummary, UnfurlError> {
    let (work_tx, work_rx) = mpsc::unbounded_channel::<ResolutionRequest>();
    let (result_tx, result_rx) = mpsc::unbounded_channel::<ResolutionOutcome>();
    let work_rx = Arc::new(Mutex::new(work_rx));

    let resolver = Arc::new(Resolver::new(
        transport,
        config.max_hops,
        Duration::from_secs(config.per_hop_timeout_secs),
    ));
    let cache = Arc::new(ResolutionCache::new());

    info!(
        workers = config.worker_count,
        max_hops = config.max_hops,
        already_done = done.len(),
        "Starting resolution pipeline"
    );

    let producer = tokio::spawn(run_producer(
        source,
        done,
        work_tx,
        stats.clone(),
        shutdown.clone(),
    ));

    let workers: Vec<JoinHandle<()>> = (0..config.worker_count)
        .map(|_| {
            tokio::spawn(run_worker(
                work_rx.clone(),
                result_tx.clone(),
                resolver.clone(),
                cache.clone(),
                stats.clone(),
                shutdown.clone(),
            ))
        })
        .collect();
    // Workers hold the only remaining result senders; when the last one
    // exits the consumer sees end-of-stream.
    drop(result_tx);

    let consumer = tokio::spawn(run_consumer(
        result_rx,
        sink,
        progress,
        config.result_flush_batch_size,
        stats.clone(),
    ));

    let reporter = tokio::spawn(report_counters(stats.clone()));

    producer
        .await
        .map_err(|e| UnfurlError::Anyhow(anyhow::anyhow!("producer task failed: {e}")))?;
    for worker in workers {
        worker
            .await
            .map_err(|e| UnfurlError::Anyhow(anyhow::anyhow!("worker task failed: {e}")))?;
    }
    consumer
        .await
        .map_err(|e| UnfurlError::Anyhow(anyhow::anyhow!("consumer task failed: {e}")))??;
    reporter.abort();

    info!(cached_urls = cache.len(), "Pipeline drained");
    Ok(stats.snapshot())
}

/// Reads the input lazily and enqueues requests, filtering out correlation
/// keys a previous run already completed and keys already enqueued this
/// run (duplicate records in a dump must not reach the progress log
/// twice). Dropping `work_tx` on exit is the end-of-work signal.
async fn run_producer(
    mut source: Box<dyn RequestSource>,
    done: HashSet<String>,
    work_tx: mpsc::UnboundedSender<ResolutionRequest>,
    stats: Arc<RunStats>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut enqueued: HashSet<String> = HashSet::new();
    loop {
        let next = tokio::select! {
            item = source.next_request() => item,
            _ = shutdown.changed() => {
                info!("Interrupt received, closing work queue");
                break;
            }
        };
        let Some(request) = next else { break };

        if done.contains(&request.correlation_key) {
            stats.skipped_done.fetch_add(1, Ordering::Relaxed);
            continue;
        }
        if !enqueued.insert(request.correlation_key.clone()) {
            stats.skipped_duplicate.fetch_add(1, Ordering::Relaxed);
            continue;
        }
        stats.requests_enqueued.fetch_add(1, Ordering::Relaxed);
        if work_tx.send(request).is_err() {
            // All workers gone; nothing left to produce for.
            break;
        }
    }
}

/// One worker: pull → cache lookup → resolve on miss → emit.
async fn run_worker(
    work_rx: Arc<Mutex<mpsc::UnboundedReceiver<ResolutionRequest>>>,
    result_tx: mpsc::UnboundedSender<ResolutionOutcome>,
    resolver: Arc<Resolver>,
    cache: Arc<ResolutionCache>,
    stats: Arc<RunStats>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let request = {
            let mut rx = work_rx.lock().await;
            tokio::select! {
                item = rx.recv() => match item {
                    Some(request) => request,
                    None => break,
                },
                _ = shutdown.changed() => break,
            }
        };
        // Unclaimed queue entries are dropped on interrupt; they were never
        // marked done, so a restart reprocesses them.
        if *shutdown.borrow() {
            break;
        }

        let resolution = match cache.lookup(&request.short_url) {
            Some(cached) => {
                stats.cache_hits.fetch_add(1, Ordering::Relaxed);
                Resolution {
                    short_url: request.short_url.clone(),
                    resolved_url: cached.resolved_url,
                    hop_chain: cached.hop_chain,
                    video_id: cached.video_id,
                    status: ResolutionStatus::CacheHit,
                }
            }
            None => {
                let resolution = resolver.resolve(&request.short_url).await;
                cache.store_chain(&resolution);
                match resolution.status {
                    ResolutionStatus::Resolved => {
                        stats.resolved.fetch_add(1, Ordering::Relaxed);
                    }
                    ResolutionStatus::PatternMatched => {
                        stats.pattern_matched.fetch_add(1, Ordering::Relaxed);
                    }
                    ResolutionStatus::TimedOut => {
                        stats.timed_out.fetch_add(1, Ordering::Relaxed);
                    }
                    ResolutionStatus::Failed { .. } => {
                        stats.failed.fetch_add(1, Ordering::Relaxed);
                    }
                    ResolutionStatus::CacheHit => unreachable!("resolver never returns CacheHit"),
                }
                resolution
            }
        };

        if result_tx
            .send(ResolutionOutcome {
                correlation_key: request.correlation_key,
                resolution,
            })
            .is_err()
        {
            break;
        }
    }
}

/// Drains the result queue, writes through the sink, and records progress.
/// A failing sink write is logged and the key is deliberately NOT marked
/// done, so the next run retries it.
async fn run_consumer(
    mut result_rx: mpsc::UnboundedReceiver<ResolutionOutcome>,
    mut sink: Box<dyn OutcomeSink>,
    mut progress: ProgressLog,
    flush_batch_size: usize,
    stats: Arc<RunStats>,
) -> Result<(), UnfurlError> {
    let mut pending = 0usize;
    let mut flush_tick = tokio::time::interval(FLUSH_INTERVAL);
    flush_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    flush_tick.tick().await; // first tick completes immediately

    loop {
        tokio::select! {
            item = result_rx.recv() => {
                let Some(outcome) = item else { break };
                match sink.write(&outcome).await {
                    Ok(()) => {
                        progress.append(&outcome.correlation_key).await?;
                        stats.outcomes_written.fetch_add(1, Ordering::Relaxed);
                        pending += 1;
                        if pending >= flush_batch_size {
                            sink.flush().await.map_err(UnfurlError::Anyhow)?;
                            progress.flush().await?;
                            pending = 0;
                        }
                    }
                    Err(e) => {
                        warn!(
                            correlation_key = outcome.correlation_key.as_str(),
                            short_url = outcome.resolution.short_url.as_str(),
                            error = %e,
                            "Sink write failed, will retry on next run"
                        );
                        stats.write_failures.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
            _ = flush_tick.tick() => {
                if pending > 0 {
                    sink.flush().await.map_err(UnfurlError::Anyhow)?;
                    progress.flush().await?;
                    pending = 0;
                }
            }
        }
    }

    sink.flush().await.map_err(UnfurlError::Anyhow)?;
    progress.flush().await?;
    Ok(())
}

/// Logs counter totals at a fixed cadence until aborted.
async fn report_counters(stats: Arc<RunStats>) {
    let mut tick = tokio::time::interval(REPORT_INTERVAL);
    tick.tick().await;
    loop {
        tick.tick().await;
        let s = stats.snapshot();
        info!(
            records = s.records_seen,
            enqueued = s.requests_enqueued,
            cache_hits = s.cache_hits,
            resolved = s.resolved,
            pattern_matched = s.pattern_matched,
            failed = s.failed,
            timed_out = s.timed_out,
            written = s.outcomes_written,
            "Pipeline progress"
        );
    }
}
