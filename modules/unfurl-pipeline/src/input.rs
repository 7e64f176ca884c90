//! Lazy input readers.
//!
//! Input is read one line at a time — a corpus can run to millions of
//! records and is never materialized. A malformed line is counted and
//! skipped; it must never stop the run.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::ValueEnum;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tracing::warn;

use unfurl_common::{clean_url, PostRecord};

use crate::stats::RunStats;
use crate::types::ResolutionRequest;

/// Anything that lazily yields resolution requests.
#[async_trait]
pub trait RequestSource: Send {
    /// Next candidate, or `None` once the input is exhausted.
    async fn next_request(&mut self) -> Option<ResolutionRequest>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    /// Line-delimited JSON post records (native or activity-streams shape).
    Posts,
    /// One raw short URL per line.
    Urls,
}

/// Reads line-delimited input and turns it into resolution requests.
///
/// Post records yield one request per embedded URL with correlation key
/// `{record_id}:{url_index}`; raw URL lists use the line number as the key.
pub struct RecordReader {
    lines: Lines<BufReader<File>>,
    format: InputFormat,
    stats: Arc<RunStats>,
    pending: VecDeque<ResolutionRequest>,
    line_no: u64,
}

impl RecordReader {
    pub async fn open(path: &Path, format: InputFormat, stats: Arc<RunStats>) -> Result<Self> {
        let file = File::open(path)
            .await
            .with_context(|| format!("open input file {}", path.display()))?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            format,
            stats,
            pending: VecDeque::new(),
            line_no: 0,
        })
    }

    fn ingest_line(&mut self, line: &str) {
        match self.format {
            InputFormat::Urls => {
                self.stats
                    .records_seen
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                self.pending.push_back(ResolutionRequest {
                    correlation_key: self.line_no.to_string(),
                    short_url: clean_url(line),
                });
            }
            InputFormat::Posts => {
                let value: serde_json::Value = match serde_json::from_str(line) {
                    Ok(v) => v,
                    Err(e) => {
                        warn!(line = self.line_no, error = %e, "Skipping unparseable input line");
                        self.stats
                            .malformed
                            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                        return;
                    }
                };
                let record = match PostRecord::from_json(&value) {
                    Ok(r) => r,
                    Err(e) => {
                        warn!(line = self.line_no, error = %e, "Skipping unrecognized record");
                        self.stats
                            .malformed
                            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                        return;
                    }
                };
                self.stats
                    .records_seen
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                for (index, url) in record.urls.iter().enumerate() {
                    self.pending.push_back(ResolutionRequest {
                        correlation_key: format!("{}:{}", record.id, index),
                        short_url: clean_url(url),
                    });
                }
            }
        }
    }
}

#[async_trait]
impl RequestSource for RecordReader {
    async fn next_request(&mut self) -> Option<ResolutionRequest> {
        loop {
            if let Some(request) = self.pending.pop_front() {
                return Some(request);
            }
            let line = match self.lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(e) => {
                    warn!(error = %e, "Input read error, treating as end of input");
                    return None;
                }
            };
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            self.ingest_line(line.trim());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    async fn drain(mut reader: RecordReader) -> Vec<ResolutionRequest> {
        let mut requests = Vec::new();
        while let Some(request) = reader.next_request().await {
            requests.push(request);
        }
        requests
    }

    #[tokio::test]
    async fn posts_mode_yields_one_request_per_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posts.jsonl");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            r#"{{"id_str":"42","text":"two links","entities":{{"urls":[{{"expanded_url":"http://bit.ly/a"}},{{"expanded_url":"bit.ly/b"}}]}}}}"#
        )
        .unwrap();

        let stats = Arc::new(RunStats::new());
        let reader = RecordReader::open(&path, InputFormat::Posts, stats.clone())
            .await
            .unwrap();
        let requests = drain(reader).await;

        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].correlation_key, "42:0");
        assert_eq!(requests[1].correlation_key, "42:1");
        // clean_url adds the missing scheme
        assert_eq!(requests[1].short_url, "http://bit.ly/b");
        assert_eq!(stats.snapshot().records_seen, 1);
    }

    #[tokio::test]
    async fn malformed_lines_are_counted_and_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posts.jsonl");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "{{not json").unwrap();
        writeln!(f).unwrap();
        writeln!(
            f,
            r#"{{"id_str":"7","text":"ok","entities":{{"urls":[{{"expanded_url":"http://bit.ly/c"}}]}}}}"#
        )
        .unwrap();

        let stats = Arc::new(RunStats::new());
        let reader = RecordReader::open(&path, InputFormat::Posts, stats.clone())
            .await
            .unwrap();
        let requests = drain(reader).await;

        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].correlation_key, "7:0");
        assert_eq!(stats.snapshot().malformed, 1);
    }

    #[tokio::test]
    async fn urls_mode_keys_by_line_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        std::fs::write(&path, "http://bit.ly/a\n\nhttp://bit.ly/b\n").unwrap();

        let stats = Arc::new(RunStats::new());
        let reader = RecordReader::open(&path, InputFormat::Urls, stats)
            .await
            .unwrap();
        let requests = drain(reader).await;

        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].correlation_key, "1");
        // Blank line 2 is skipped but still numbered
        assert_eq!(requests[1].correlation_key, "3");
    }
}
