//! Durable output for resolution outcomes.
//!
//! The pipeline treats the sink as a single tolerant collaborator: one
//! failing write is logged and skipped, never fatal. Anything that can
//! take `(correlation key, outcome)` pairs can sit behind this trait — a
//! document-store upsert would implement it the same way the file sink
//! does.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::info;

use crate::types::ResolutionOutcome;

#[async_trait]
pub trait OutcomeSink: Send {
    async fn write(&mut self, outcome: &ResolutionOutcome) -> Result<()>;
    async fn flush(&mut self) -> Result<()>;
}

/// Append-mode sink writing one JSON object per line.
pub struct JsonlSink {
    writer: BufWriter<File>,
}

impl JsonlSink {
    pub async fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .with_context(|| format!("open output file {}", path.display()))?;
        info!(path = %path.display(), "JSONL sink opened");
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

#[async_trait]
impl OutcomeSink for JsonlSink {
    async fn write(&mut self, outcome: &ResolutionOutcome) -> Result<()> {
        let line = serde_json::to_string(outcome).context("serialize outcome")?;
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        self.writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unfurl_resolver::{Resolution, ResolutionStatus};

    #[tokio::test]
    async fn writes_one_json_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        let mut sink = JsonlSink::create(&path).await.unwrap();

        for key in ["1:0", "2:0"] {
            sink.write(&ResolutionOutcome {
                correlation_key: key.to_string(),
                resolution: Resolution {
                    short_url: "http://bit.ly/x".to_string(),
                    resolved_url: Some("http://example.com/".to_string()),
                    hop_chain: vec![],
                    video_id: None,
                    status: ResolutionStatus::Resolved,
                },
            })
            .await
            .unwrap();
        }
        sink.flush().await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["correlation_key"], "1:0");
        assert_eq!(first["status"], "resolved");
        assert_eq!(first["resolved_url"], "http://example.com/");
    }
}
