//! Append-only progress log, one correlation key per line.
//!
//! On startup the whole file is loaded into a set so the producer can skip
//! keys a previous run already finished. Writes are buffered; the consumer
//! flushes on the same cadence as the sink, so a crash loses at most one
//! flush interval of completed work.

use std::collections::HashSet;
use std::path::Path;

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tracing::info;

use unfurl_common::UnfurlError;

pub struct ProgressLog {
    writer: BufWriter<File>,
}

impl ProgressLog {
    /// Open (creating if absent) and return the log along with the set of
    /// correlation keys already completed by earlier runs.
    pub async fn open(path: &Path) -> Result<(Self, HashSet<String>), UnfurlError> {
        let mut done = HashSet::new();
        if path.exists() {
            let mut contents = String::new();
            File::open(path)
                .await
                .map_err(|e| UnfurlError::Progress(format!("open {}: {e}", path.display())))?
                .read_to_string(&mut contents)
                .await
                .map_err(|e| UnfurlError::Progress(format!("read {}: {e}", path.display())))?;
            done.extend(contents.lines().filter(|l| !l.is_empty()).map(str::to_string));
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| UnfurlError::Progress(format!("append {}: {e}", path.display())))?;

        info!(path = %path.display(), already_done = done.len(), "Progress log opened");
        Ok((
            Self {
                writer: BufWriter::new(file),
            },
            done,
        ))
    }

    pub async fn append(&mut self, correlation_key: &str) -> Result<(), UnfurlError> {
        self.writer
            .write_all(correlation_key.as_bytes())
            .await
            .map_err(|e| UnfurlError::Progress(e.to_string()))?;
        self.writer
            .write_all(b"\n")
            .await
            .map_err(|e| UnfurlError::Progress(e.to_string()))?;
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<(), UnfurlError> {
        self.writer
            .flush()
            .await
            .map_err(|e| UnfurlError::Progress(e.to_string()))
    }
}
