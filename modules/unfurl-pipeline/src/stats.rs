//! Shared run counters.
//!
//! Every stage holds the same `Arc<RunStats>` and bumps whichever counters
//! it owns; nothing here is ambient module state.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct RunStats {
    pub records_seen: AtomicU64,
    pub malformed: AtomicU64,
    pub requests_enqueued: AtomicU64,
    pub skipped_done: AtomicU64,
    pub skipped_duplicate: AtomicU64,
    pub cache_hits: AtomicU64,
    pub resolved: AtomicU64,
    pub pattern_matched: AtomicU64,
    pub failed: AtomicU64,
    pub timed_out: AtomicU64,
    pub outcomes_written: AtomicU64,
    pub write_failures: AtomicU64,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> RunSummary {
        RunSummary {
            records_seen: self.records_seen.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            requests_enqueued: self.requests_enqueued.load(Ordering::Relaxed),
            skipped_done: self.skipped_done.load(Ordering::Relaxed),
            skipped_duplicate: self.skipped_duplicate.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            resolved: self.resolved.load(Ordering::Relaxed),
            pattern_matched: self.pattern_matched.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            outcomes_written: self.outcomes_written.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the counters, for logging and the final summary.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub records_seen: u64,
    pub malformed: u64,
    pub requests_enqueued: u64,
    pub skipped_done: u64,
    pub skipped_duplicate: u64,
    pub cache_hits: u64,
    pub resolved: u64,
    pub pattern_matched: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub outcomes_written: u64,
    pub write_failures: u64,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Unfurl Run Complete ===")?;
        writeln!(f, "Records seen:      {}", self.records_seen)?;
        writeln!(f, "Malformed skipped: {}", self.malformed)?;
        writeln!(f, "Requests enqueued: {}", self.requests_enqueued)?;
        writeln!(f, "Already done:      {}", self.skipped_done)?;
        writeln!(f, "Duplicate keys:    {}", self.skipped_duplicate)?;
        writeln!(f, "Cache hits:        {}", self.cache_hits)?;
        writeln!(f, "Resolved:          {}", self.resolved)?;
        writeln!(f, "Pattern matched:   {}", self.pattern_matched)?;
        writeln!(f, "Failed:            {}", self.failed)?;
        writeln!(f, "Timed out:         {}", self.timed_out)?;
        writeln!(f, "Outcomes written:  {}", self.outcomes_written)?;
        writeln!(f, "Write failures:    {}", self.write_failures)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_increments() {
        let stats = RunStats::new();
        stats.records_seen.fetch_add(3, Ordering::Relaxed);
        stats.cache_hits.fetch_add(1, Ordering::Relaxed);

        let summary = stats.snapshot();
        assert_eq!(summary.records_seen, 3);
        assert_eq!(summary.cache_hits, 1);
        assert_eq!(summary.failed, 0);
    }

    #[test]
    fn summary_display_lists_totals() {
        let stats = RunStats::new();
        stats.resolved.fetch_add(7, Ordering::Relaxed);
        let rendered = stats.snapshot().to_string();
        assert!(rendered.contains("Resolved:          7"));
    }
}
