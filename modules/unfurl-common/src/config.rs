use std::env;

use crate::error::UnfurlError;

/// Pipeline configuration loaded from environment variables.
/// Every field has a default; CLI flags may override after loading.
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of concurrent resolver workers.
    pub worker_count: usize,

    /// Maximum redirect hops to follow before giving up on a chain.
    pub max_hops: usize,

    /// Timeout applied to each individual hop request.
    pub per_hop_timeout_secs: u64,

    /// Overall connect/read timeout for the HTTP client.
    pub http_timeout_secs: u64,

    /// How many completed outcomes to buffer before flushing the sink
    /// and progress log.
    pub result_flush_batch_size: usize,

    /// User-Agent header sent on every hop request.
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worker_count: 100,
            max_hops: 13,
            per_hop_timeout_secs: 13,
            http_timeout_secs: 13,
            result_flush_batch_size: 200,
            user_agent: "unfurl/0.1 (+https://github.com/unfurl)".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, UnfurlError> {
        let defaults = Config::default();
        Ok(Self {
            worker_count: parsed_env("UNFURL_WORKER_COUNT", defaults.worker_count)?,
            max_hops: parsed_env("UNFURL_MAX_HOPS", defaults.max_hops)?,
            per_hop_timeout_secs: parsed_env(
                "UNFURL_PER_HOP_TIMEOUT_SECS",
                defaults.per_hop_timeout_secs,
            )?,
            http_timeout_secs: parsed_env("UNFURL_HTTP_TIMEOUT_SECS", defaults.http_timeout_secs)?,
            result_flush_batch_size: parsed_env(
                "UNFURL_RESULT_FLUSH_BATCH",
                defaults.result_flush_batch_size,
            )?,
            user_agent: env::var("UNFURL_USER_AGENT").unwrap_or(defaults.user_agent),
        })
    }

    /// Semantic validation. Zero workers or zero hops would deadlock the
    /// pipeline, so these are fatal rather than silently clamped.
    pub fn validate(&self) -> Result<(), UnfurlError> {
        if self.worker_count == 0 {
            return Err(UnfurlError::Config(
                "worker_count must be at least 1".to_string(),
            ));
        }
        if self.max_hops == 0 {
            return Err(UnfurlError::Config(
                "max_hops must be at least 1".to_string(),
            ));
        }
        if self.per_hop_timeout_secs == 0 || self.http_timeout_secs == 0 {
            return Err(UnfurlError::Config(
                "timeouts must be at least 1 second".to_string(),
            ));
        }
        if self.result_flush_batch_size == 0 {
            return Err(UnfurlError::Config(
                "result_flush_batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, UnfurlError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| UnfurlError::Config(format!("{key} has an invalid value: {raw:?}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.worker_count, 100);
        assert_eq!(config.max_hops, 13);
    }

    #[test]
    fn zero_workers_rejected() {
        let config = Config {
            worker_count: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_flush_batch_rejected() {
        let config = Config {
            result_flush_batch_size: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
