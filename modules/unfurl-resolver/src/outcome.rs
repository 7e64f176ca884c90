//! Resolution result types.
//!
//! A resolution never returns `Err` — every way a chain can end maps to a
//! `ResolutionStatus`, so failure detail survives into the output instead
//! of being swallowed at the call site.

use serde::Serialize;

/// Why a resolution attempt ended without a terminal response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Connection refused, reset, or otherwise never established.
    Connect,
    /// Name resolution or request could not even be issued.
    InvalidUrl,
    /// The per-hop timeout elapsed.
    Timeout,
    /// A redirect-class response without a usable Location header.
    MissingLocation,
    /// Malformed status line, bad headers, or any other protocol error.
    Protocol,
}

/// Terminal state of one resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolutionStatus {
    /// Followed the chain to a non-redirect response.
    Resolved,
    /// A known video-link pattern matched (before any network call, or on
    /// the final destination of a followed chain).
    PatternMatched,
    /// Served from the in-process cache.
    CacheHit,
    /// The hop limit was exceeded; the destination is the last hop reached.
    TimedOut,
    /// Transport-level failure; the error class and message are preserved
    /// for diagnostics.
    Failed { kind: FailureKind, message: String },
}

/// Everything learned about one short URL.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub short_url: String,
    pub resolved_url: Option<String>,
    /// URLs visited between the short URL and the destination, in traversal
    /// order. On failure this holds every URL reached before the error.
    pub hop_chain: Vec<String>,
    pub video_id: Option<String>,
    #[serde(flatten)]
    pub status: ResolutionStatus,
}

impl Resolution {
    pub(crate) fn failed(short_url: &str, hop_chain: Vec<String>, kind: FailureKind, message: String) -> Self {
        Self {
            short_url: short_url.to_string(),
            resolved_url: None,
            hop_chain,
            video_id: None,
            status: ResolutionStatus::Failed { kind, message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_status_serializes_with_kind() {
        let resolution = Resolution::failed(
            "http://bit.ly/x",
            vec![],
            FailureKind::Connect,
            "connection refused".to_string(),
        );
        let json = serde_json::to_value(&resolution).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["kind"], "connect");
        assert_eq!(json["message"], "connection refused");
    }

    #[test]
    fn resolved_status_serializes_flat() {
        let resolution = Resolution {
            short_url: "http://bit.ly/x".to_string(),
            resolved_url: Some("http://example.com".to_string()),
            hop_chain: vec![],
            video_id: None,
            status: ResolutionStatus::Resolved,
        };
        let json = serde_json::to_value(&resolution).unwrap();
        assert_eq!(json["status"], "resolved");
        assert_eq!(json["resolved_url"], "http://example.com");
    }
}
