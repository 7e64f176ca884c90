//! Hop-by-hop redirect resolution.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use url::Url;

use unfurl_common::urls::parse_video_id;

use crate::outcome::{FailureKind, Resolution, ResolutionStatus};
use crate::transport::HopTransport;

/// Redirect-class status codes treated as "follow the Location header".
const REDIRECT_CODES: [u16; 4] = [301, 302, 303, 307];

/// Resolves one short URL at a time by chasing redirects through a
/// [`HopTransport`]. Holds no state beyond the transport's connection pool;
/// cache interaction belongs to the worker, not here.
pub struct Resolver {
    transport: Arc<dyn HopTransport>,
    max_hops: usize,
    per_hop_timeout: Duration,
}

impl Resolver {
    pub fn new(transport: Arc<dyn HopTransport>, max_hops: usize, per_hop_timeout: Duration) -> Self {
        Self {
            transport,
            max_hops,
            per_hop_timeout,
        }
    }

    /// Follow `url` to its terminal destination.
    ///
    /// URLs matching a known video-link pattern return immediately with no
    /// network call. Known simplification: a pattern-matched URL is never
    /// checked for being itself a redirector.
    pub async fn resolve(&self, url: &str) -> Resolution {
        if let Some(video_id) = parse_video_id(url) {
            debug!(url, video_id, "Pattern matched, skipping network");
            return Resolution {
                short_url: url.to_string(),
                resolved_url: Some(url.to_string()),
                hop_chain: Vec::new(),
                video_id: Some(video_id),
                status: ResolutionStatus::PatternMatched,
            };
        }

        let mut current = url.to_string();
        // Every URL reached after the input, including (on success) the
        // terminal destination, which is popped off before returning.
        let mut visited: Vec<String> = Vec::new();
        let mut redirects = 0usize;

        loop {
            let response = match tokio::time::timeout(
                self.per_hop_timeout,
                self.transport.fetch_hop(&current),
            )
            .await
            {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    debug!(url, hop = current.as_str(), error = %e, "Hop failed");
                    return Resolution::failed(url, visited, e.kind(), e.to_string());
                }
                Err(_) => {
                    debug!(url, hop = current.as_str(), "Hop timed out");
                    return Resolution::failed(
                        url,
                        visited,
                        FailureKind::Timeout,
                        format!("no response within {:?}", self.per_hop_timeout),
                    );
                }
            };

            if !REDIRECT_CODES.contains(&response.status) {
                visited.pop();
                return self.terminal(url, current, visited, ResolutionStatus::Resolved);
            }

            let Some(location) = response.location else {
                return Resolution::failed(
                    url,
                    visited,
                    FailureKind::MissingLocation,
                    format!("redirect ({}) without a Location header", response.status),
                );
            };

            // Location may be relative; join it against the current hop.
            let next = match Url::parse(&current).and_then(|base| base.join(&location)) {
                Ok(joined) => joined.to_string(),
                Err(e) => {
                    return Resolution::failed(
                        url,
                        visited,
                        FailureKind::InvalidUrl,
                        format!("unusable Location {location:?}: {e}"),
                    );
                }
            };

            if redirects == self.max_hops {
                debug!(url, hops = redirects, "Hop limit reached");
                visited.pop();
                return self.terminal(url, current, visited, ResolutionStatus::TimedOut);
            }

            debug!(url, from = current.as_str(), to = next.as_str(), "Following redirect");
            visited.push(next.clone());
            current = next;
            redirects += 1;
        }
    }

    /// Build the terminal resolution, re-running pattern matching against
    /// the destination so chains ending on a video page carry the ID.
    fn terminal(
        &self,
        short_url: &str,
        destination: String,
        hop_chain: Vec<String>,
        status: ResolutionStatus,
    ) -> Resolution {
        let video_id = parse_video_id(&destination);
        let status = if video_id.is_some() && status == ResolutionStatus::Resolved {
            ResolutionStatus::PatternMatched
        } else {
            status
        };
        Resolution {
            short_url: short_url.to_string(),
            resolved_url: Some(destination),
            hop_chain,
            video_id,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;

    fn resolver(transport: ScriptedTransport, max_hops: usize) -> Resolver {
        Resolver::new(Arc::new(transport), max_hops, Duration::from_millis(200))
    }

    #[tokio::test]
    async fn pattern_match_makes_no_network_calls() {
        let transport = ScriptedTransport::new();
        let calls = transport.call_counter();
        let resolver = resolver(transport, 13);

        let resolution = resolver.resolve("http://youtu.be/dQw4w9WgXcQ").await;

        assert_eq!(resolution.status, ResolutionStatus::PatternMatched);
        assert_eq!(resolution.video_id.as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(resolution.resolved_url.as_deref(), Some("http://youtu.be/dQw4w9WgXcQ"));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn follows_chain_and_records_intermediates() {
        let transport = ScriptedTransport::new()
            .redirect("http://a.example/", "http://b.example/")
            .redirect("http://b.example/", "http://c.example/")
            .ok("http://c.example/");
        let resolver = resolver(transport, 13);

        let resolution = resolver.resolve("http://a.example/").await;

        assert_eq!(resolution.status, ResolutionStatus::Resolved);
        assert_eq!(resolution.resolved_url.as_deref(), Some("http://c.example/"));
        assert_eq!(resolution.hop_chain, vec!["http://b.example/"]);
    }

    #[tokio::test]
    async fn joins_relative_locations() {
        let transport = ScriptedTransport::new()
            .redirect("http://a.example/go", "/landing")
            .ok("http://a.example/landing");
        let resolver = resolver(transport, 13);

        let resolution = resolver.resolve("http://a.example/go").await;

        assert_eq!(resolution.resolved_url.as_deref(), Some("http://a.example/landing"));
    }

    #[tokio::test]
    async fn redirect_without_location_fails() {
        let transport = ScriptedTransport::new().redirect_missing_location("http://a.example/");
        let resolver = resolver(transport, 13);

        let resolution = resolver.resolve("http://a.example/").await;

        assert!(matches!(
            resolution.status,
            ResolutionStatus::Failed {
                kind: FailureKind::MissingLocation,
                ..
            }
        ));
        assert!(resolution.resolved_url.is_none());
    }

    #[tokio::test]
    async fn connect_error_preserves_class() {
        let transport = ScriptedTransport::new().refuse("http://down.example/");
        let resolver = resolver(transport, 13);

        let resolution = resolver.resolve("http://down.example/").await;

        assert!(matches!(
            resolution.status,
            ResolutionStatus::Failed {
                kind: FailureKind::Connect,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn per_hop_timeout_fails_with_timeout_class() {
        let transport = ScriptedTransport::new().hang("http://slow.example/");
        let resolver = resolver(transport, 13);

        let resolution = resolver.resolve("http://slow.example/").await;

        assert!(matches!(
            resolution.status,
            ResolutionStatus::Failed {
                kind: FailureKind::Timeout,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn chain_of_exactly_max_hops_resolves() {
        let transport = ScriptedTransport::new()
            .redirect("http://0.example/", "http://1.example/")
            .redirect("http://1.example/", "http://2.example/")
            .ok("http://2.example/");
        let resolver = resolver(transport, 2);

        let resolution = resolver.resolve("http://0.example/").await;

        assert_eq!(resolution.status, ResolutionStatus::Resolved);
        assert_eq!(resolution.resolved_url.as_deref(), Some("http://2.example/"));
    }

    #[tokio::test]
    async fn chain_over_max_hops_times_out_at_limit() {
        let transport = ScriptedTransport::new()
            .redirect("http://0.example/", "http://1.example/")
            .redirect("http://1.example/", "http://2.example/")
            .redirect("http://2.example/", "http://3.example/")
            .ok("http://3.example/");
        let resolver = resolver(transport, 2);

        let resolution = resolver.resolve("http://0.example/").await;

        assert_eq!(resolution.status, ResolutionStatus::TimedOut);
        // Destination is the last hop actually reached, not the one beyond
        // the limit.
        assert_eq!(resolution.resolved_url.as_deref(), Some("http://2.example/"));
        assert_eq!(resolution.hop_chain, vec!["http://1.example/"]);
    }

    #[tokio::test]
    async fn final_hop_pattern_match_sets_video_id() {
        let transport = ScriptedTransport::new()
            .redirect("http://bit.ly/xyz", "http://youtu.be/dQw4w9WgXcQ")
            .ok("http://youtu.be/dQw4w9WgXcQ");
        let resolver = resolver(transport, 13);

        let resolution = resolver.resolve("http://bit.ly/xyz").await;

        assert_eq!(resolution.status, ResolutionStatus::PatternMatched);
        assert_eq!(resolution.resolved_url.as_deref(), Some("http://youtu.be/dQw4w9WgXcQ"));
        assert_eq!(resolution.video_id.as_deref(), Some("dQw4w9WgXcQ"));
    }
}
