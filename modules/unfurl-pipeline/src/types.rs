use serde::Serialize;

use unfurl_resolver::Resolution;

/// One pending lookup. The correlation key re-associates the outcome with
/// its originating record after out-of-order completion; records with
/// several embedded URLs get one request (and one key) per URL.
#[derive(Debug, Clone)]
pub struct ResolutionRequest {
    pub correlation_key: String,
    pub short_url: String,
}

/// A completed lookup awaiting durable output.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionOutcome {
    pub correlation_key: String,
    #[serde(flatten)]
    pub resolution: Resolution,
}
