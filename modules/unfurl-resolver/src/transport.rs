//! One-hop HTTP transport.
//!
//! The resolver needs to observe every redirect individually, so the real
//! client is built with redirect following disabled. The trait seam keeps
//! the resolver testable without a network.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::outcome::FailureKind;

/// Response to a single hop request, reduced to what redirect-chasing needs.
#[derive(Debug, Clone)]
pub struct HopResponse {
    pub status: u16,
    /// Raw `Location` header value, possibly relative.
    pub location: Option<String>,
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl TransportError {
    pub fn kind(&self) -> FailureKind {
        match self {
            TransportError::Timeout => FailureKind::Timeout,
            TransportError::Connect(_) => FailureKind::Connect,
            TransportError::InvalidUrl(_) => FailureKind::InvalidUrl,
            TransportError::Protocol(_) => FailureKind::Protocol,
        }
    }
}

#[async_trait]
pub trait HopTransport: Send + Sync {
    /// Issue one request without following redirects.
    async fn fetch_hop(&self, url: &str) -> Result<HopResponse, TransportError>;
}

/// reqwest-backed transport with redirects disabled.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(http_timeout: Duration, user_agent: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(http_timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| TransportError::Protocol(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HopTransport for HttpTransport {
    async fn fetch_hop(&self, url: &str) -> Result<HopResponse, TransportError> {
        let response = self.client.get(url).send().await.map_err(classify)?;

        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        Ok(HopResponse {
            status: response.status().as_u16(),
            location,
        })
    }
}

fn classify(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_connect() {
        TransportError::Connect(error.to_string())
    } else if error.is_builder() || error.is_request() {
        TransportError::InvalidUrl(error.to_string())
    } else {
        TransportError::Protocol(error.to_string())
    }
}
