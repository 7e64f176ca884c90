//! Scripted transport for tests. No network, fully deterministic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::transport::{HopResponse, HopTransport, TransportError};

enum Scripted {
    Response(HopResponse),
    Refuse,
    /// Never respond; exercises the per-hop timeout.
    Hang,
}

/// Maps exact URLs to canned hop responses and counts every call.
pub struct ScriptedTransport {
    responses: Mutex<HashMap<String, Scripted>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared counter of transport calls made so far.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }

    pub fn redirect(self, url: &str, location: &str) -> Self {
        self.script(
            url,
            Scripted::Response(HopResponse {
                status: 301,
                location: Some(location.to_string()),
            }),
        )
    }

    pub fn redirect_missing_location(self, url: &str) -> Self {
        self.script(
            url,
            Scripted::Response(HopResponse {
                status: 302,
                location: None,
            }),
        )
    }

    pub fn ok(self, url: &str) -> Self {
        self.script(
            url,
            Scripted::Response(HopResponse {
                status: 200,
                location: None,
            }),
        )
    }

    pub fn refuse(self, url: &str) -> Self {
        self.script(url, Scripted::Refuse)
    }

    pub fn hang(self, url: &str) -> Self {
        self.script(url, Scripted::Hang)
    }

    fn script(self, url: &str, response: Scripted) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
        self
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HopTransport for ScriptedTransport {
    async fn fetch_hop(&self, url: &str) -> Result<HopResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let should_hang = {
            let responses = self.responses.lock().unwrap();
            match responses.get(url) {
                Some(Scripted::Response(response)) => return Ok(response.clone()),
                Some(Scripted::Refuse) => {
                    return Err(TransportError::Connect(format!("refused: {url}")))
                }
                Some(Scripted::Hang) => true,
                None => {
                    return Err(TransportError::Connect(format!(
                        "no scripted response for {url}"
                    )))
                }
            }
        };
        if should_hang {
            std::future::pending::<()>().await;
        }
        unreachable!("pending future resolved")
    }
}
