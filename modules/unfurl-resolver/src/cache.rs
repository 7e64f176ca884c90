//! Process-lifetime resolution cache shared by all workers.
//!
//! Entries accumulate monotonically and are never evicted; a run is batch
//! oriented, so the key space is bounded by the input. Two workers racing
//! on the same uncached URL both resolve it and the last store wins —
//! results for a URL are deterministic up to transient network conditions,
//! so the duplicate work is harmless and the cache stays a pure
//! optimization rather than a correctness lock.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::Serialize;

use crate::outcome::Resolution;

/// Reduced projection cached per URL: the final destination plus whatever
/// was learned on the way there.
#[derive(Debug, Clone, Serialize)]
pub struct CachedResolution {
    pub resolved_url: Option<String>,
    pub hop_chain: Vec<String>,
    pub video_id: Option<String>,
}

impl From<&Resolution> for CachedResolution {
    fn from(resolution: &Resolution) -> Self {
        Self {
            resolved_url: resolution.resolved_url.clone(),
            hop_chain: resolution.hop_chain.clone(),
            video_id: resolution.video_id.clone(),
        }
    }
}

#[derive(Default)]
pub struct ResolutionCache {
    inner: RwLock<HashMap<String, CachedResolution>>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, url: &str) -> Option<CachedResolution> {
        self.inner.read().expect("cache lock poisoned").get(url).cloned()
    }

    pub fn store(&self, url: &str, resolution: &Resolution) {
        self.inner
            .write()
            .expect("cache lock poisoned")
            .insert(url.to_string(), CachedResolution::from(resolution));
    }

    /// Register the source URL, every intermediate hop, and the final
    /// destination as all mapping to the same outcome, so a later request
    /// for any link in the chain is an immediate hit.
    pub fn store_chain(&self, resolution: &Resolution) {
        let entry = CachedResolution::from(resolution);
        let mut inner = self.inner.write().expect("cache lock poisoned");
        inner.insert(resolution.short_url.clone(), entry.clone());
        for hop in &resolution.hop_chain {
            inner.insert(hop.clone(), entry.clone());
        }
        if let Some(ref destination) = resolution.resolved_url {
            inner.insert(destination.clone(), entry.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::ResolutionStatus;

    fn resolution(short: &str, resolved: &str, hops: &[&str]) -> Resolution {
        Resolution {
            short_url: short.to_string(),
            resolved_url: Some(resolved.to_string()),
            hop_chain: hops.iter().map(|h| h.to_string()).collect(),
            video_id: None,
            status: ResolutionStatus::Resolved,
        }
    }

    #[test]
    fn lookup_after_store() {
        let cache = ResolutionCache::new();
        let r = resolution("http://a/", "http://c/", &[]);
        cache.store("http://a/", &r);

        let hit = cache.lookup("http://a/").unwrap();
        assert_eq!(hit.resolved_url.as_deref(), Some("http://c/"));
        assert!(cache.lookup("http://b/").is_none());
    }

    #[test]
    fn store_chain_registers_every_hop() {
        let cache = ResolutionCache::new();
        let r = resolution("http://a/", "http://c/", &["http://b/"]);
        cache.store_chain(&r);

        for url in ["http://a/", "http://b/", "http://c/"] {
            let hit = cache.lookup(url).unwrap_or_else(|| panic!("{url} missing"));
            assert_eq!(hit.resolved_url.as_deref(), Some("http://c/"));
        }
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn conflicting_stores_are_last_writer_wins() {
        let cache = ResolutionCache::new();
        cache.store("http://a/", &resolution("http://a/", "http://old/", &[]));
        cache.store("http://a/", &resolution("http://a/", "http://new/", &[]));

        let hit = cache.lookup("http://a/").unwrap();
        assert_eq!(hit.resolved_url.as_deref(), Some("http://new/"));
    }
}
