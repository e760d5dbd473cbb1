//! Single-slot cache of the most recently loaded model.
//!
//! Placing the same model again clones the cached template without any I/O.
//! The slot is keyed by the source it was loaded from, so a different source
//! is a miss. Writes are gated by [`LoadToken`]: a completion may fill an
//! empty slot, and may replace an occupied one only when it answers the most
//! recently issued request. A stale completion never clobbers a newer model.

use std::sync::Arc;

use crate::node::ModelTemplate;
use crate::source::{LoadToken, ModelSource};

#[derive(Debug, Clone)]
struct CachedModel {
    key: String,
    token: LoadToken,
    template: Arc<ModelTemplate>,
}

/// Counters for cache behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from the slot.
    pub hits: u64,
    /// Lookups that required a load.
    pub misses: u64,
    /// Successful writes.
    pub writes: u64,
    /// Completions refused by the token rule.
    pub rejected: u64,
}

/// The asset cache.
#[derive(Debug, Clone, Default)]
pub struct AssetCache {
    slot: Option<CachedModel>,
    next_token: u64,
    stats: CacheStats,
}

impl AssetCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a token for a new load request.
    pub fn issue_token(&mut self) -> LoadToken {
        self.next_token += 1;
        LoadToken(self.next_token)
    }

    /// Most recently issued token, if any.
    #[must_use]
    pub fn latest_token(&self) -> Option<LoadToken> {
        (self.next_token > 0).then_some(LoadToken(self.next_token))
    }

    /// Cached template for `source`, if present.
    pub fn lookup(&mut self, source: &ModelSource) -> Option<Arc<ModelTemplate>> {
        let key = source.cache_key();
        match &self.slot {
            Some(cached) if cached.key == key => {
                self.stats.hits += 1;
                Some(Arc::clone(&cached.template))
            }
            _ => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Offer a freshly loaded template. Returns whether the slot was written.
    pub fn offer(&mut self, token: LoadToken, source: &ModelSource, template: Arc<ModelTemplate>) -> bool {
        let key = source.cache_key();
        let accept = match &self.slot {
            None => true,
            Some(cached) if cached.key == key => false,
            Some(cached) => Some(token) == self.latest_token() && token > cached.token,
        };
        if !accept {
            self.stats.rejected += 1;
            tracing::debug!("Cache kept existing model, refused {token} for {source}");
            return false;
        }
        tracing::debug!("Cached model from {source} ({token})");
        self.slot = Some(CachedModel { key, token, template });
        self.stats.writes += 1;
        true
    }

    /// Whether nothing has been cached yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }

    /// Cache key of the stored model.
    #[must_use]
    pub fn cached_key(&self) -> Option<&str> {
        self.slot.as_ref().map(|c| c.key.as_str())
    }

    /// Behaviour counters.
    #[must_use]
    pub const fn stats(&self) -> CacheStats {
        self.stats
    }
}
