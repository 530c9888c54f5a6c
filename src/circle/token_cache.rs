use std::{future::Future, sync::Arc};

use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;
use tracing::debug;

use super::clock::Clock;
use crate::error::AppResult;

/// Tag under which the headless auth token is cached; also accepted by the
/// revalidate endpoint.
pub const AUTH_TOKEN_TAG: &str = "circle-auth-token";

/// Tokens are valid upstream for about an hour; we keep them for 15 minutes.
pub const AUTH_TOKEN_TTL: Duration = Duration::minutes(15);

struct Entry<T> {
    value: Arc<T>,
    stored_at: OffsetDateTime,
}

/// Single-slot cache with a fixed TTL measured on an injected clock.
///
/// Concurrent misses may each run the fetch; the last writer wins. Every
/// caller still gets a usable value, so the race only costs extra fetches.
pub struct TokenCache<T> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    slot: RwLock<Option<Entry<T>>>,
}

impl<T> TokenCache<T> {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            slot: RwLock::new(None),
        }
    }

    pub async fn get(&self) -> Option<Arc<T>> {
        let slot = self.slot.read().await;
        let entry = slot.as_ref()?;
        let age = self.clock.now() - entry.stored_at;
        (age < self.ttl).then(|| entry.value.clone())
    }

    pub async fn put(&self, value: T) -> Arc<T> {
        let value = Arc::new(value);
        *self.slot.write().await = Some(Entry {
            value: value.clone(),
            stored_at: self.clock.now(),
        });
        value
    }

    pub async fn invalidate(&self) {
        *self.slot.write().await = None;
        debug!("token cache invalidated");
    }

    pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> AppResult<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        if let Some(hit) = self.get().await {
            return Ok(hit);
        }
        let fresh = fetch().await?;
        Ok(self.put(fresh).await)
    }
}
