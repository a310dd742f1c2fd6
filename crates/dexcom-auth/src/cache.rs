//! Session token cache
//!
//! Holds one session id with an expiry so repeated calls skip
//! re-authentication. `SessionCache` is the seam for external stores; the
//! default `MemorySessionCache` lives for as long as the client does.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::error::Result;

/// Boxed future returned by `SessionCache` methods.
pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Storage for a single session token.
///
/// Implementations backed by remote or slow storage must bound each call
/// with their own timeout and report failures as `Error::Cache`, never as an
/// empty result.
pub trait SessionCache: Send + Sync {
    /// The stored token, or `None` if nothing is stored or it has expired.
    fn get(&self) -> CacheFuture<'_, Option<String>>;

    /// Store `token` until `now + ttl`, replacing any previous entry.
    fn set<'a>(&'a self, token: &'a str, ttl: Duration) -> CacheFuture<'a, ()>;

    /// Drop any stored token.
    fn clear(&self) -> CacheFuture<'_, ()>;
}

#[derive(Debug)]
struct Entry {
    token: String,
    // None when `now + ttl` is past what the clock can represent
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|expires_at| now < expires_at)
    }
}

/// In-process cache. Expiry uses tokio's clock so paused-time tests can
/// advance past the TTL.
#[derive(Debug, Default)]
pub struct MemorySessionCache {
    entry: Mutex<Option<Entry>>,
}

impl MemorySessionCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionCache for MemorySessionCache {
    fn get(&self) -> CacheFuture<'_, Option<String>> {
        Box::pin(async move {
            let mut entry = self.entry.lock().await;
            match entry.as_ref() {
                Some(current) if current.is_live(Instant::now()) => {
                    Ok(Some(current.token.clone()))
                }
                Some(_) => {
                    debug!("cached session expired");
                    *entry = None;
                    Ok(None)
                }
                None => Ok(None),
            }
        })
    }

    fn set<'a>(&'a self, token: &'a str, ttl: Duration) -> CacheFuture<'a, ()> {
        Box::pin(async move {
            let expires_at = Instant::now().checked_add(ttl);
            *self.entry.lock().await = Some(Entry {
                token: token.to_owned(),
                expires_at,
            });
            Ok(())
        })
    }

    fn clear(&self) -> CacheFuture<'_, ()> {
        Box::pin(async move {
            *self.entry.lock().await = None;
            Ok(())
        })
    }
}
