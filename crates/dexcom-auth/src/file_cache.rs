//! Session cache persisted to a JSON file
//!
//! Lets separate processes (e.g. repeated CLI runs) reuse a session id. The
//! file holds `{"session_id": ..., "expires": <unix millis>}`. Writes use
//! temp-file + rename so a crash never leaves a torn file, and every
//! operation is bounded by a timeout so a hung filesystem surfaces as an
//! error instead of stalling the caller.

use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::cache::{CacheFuture, SessionCache};
use crate::error::{Error, Result};

/// On-disk representation. `expires` is absolute, in unix milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSession {
    session_id: String,
    expires: u64,
}

/// Durable `SessionCache` backed by a single file.
pub struct FileSessionCache {
    path: PathBuf,
    timeout: Duration,
    // Serializes writers within this process
    write_lock: Mutex<()>,
}

impl FileSessionCache {
    pub fn new(path: PathBuf, timeout: Duration) -> Self {
        Self {
            path,
            timeout,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::time::timeout(self.timeout, fut).await.map_err(|_| {
            Error::Cache(format!(
                "{operation} {} timed out after {}ms",
                self.path.display(),
                self.timeout.as_millis()
            ))
        })?
    }

    async fn read(&self) -> Result<Option<String>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::Cache(format!("reading session file: {e}"))),
        };
        let stored: StoredSession = serde_json::from_str(&contents)
            .map_err(|e| Error::Cache(format!("parsing session file: {e}")))?;

        if now_millis() >= stored.expires {
            debug!(path = %self.path.display(), "persisted session expired");
            return Ok(None);
        }
        Ok(Some(stored.session_id))
    }

    async fn write(&self, token: &str, ttl: Duration) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let ttl_millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        let stored = StoredSession {
            session_id: token.to_owned(),
            expires: now_millis().saturating_add(ttl_millis),
        };
        write_atomic(&self.path, &stored).await
    }

    async fn remove(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Cache(format!("removing session file: {e}"))),
        }
    }
}

impl SessionCache for FileSessionCache {
    fn get(&self) -> CacheFuture<'_, Option<String>> {
        Box::pin(self.bounded("reading", self.read()))
    }

    fn set<'a>(&'a self, token: &'a str, ttl: Duration) -> CacheFuture<'a, ()> {
        Box::pin(self.bounded("writing", self.write(token, ttl)))
    }

    fn clear(&self) -> CacheFuture<'_, ()> {
        Box::pin(self.bounded("removing", self.remove()))
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Write the session file atomically with 0600 permissions (it holds a
/// bearer-equivalent token).
async fn write_atomic(path: &Path, stored: &StoredSession) -> Result<()> {
    let json = serde_json::to_string(stored)
        .map_err(|e| Error::Cache(format!("serializing session: {e}")))?;

    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    // Unique per write: other instances may target the same directory
    let tmp_path = dir.join(format!(
        ".session.tmp.{}.{}",
        std::process::id(),
        Uuid::new_v4().simple()
    ));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Cache(format!("writing temp session file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Cache(format!("setting session file permissions: {e}")))?;
    }

    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(Error::Cache(format!("renaming temp session file: {e}")));
    }

    debug!(path = %path.display(), "persisted session");
    Ok(())
}
