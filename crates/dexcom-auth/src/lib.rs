//! Dexcom Share authentication library
//!
//! Turns long-lived credentials into a short-lived session id and keeps it
//! cached. Independent of the readings API so it can be tested on its own.
//!
//! Session flow:
//! 1. `SessionManager::ensure_session()` checks the `SessionCache`
//! 2. On a miss with only a username, `endpoint::authenticate_account()`
//!    yields the account id
//! 3. `endpoint::login_by_account_id()` yields the session id
//! 4. Both ids are validated (UUID, not the all-zero default) and the session
//!    id is cached for the configured TTL
//! 5. A session error from a later data call leads the caller to
//!    `SessionManager::invalidate()` and try again once
//!
//! Upstream failures are mapped to the typed `Error` by `classify`.

pub mod cache;
pub mod classify;
pub mod constants;
pub mod credentials;
pub mod endpoint;
pub mod error;
pub mod file_cache;
pub mod session;

pub use cache::{MemorySessionCache, SessionCache};
pub use classify::{classify, classify_body};
pub use constants::{DEFAULT_UUID, Endpoints, Region};
pub use credentials::{Credentials, Identity, Password};
pub use error::{AccountError, ArgumentError, Error, Result, ServerError, SessionError};
pub use file_cache::FileSessionCache;
pub use session::{SessionEvent, SessionManager, SessionState};
