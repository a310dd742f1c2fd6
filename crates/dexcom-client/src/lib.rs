//! Dexcom Share glucose client
//!
//! `Client` is the public facade: it owns the credentials, the session
//! manager and the resilient transport, and exposes the readings calls.
//!
//! Request flow:
//! 1. Bounds on `minutes` / `max_count` are checked before any I/O
//! 2. `SessionManager::ensure_session()` yields a session id (cached or fresh)
//! 3. The readings endpoint is called with the id as a query parameter
//! 4. On a session error the session is invalidated and steps 2-3 run once more
//! 5. Each record is schema-checked and decoded into a `GlucoseReading`

pub mod client;
pub mod query;
pub mod reading;
pub mod trend;

pub use client::{
    Client, ClientBuilder, DEFAULT_SESSION_TTL, DEFAULT_TIMEOUT, MAX_MAX_COUNT, MAX_MINUTES,
};
pub use dexcom_auth::{
    AccountError, ArgumentError, Error, FileSessionCache, MemorySessionCache, Region, Result,
    ServerError, SessionCache, SessionError,
};
pub use query::encode_query;
pub use reading::GlucoseReading;
pub use share_transport::RetryPolicy;
pub use trend::Trend;
