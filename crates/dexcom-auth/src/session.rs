//! Session state machine and acquisition
//!
//! The manager turns credentials into a session id and keeps it in the
//! injected `SessionCache`. What it knows about the account is tracked in
//! `SessionState`:
//!
//! - Empty → HasAccountId (username authenticated)
//! - HasAccountId → Active (session id obtained and cached)
//! - Active → HasAccountId (session invalidated; account id is kept)
//!
//! Clients constructed with an account id start in `HasAccountId` and never
//! call the account authentication endpoint.

use std::sync::Arc;
use std::time::Duration;

use share_transport::ResilientTransport;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::cache::SessionCache;
use crate::constants::Endpoints;
use crate::credentials::{Credentials, Identity, validate_account_id, validate_session_id};
use crate::endpoint;
use crate::error::{ArgumentError, Result};

/// What the manager currently knows about the account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Only a username is known
    Empty,
    /// Account id known, no session cached by us
    HasAccountId { account_id: String },
    /// Account id known and a session id was stored in the cache
    Active { account_id: String },
}

/// Inputs that drive `SessionState` transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    AccountAuthenticated { account_id: String },
    SessionStored,
    Invalidated,
}

impl SessionState {
    fn initial(credentials: &Credentials) -> Self {
        match credentials.identity() {
            Identity::Username(_) => SessionState::Empty,
            Identity::AccountId(account_id) => SessionState::HasAccountId {
                account_id: account_id.clone(),
            },
        }
    }

    /// Pure transition function; events that don't apply leave the state as is.
    pub fn next(self, event: SessionEvent) -> SessionState {
        match (self, event) {
            (SessionState::Empty, SessionEvent::AccountAuthenticated { account_id }) => {
                SessionState::HasAccountId { account_id }
            }
            (
                SessionState::HasAccountId { account_id } | SessionState::Active { account_id },
                SessionEvent::SessionStored,
            ) => SessionState::Active { account_id },
            (SessionState::Active { account_id }, SessionEvent::Invalidated) => {
                SessionState::HasAccountId { account_id }
            }
            (state, _) => state,
        }
    }

    pub fn account_id(&self) -> Option<&str> {
        match self {
            SessionState::Empty => None,
            SessionState::HasAccountId { account_id } | SessionState::Active { account_id } => {
                Some(account_id)
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Empty => "empty",
            SessionState::HasAccountId { .. } => "has_account_id",
            SessionState::Active { .. } => "active",
        }
    }
}

fn advance(state: &mut SessionState, event: SessionEvent) {
    let previous = std::mem::replace(state, SessionState::Empty);
    let from = previous.label();
    *state = previous.next(event);
    debug!(from, to = state.label(), "session state transition");
}

fn record_cache_lookup(result: &'static str) {
    metrics::counter!("dexcom_session_cache_lookups_total", "result" => result).increment(1);
}

fn record_authentication(step: &'static str) {
    metrics::counter!("dexcom_authentications_total", "step" => step).increment(1);
}

/// Acquires and caches session ids for one set of credentials.
///
/// `ensure_session` is single-flight per manager: concurrent callers queue on
/// an internal lock, so one instance never authenticates twice in parallel.
/// Separate managers sharing an external cache can still race; both
/// authenticate and the cache keeps whichever write landed last.
pub struct SessionManager {
    transport: ResilientTransport,
    endpoints: Endpoints,
    credentials: Arc<Credentials>,
    cache: Arc<dyn SessionCache>,
    ttl: Duration,
    state: Mutex<SessionState>,
}

impl SessionManager {
    pub fn new(
        transport: ResilientTransport,
        endpoints: Endpoints,
        credentials: Arc<Credentials>,
        cache: Arc<dyn SessionCache>,
        ttl: Duration,
    ) -> Self {
        let state = SessionState::initial(&credentials);
        Self {
            transport,
            endpoints,
            credentials,
            cache,
            ttl,
            state: Mutex::new(state),
        }
    }

    pub async fn state(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    /// Account id, if known yet.
    pub async fn account_id(&self) -> Option<String> {
        self.state.lock().await.account_id().map(str::to_owned)
    }

    /// Return a usable session id, authenticating only when the cache has none.
    ///
    /// Malformed or sentinel ids returned by the server are fatal argument
    /// errors. Upstream failures are classified and returned without retry
    /// beyond what the transport already did.
    #[instrument(skip_all)]
    pub async fn ensure_session(&self) -> Result<String> {
        let mut state = self.state.lock().await;

        if let Some(session_id) = self.cache.get().await? {
            if validate_session_id(&session_id).is_ok() {
                record_cache_lookup("hit");
                debug!("using cached session");
                return Ok(session_id);
            }
            warn!("cached session id is malformed, discarding");
            self.cache.clear().await?;
        }
        record_cache_lookup("miss");

        let known = state.account_id().map(str::to_owned);
        let account_id = match known {
            Some(account_id) => account_id,
            None => {
                let account_id = self.authenticate_account().await?;
                advance(
                    &mut state,
                    SessionEvent::AccountAuthenticated {
                        account_id: account_id.clone(),
                    },
                );
                account_id
            }
        };

        let password = self.credentials.password();
        if password.is_empty() {
            return Err(ArgumentError::PasswordInvalid.into());
        }
        record_authentication("session");
        let session_id =
            endpoint::login_by_account_id(&self.transport, &self.endpoints, &account_id, password)
                .await?;
        validate_session_id(&session_id)?;

        self.cache.set(&session_id, self.ttl).await?;
        advance(&mut state, SessionEvent::SessionStored);
        info!(ttl_secs = self.ttl.as_secs(), "session established");
        Ok(session_id)
    }

    /// Forget the cached session. The account id is kept.
    pub async fn invalidate(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        self.cache.clear().await?;
        advance(&mut state, SessionEvent::Invalidated);
        info!("session invalidated");
        Ok(())
    }

    async fn authenticate_account(&self) -> Result<String> {
        let username = self.credentials.username().unwrap_or_default();
        if username.is_empty() {
            return Err(ArgumentError::UsernameInvalid.into());
        }
        let password = self.credentials.password();
        if password.is_empty() {
            return Err(ArgumentError::PasswordInvalid.into());
        }

        record_authentication("account");
        let account_id =
            endpoint::authenticate_account(&self.transport, &self.endpoints, username, password)
                .await?;
        validate_account_id(&account_id)?;
        info!("account authenticated");
        Ok(account_id)
    }
}
