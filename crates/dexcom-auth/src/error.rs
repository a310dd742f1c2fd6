//! Error taxonomy for Share API operations
//!
//! Four upstream-facing kinds (account, session, argument, server), each with
//! a reason code, plus the transport and cache failures that can interrupt a
//! flow. Callers branch by matching on the variant.

/// Credentials rejected by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AccountError {
    #[error("Failed to authenticate")]
    FailedAuthentication,

    #[error("Maximum authentication attempts exceeded")]
    MaxAttempts,
}

/// The session id is unknown to or no longer accepted by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Session ID not found")]
    NotFound,

    #[error("Session not active or timed out")]
    Invalid,
}

/// Caller input, or an id the server handed back, is unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ArgumentError {
    #[error("Minutes must be an integer between 1 and 1440")]
    MinutesInvalid,

    #[error("Max count must be an integer between 1 and 288")]
    MaxCountInvalid,

    #[error("Username must be non-empty string")]
    UsernameInvalid,

    #[error("Only one of account_id, username should be provided")]
    TooManyUserIds,

    #[error("At least one of account_id, username should be provided")]
    NoUserId,

    #[error("Password must be non-empty string")]
    PasswordInvalid,

    #[error("Region must be 'us', 'ous', or 'jp'")]
    RegionInvalid,

    #[error("Base URL must be an absolute http(s) URL")]
    BaseUrlInvalid,

    #[error("Account ID must be UUID")]
    AccountIdInvalid,

    #[error("Account ID default")]
    AccountIdDefault,

    #[error("Session ID must be UUID")]
    SessionIdInvalid,

    #[error("Session ID default")]
    SessionIdDefault,

    #[error("JSON glucose reading incorrectly formatted")]
    GlucoseReadingInvalid,
}

/// The server answered with something we cannot interpret.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid or malformed JSON in server response")]
    InvalidJson,

    #[error("Unknown error code in server response: {code}: {message}")]
    UnknownCode { code: String, message: String },

    #[error("Unexpected server response")]
    Unexpected,
}

/// Errors from Share API operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("account error: {0}")]
    Account(#[from] AccountError),

    #[error("session error: {0}")]
    Session(#[from] SessionError),

    #[error("argument error: {0}")]
    Argument(#[from] ArgumentError),

    #[error("server error: {0}")]
    Server(#[from] ServerError),

    #[error(transparent)]
    Network(#[from] share_transport::Error),

    #[error("session cache error: {0}")]
    Cache(String),
}

impl Error {
    /// Whether re-authenticating could fix this error.
    pub fn is_session(&self) -> bool {
        matches!(self, Error::Session(_))
    }
}

/// Result alias for Share API operations.
pub type Result<T> = std::result::Result<T, Error>;
