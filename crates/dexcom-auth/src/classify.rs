//! Classification of Share API error bodies
//!
//! Failures come back as a JSON object with `Code` and `Message`. The code
//! vocabulary is small and informally documented; message wording varies
//! within a code family, so message checks are substring matches.

use serde_json::Value;

use crate::error::{AccountError, ArgumentError, Error, ServerError, SessionError};

/// `SSO_InternalError` messages that mean the credentials were rejected.
const AUTHENTICATE_FAILURE_MESSAGES: &[&str] = &[
    "Cannot Authenticate by AccountName",
    "Cannot Authenticate by AccountId",
];

/// Map a parsed error body to a typed error.
///
/// First match wins. Any object with both a non-empty `Code` and `Message`
/// that matches nothing known becomes `UnknownCode`; every other shape is
/// `Unexpected`.
pub fn classify(body: &Value) -> Error {
    let code = body.get("Code").and_then(Value::as_str).unwrap_or("");
    let message = body.get("Message").and_then(Value::as_str).unwrap_or("");

    match code {
        "SessionIdNotFound" => return SessionError::NotFound.into(),
        "SessionNotValid" => return SessionError::Invalid.into(),
        "AccountPasswordInvalid" => return AccountError::FailedAuthentication.into(),
        "SSO_AuthenticateMaxAttemptsExceeded" => return AccountError::MaxAttempts.into(),
        "SSO_InternalError"
            if AUTHENTICATE_FAILURE_MESSAGES
                .iter()
                .any(|pattern| message.contains(pattern)) =>
        {
            return AccountError::FailedAuthentication.into();
        }
        "InvalidArgument" if message.contains("accountName") => {
            return ArgumentError::UsernameInvalid.into();
        }
        "InvalidArgument" if message.contains("password") => {
            return ArgumentError::PasswordInvalid.into();
        }
        "InvalidArgument" if message.contains("UUID") => {
            return ArgumentError::AccountIdInvalid.into();
        }
        _ => {}
    }

    if !code.is_empty() && !message.is_empty() {
        return ServerError::UnknownCode {
            code: code.to_owned(),
            message: message.to_owned(),
        }
        .into();
    }
    ServerError::Unexpected.into()
}

/// Classify a raw non-success body; unparseable JSON is `InvalidJson`.
pub fn classify_body(body: &[u8]) -> Error {
    match serde_json::from_slice::<Value>(body) {
        Ok(value) => classify(&value),
        Err(_) => ServerError::InvalidJson.into(),
    }
}
