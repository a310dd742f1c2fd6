//! Share authentication endpoint calls
//!
//! Two POSTs turn credentials into a session:
//! 1. `AuthenticatePublisherAccount`: username + password → account id
//! 2. `LoginPublisherAccountById`: account id + password → session id
//!
//! Both answer with a bare JSON string on success and a `{Code, Message}`
//! object with a non-2xx status on failure.

use serde_json::{Value, json};
use share_transport::{HttpRequest, HttpResponse, ResilientTransport};

use crate::classify::classify_body;
use crate::constants::{AUTHENTICATE_ENDPOINT, Endpoints, LOGIN_ID_ENDPOINT};
use crate::credentials::Password;
use crate::error::{Error, Result, ServerError};

/// Decode a Share response: classify failures, parse successes as JSON.
pub fn parse_response(response: &HttpResponse) -> Result<Value> {
    if !response.status.is_success() {
        return Err(classify_body(&response.body));
    }
    serde_json::from_slice(&response.body).map_err(|_| ServerError::InvalidJson.into())
}

/// Convert a transport failure, preferring the server's own error payload.
///
/// Share reports some failures (e.g. a rejected password) with a 500, which
/// the transport retries. Once retries run out, a recognizable `{Code,
/// Message}` body on the last response wins over the generic status error.
pub fn from_transport(e: share_transport::Error) -> Error {
    if let share_transport::Error::RetriesExhausted { body, .. } = &e {
        match classify_body(body) {
            Error::Server(ServerError::InvalidJson | ServerError::Unexpected) => {}
            classified => return classified,
        }
    }
    Error::Network(e)
}

/// Execute a prepared request and return the decoded JSON.
pub async fn send(transport: &ResilientTransport, request: &HttpRequest) -> Result<Value> {
    let response = transport.execute(request).await.map_err(from_transport)?;
    parse_response(&response)
}

/// POST `body` to `endpoint` and return the decoded JSON.
pub async fn post(
    transport: &ResilientTransport,
    endpoints: &Endpoints,
    endpoint: &str,
    body: &Value,
) -> Result<Value> {
    let request = HttpRequest::post_json(endpoints.url(endpoint)?, body);
    send(transport, &request).await
}

/// Exchange username + password for the account id.
///
/// Returns whatever the server sent; the caller validates it as a UUID. A
/// non-string JSON value is returned as its JSON text so that validation
/// rejects it.
pub async fn authenticate_account(
    transport: &ResilientTransport,
    endpoints: &Endpoints,
    username: &str,
    password: &Password,
) -> Result<String> {
    let body = json!({
        "accountName": username,
        "password": password.expose(),
        "applicationId": endpoints.application_id(),
    });
    let value = post(transport, endpoints, AUTHENTICATE_ENDPOINT, &body).await?;
    Ok(into_id(value))
}

/// Exchange account id + password for a session id.
pub async fn login_by_account_id(
    transport: &ResilientTransport,
    endpoints: &Endpoints,
    account_id: &str,
    password: &Password,
) -> Result<String> {
    let body = json!({
        "accountId": account_id,
        "password": password.expose(),
        "applicationId": endpoints.application_id(),
    });
    let value = post(transport, endpoints, LOGIN_ID_ENDPOINT, &body).await?;
    Ok(into_id(value))
}

fn into_id(value: Value) -> String {
    match value {
        Value::String(id) => id,
        other => other.to_string(),
    }
}
