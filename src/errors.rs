use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::response::Response;

/// Failure to turn a request descriptor into a dispatchable request.
/// Raised before any network activity.
#[derive(Clone, Debug, Error)]
pub enum RequestBuildError {
    #[error("invalid base URL host '{0}'")]
    InvalidBaseUrl(String),
    #[error("invalid URL path '{0}'")]
    InvalidUrlPath(String),
    #[error("could not assemble request URL: {0}")]
    InvalidUrl(String),
}

/// Failure at the transport layer. Not retried by this crate.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("transport rejected the request: {0}")]
    Rejected(String),
}

/// Failure of the credential refresh call. Clonable so that one failure can
/// be broadcast verbatim to every waiter and every queued request.
#[derive(Clone, Debug, Error)]
pub enum RefreshError {
    /// The authorization server rejected the refresh token itself (HTTP 400).
    /// Callers usually treat this as "force re-authentication".
    #[error("authorization server rejected the refresh token (status {status}): {body}")]
    TokenRejected { status: u16, body: String },
    #[error("token refresh request could not be built: {0}")]
    Build(String),
    #[error("token refresh returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("token refresh transport failure: {0}")]
    Transport(String),
    #[error("token refresh response could not be decoded: {0}")]
    Decode(String),
    #[error("token refresh timed out after {0:?}")]
    Timeout(Duration),
    #[error("token refresh was interrupted before completing")]
    Interrupted,
}

/// Top-level error surfaced to callers of
/// [`AuthorizedClient::authorize_and_send`](crate::client::AuthorizedClient::authorize_and_send).
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to build request: {0}")]
    RequestBuild(#[from] RequestBuildError),
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),
    #[error("service returned failure status {}", .0.status)]
    Response(Response),
    #[error("access token refresh failed: {0}")]
    Refresh(#[from] RefreshError),
    #[error("failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("unexpected internal error")]
    Unexpected,
}

impl Error {
    /// True when a substantive request came back 401. Distinct from
    /// [`Error::is_access_token_refresh_failure`]: this one request was
    /// unauthorized, the refresh mechanism itself may be fine.
    pub fn is_authorization_failure(&self) -> bool {
        matches!(self, Error::Response(response) if response.status == 401)
    }

    /// True when the refresh call itself was rejected with a 400, meaning
    /// the stored refresh token is no longer usable.
    pub fn is_access_token_refresh_failure(&self) -> bool {
        matches!(self, Error::Refresh(RefreshError::TokenRejected { .. }))
    }

    /// Decodes the failure response body, when one is present, into an
    /// error model defined by the caller.
    pub fn decode_if_present<T: DeserializeOwned>(&self) -> Result<Option<T>, Error> {
        match self {
            Error::Response(response) if !response.body.is_empty() => {
                let value = serde_json::from_slice(&response.body).map_err(Error::Decode)?;
                Ok(Some(value))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> Response {
        Response {
            status,
            headers: Vec::new(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn authorization_failure_is_401_response() {
        assert!(Error::Response(response(401, "")).is_authorization_failure());
        assert!(!Error::Response(response(500, "")).is_authorization_failure());
        assert!(!Error::Unexpected.is_authorization_failure());
    }

    #[test]
    fn refresh_failure_is_token_rejected_only() {
        let rejected = Error::Refresh(RefreshError::TokenRejected {
            status: 400,
            body: "invalid_grant".into(),
        });
        assert!(rejected.is_access_token_refresh_failure());

        let generic = Error::Refresh(RefreshError::Status {
            status: 503,
            body: String::new(),
        });
        assert!(!generic.is_access_token_refresh_failure());
        assert!(!Error::Response(response(400, "")).is_access_token_refresh_failure());
    }

    #[test]
    fn decode_if_present_reads_error_body() {
        #[derive(serde::Deserialize)]
        struct ApiError {
            message: String,
        }

        let err = Error::Response(response(422, r#"{"message": "bad field"}"#));
        let decoded: Option<ApiError> = err.decode_if_present().expect("decodes");
        assert_eq!(decoded.expect("present").message, "bad field");

        let empty = Error::Response(response(404, ""));
        let decoded: Option<ApiError> = empty.decode_if_present().expect("no body");
        assert!(decoded.is_none());
    }
}
