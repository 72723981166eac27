use std::time::SystemTime;

use crate::request::HeaderItem;

use super::{AuthMethod, bearer_header};

/// Outcome of the authorization policy for a single request.
#[derive(Clone, Debug)]
pub enum AuthDecision {
    /// Dispatch the request as-is.
    NoHeader,
    /// Attach this header and dispatch.
    ApplyHeader(HeaderItem),
    /// The stored bearer credential is expired; a refresh must complete
    /// before the request can carry a usable header.
    MustRefreshFirst,
}

/// Pure decision function mapping the configured method and the request's
/// authorization flag to what should happen next. Reads at most one store
/// snapshot; no locking, safe to call concurrently.
pub fn authorization_decision(
    method: &AuthMethod,
    requires_authorization: bool,
    now: SystemTime,
) -> AuthDecision {
    match method {
        AuthMethod::None => AuthDecision::NoHeader,
        AuthMethod::Basic(credential) => {
            if !requires_authorization {
                return AuthDecision::NoHeader;
            }
            AuthDecision::ApplyHeader(HeaderItem::new(
                crate::request::AUTHORIZATION_HEADER,
                credential.header_value(),
            ))
        }
        AuthMethod::Bearer { store, .. } => {
            if !requires_authorization {
                return AuthDecision::NoHeader;
            }
            let credential = store.read();
            if credential.is_expired(now) {
                AuthDecision::MustRefreshFirst
            } else {
                AuthDecision::ApplyHeader(bearer_header(&credential))
            }
        }
    }
}
