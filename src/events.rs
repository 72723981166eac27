use tokio::sync::mpsc::UnboundedSender;

use crate::errors::RefreshError;
use crate::response::Response;

/// Observable authentication events, scoped to one client instance.
///
/// Delivered over an unbounded channel supplied through
/// [`ServiceConfig::events`](crate::config::ServiceConfig). `RefreshFailed`
/// fires exactly once per failed refresh, regardless of how many requests
/// were waiting on it; `AuthorizationFailed` fires once per 401 response to
/// a substantive request. Session-management layers typically react to
/// these by forcing re-login.
#[derive(Clone, Debug)]
pub enum AuthEvent {
    RefreshFailed(RefreshError),
    AuthorizationFailed(Response),
}

pub(crate) fn emit(sink: Option<&UnboundedSender<AuthEvent>>, event: AuthEvent) {
    if let Some(sink) = sink {
        // A dropped receiver just means nobody is listening anymore.
        let _ = sink.send(event);
    }
}
