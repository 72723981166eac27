use std::sync::Arc;
use std::time::SystemTime;

use serde::de::DeserializeOwned;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::oneshot;
use tracing::debug;

use crate::auth::{
    AuthDecision, AuthMethod, Engagement, RefreshCoordinator, authorization_decision, bearer_header,
};
use crate::config::ServiceConfig;
use crate::errors::{Error, RefreshError};
use crate::events::{self, AuthEvent};
use crate::request::{RequestDescriptor, apply_authorization};
use crate::response::Response;
use crate::serializer::RequestSerializer;
use crate::transport::{HttpTransport, Transport};

/// HTTP client front door: decides per request whether to attach an
/// authorization header, to trigger a token refresh first, or to pass the
/// request through untouched.
///
/// Requests that arrive while a refresh is in flight are held back and
/// replayed in arrival order once the refresh settles. A failed refresh
/// fails every held-back request with the same error; none of them are
/// dispatched with a stale header.
pub struct AuthorizedClient {
    transport: Arc<dyn Transport>,
    method: AuthMethod,
    coordinator: Option<RefreshCoordinator>,
    serializer: RequestSerializer,
    events: Option<UnboundedSender<AuthEvent>>,
}

impl AuthorizedClient {
    pub fn new(config: ServiceConfig) -> Self {
        Self::with_transport(config, Arc::new(HttpTransport::default()))
    }

    /// Builds a client over a caller-supplied transport. Tests use this to
    /// substitute a scripted transport for the network.
    pub fn with_transport(config: ServiceConfig, transport: Arc<dyn Transport>) -> Self {
        let coordinator = match &config.authentication_method {
            AuthMethod::Bearer {
                endpoint,
                credential,
                store,
            } => Some(RefreshCoordinator::new(
                endpoint.clone(),
                credential.clone(),
                Arc::clone(store),
                Arc::clone(&transport),
                config.refresh_timeout,
                config.events.clone(),
            )),
            AuthMethod::None | AuthMethod::Basic(_) => None,
        };
        Self {
            transport,
            method: config.authentication_method,
            coordinator,
            serializer: RequestSerializer::new(config.drain_check_interval),
            events: config.events,
        }
    }

    /// Authorizes and dispatches one request.
    ///
    /// The decision and any enqueueing happen synchronously before the first
    /// await, so requests issued in sequence from one task keep that order
    /// even when all of them are held back behind a refresh.
    pub async fn authorize_and_send(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Result<Response, Error> {
        let decision = authorization_decision(
            &self.method,
            descriptor.requires_authorization,
            SystemTime::now(),
        );
        match decision {
            AuthDecision::NoHeader => {
                dispatch(self.transport.as_ref(), self.events.as_ref(), descriptor).await
            }
            AuthDecision::ApplyHeader(header) => {
                let authorized = apply_authorization(descriptor, header);
                dispatch(self.transport.as_ref(), self.events.as_ref(), &authorized).await
            }
            AuthDecision::MustRefreshFirst => {
                let coordinator = self.coordinator.as_ref().ok_or(Error::Unexpected)?;
                match coordinator.engage() {
                    Engagement::Fresh(credential) => {
                        // Another caller finished the refresh between our
                        // policy check and the engage; proceed directly.
                        let authorized =
                            apply_authorization(descriptor, bearer_header(&credential));
                        dispatch(self.transport.as_ref(), self.events.as_ref(), &authorized).await
                    }
                    Engagement::Pending(mut receiver) => {
                        debug!("request.held_back");
                        let (done_tx, done_rx) = oneshot::channel();
                        let transport = Arc::clone(&self.transport);
                        let events = self.events.clone();
                        let descriptor = descriptor.clone();
                        self.serializer.enqueue(async move {
                            let outcome = match receiver.recv().await {
                                Ok(Ok(credential)) => {
                                    let authorized = apply_authorization(
                                        &descriptor,
                                        bearer_header(&credential),
                                    );
                                    dispatch(transport.as_ref(), events.as_ref(), &authorized).await
                                }
                                Ok(Err(err)) => Err(Error::Refresh(err)),
                                Err(_) => Err(Error::Refresh(RefreshError::Interrupted)),
                            };
                            let _ = done_tx.send(outcome);
                        });
                        done_rx.await.map_err(|_| Error::Unexpected)?
                    }
                }
            }
        }
    }

    /// [`authorize_and_send`](Self::authorize_and_send) plus JSON decoding
    /// of the successful response body.
    pub async fn authorize_and_fetch<T: DeserializeOwned>(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Result<T, Error> {
        let response = self.authorize_and_send(descriptor).await?;
        response.json::<T>().map_err(Error::Decode)
    }

    pub fn is_refreshing(&self) -> bool {
        self.coordinator
            .as_ref()
            .is_some_and(RefreshCoordinator::is_refreshing)
    }
}

/// Lowers and sends one request. Non-2xx responses become
/// [`Error::Response`]; a 401 additionally emits
/// [`AuthEvent::AuthorizationFailed`]. Refresh calls go through the
/// coordinator instead, so a rejected refresh never fires that event.
async fn dispatch(
    transport: &dyn Transport,
    events: Option<&UnboundedSender<AuthEvent>>,
    descriptor: &RequestDescriptor,
) -> Result<Response, Error> {
    let prepared = descriptor.prepare()?;
    let response = transport.send(&prepared).await?;
    if response.is_success() {
        return Ok(response);
    }
    if response.status == 401 {
        events::emit(events, AuthEvent::AuthorizationFailed(response.clone()));
    }
    Err(Error::Response(response))
}
