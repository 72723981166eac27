use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use tokio::sync::broadcast;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::errors::RefreshError;
use crate::events::{self, AuthEvent};
use crate::request::{Method, RequestDescriptor};
use crate::telemetry::RefreshTelemetry;
use crate::transport::Transport;

use super::{AuthorizationEndpoint, ClientCredential, Credential, CredentialStore};

type RefreshResult = Result<Credential, RefreshError>;

/// What a caller gets from engaging the coordinator.
pub enum Engagement {
    /// The stored credential turned out to be fresh; no refresh needed.
    Fresh(Credential),
    /// A refresh is in flight (started by this caller or an earlier one);
    /// await the receiver for the shared outcome.
    Pending(broadcast::Receiver<RefreshResult>),
}

/// `Some` while a refresh is in flight. The sender doubles as the shared
/// handle every waiter subscribes to.
struct RefreshState {
    in_flight: Option<broadcast::Sender<RefreshResult>>,
}

struct CoordinatorInner {
    endpoint: AuthorizationEndpoint,
    credential: ClientCredential,
    store: Arc<dyn CredentialStore>,
    transport: Arc<dyn Transport>,
    timeout: Duration,
    state: Mutex<RefreshState>,
    events: Option<UnboundedSender<AuthEvent>>,
}

/// Clears the in-flight marker if the refresh task unwinds before its
/// normal completion path runs. Without this, a panic would leave every
/// later `engage()` joining a channel that never delivers.
struct ClearInFlight {
    inner: Arc<CoordinatorInner>,
    armed: bool,
}

impl ClearInFlight {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ClearInFlight {
    fn drop(&mut self) {
        if self.armed
            && let Ok(mut state) = self.inner.state.lock()
        {
            state.in_flight = None;
        }
    }
}

/// Guarantees at most one in-flight refresh call per coordinator instance.
///
/// Concurrent callers that observe an expired credential either join the
/// in-flight refresh or start one; the check and the state transition happen
/// under a single lock acquisition, so there is no window in which two
/// callers can both decide to start. The refresh itself runs in a spawned
/// task: cancelling one waiter never cancels the shared call. A failed
/// refresh is broadcast to every waiter and then forgotten; the next
/// engagement that sees an expired credential starts a new attempt.
pub struct RefreshCoordinator {
    inner: Arc<CoordinatorInner>,
    client_id: String,
}

impl RefreshCoordinator {
    pub fn new(
        endpoint: AuthorizationEndpoint,
        credential: ClientCredential,
        store: Arc<dyn CredentialStore>,
        transport: Arc<dyn Transport>,
        timeout: Duration,
        events: Option<UnboundedSender<AuthEvent>>,
    ) -> Self {
        let client_id = credential.id.clone();
        Self {
            inner: Arc::new(CoordinatorInner {
                endpoint,
                credential,
                store,
                transport,
                timeout,
                state: Mutex::new(RefreshState { in_flight: None }),
                events,
            }),
            client_id,
        }
    }

    /// Atomically joins or starts a refresh. Re-reads the store under the
    /// lock so a credential refreshed between the caller's expiry check and
    /// this call is returned without another network trip.
    pub fn engage(&self) -> Engagement {
        let mut state = self
            .inner
            .state
            .lock()
            .expect("non-poisoned refresh state lock");

        if let Some(sender) = &state.in_flight {
            debug!(client_id = %self.client_id, "refresh.joined");
            return Engagement::Pending(sender.subscribe());
        }

        let credential = self.inner.store.read();
        if !credential.is_expired(SystemTime::now()) {
            return Engagement::Fresh(credential);
        }

        let (sender, receiver) = broadcast::channel(1);
        state.in_flight = Some(sender.clone());
        drop(state);

        let inner = Arc::clone(&self.inner);
        let telemetry = RefreshTelemetry::new(self.client_id.clone());
        tokio::spawn(async move {
            let guard = ClearInFlight {
                inner: Arc::clone(&inner),
                armed: true,
            };
            telemetry.emit_start();
            let result = perform_refresh(&inner).await;

            {
                // Clearing in-flight and publishing the new credential must
                // be one transition: a caller locking after this sees the
                // store already updated and never starts a duplicate.
                let mut state = inner.state.lock().expect("non-poisoned refresh state lock");
                state.in_flight = None;
                if let Ok(credential) = &result {
                    inner.store.write(credential.clone());
                }
            }
            guard.disarm();

            match &result {
                Ok(_) => telemetry.emit_success(sender.receiver_count()),
                Err(err) => {
                    telemetry.emit_failure(err);
                    events::emit(inner.events.as_ref(), AuthEvent::RefreshFailed(err.clone()));
                }
            }

            // Waiters subscribed while in-flight was set; each receives one
            // clone of the same outcome.
            let _ = sender.send(result);
        });

        Engagement::Pending(receiver)
    }

    /// Returns a fresh credential, refreshing (single-flight) if required.
    pub async fn ensure_fresh(&self) -> RefreshResult {
        match self.engage() {
            Engagement::Fresh(credential) => Ok(credential),
            Engagement::Pending(mut receiver) => match receiver.recv().await {
                Ok(result) => result,
                Err(_) => Err(RefreshError::Interrupted),
            },
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner
            .state
            .lock()
            .expect("non-poisoned refresh state lock")
            .in_flight
            .is_some()
    }
}

/// Builds the token refresh request: URL-form-encoded grant parameters,
/// authorized with the current (possibly stale) access token.
fn refresh_descriptor(inner: &CoordinatorInner) -> RequestDescriptor {
    let current = inner.store.read();
    let mut body = format!(
        "grant_type={}&client_id={}",
        inner.credential.grant_type.as_str(),
        urlencoding::encode(&inner.credential.id),
    );
    if let Some(secret) = inner.credential.secret.as_deref()
        && !secret.is_empty()
    {
        body.push_str("&client_secret=");
        body.push_str(&urlencoding::encode(secret));
    }
    body.push_str("&refresh_token=");
    body.push_str(&urlencoding::encode(&current.refresh_token));

    RequestDescriptor::new(inner.endpoint.base_url.clone(), inner.endpoint.path.clone())
        .method(Method::Post(body.into_bytes()))
        .header("Content-Type", "application/x-www-form-urlencoded")
        .header(
            crate::request::AUTHORIZATION_HEADER,
            format!("Bearer {}", current.access_token),
        )
        .without_authorization()
}

async fn perform_refresh(inner: &CoordinatorInner) -> RefreshResult {
    let prepared = refresh_descriptor(inner)
        .prepare()
        .map_err(|err| RefreshError::Build(err.to_string()))?;

    let response = match tokio::time::timeout(inner.timeout, inner.transport.send(&prepared)).await
    {
        Err(_) => return Err(RefreshError::Timeout(inner.timeout)),
        Ok(Err(err)) => return Err(RefreshError::Transport(err.to_string())),
        Ok(Ok(response)) => response,
    };

    if response.status == 400 {
        return Err(RefreshError::TokenRejected {
            status: response.status,
            body: response.body_text(),
        });
    }
    if !response.is_success() {
        return Err(RefreshError::Status {
            status: response.status,
            body: response.body_text(),
        });
    }

    response
        .json::<Credential>()
        .map_err(|err| RefreshError::Decode(err.to_string()))
}
