use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;

use crate::auth::AuthMethod;
use crate::events::AuthEvent;

pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_DRAIN_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Per-client configuration. Built once and handed to
/// [`AuthorizedClient`](crate::client::AuthorizedClient); immutable after
/// construction.
#[derive(Clone)]
pub struct ServiceConfig {
    pub authentication_method: AuthMethod,
    /// Upper bound on a single token refresh call.
    pub refresh_timeout: Duration,
    /// How often the request serializer checks for a stalled drain loop.
    pub drain_check_interval: Duration,
    /// Optional sink for refresh and authorization failure events.
    pub events: Option<UnboundedSender<AuthEvent>>,
}

impl ServiceConfig {
    pub fn new(authentication_method: AuthMethod) -> Self {
        Self {
            authentication_method,
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
            drain_check_interval: DEFAULT_DRAIN_CHECK_INTERVAL,
            events: None,
        }
    }

    pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    pub fn drain_check_interval(mut self, interval: Duration) -> Self {
        self.drain_check_interval = interval;
        self
    }

    pub fn events(mut self, sink: UnboundedSender<AuthEvent>) -> Self {
        self.events = Some(sink);
        self
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::new(AuthMethod::None)
    }
}
