use tracing::{Level, event};
use uuid::Uuid;

use crate::errors::RefreshError;

/// Structured logging around a single refresh attempt. Every attempt gets
/// its own id so concurrent clients can be told apart in the logs.
#[derive(Clone, Debug)]
pub struct RefreshTelemetry {
    attempt_id: Uuid,
    client_id: String,
}

impl RefreshTelemetry {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            client_id: client_id.into(),
        }
    }

    pub fn attempt_id(&self) -> Uuid {
        self.attempt_id
    }

    pub fn emit_start(&self) {
        event!(
            Level::INFO,
            attempt_id = %self.attempt_id,
            client_id = %self.client_id,
            "refresh.start"
        );
    }

    pub fn emit_success(&self, waiters: usize) {
        event!(
            Level::INFO,
            attempt_id = %self.attempt_id,
            client_id = %self.client_id,
            waiters,
            "refresh.success"
        );
    }

    pub fn emit_failure(&self, error: &RefreshError) {
        event!(
            Level::ERROR,
            attempt_id = %self.attempt_id,
            client_id = %self.client_id,
            error = %error,
            "refresh.failure"
        );
    }
}
