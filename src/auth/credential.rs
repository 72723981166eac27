use std::sync::RwLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Bearer credential: access token, the refresh token used to renew it, and
/// an absolute expiry.
///
/// On the wire the expiry arrives either as `expires_at` (absolute epoch
/// seconds, e.g. a credential restored from local storage) or as
/// `expires_in` (relative seconds from a token endpoint response, converted
/// to absolute at decode time). A payload carrying neither fails to decode.
#[derive(Clone, Debug, PartialEq)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: SystemTime,
}

impl Credential {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: SystemTime,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at,
        }
    }

    pub fn is_expired(&self, now: SystemTime) -> bool {
        self.expires_at <= now
    }

    /// Remaining lifetime relative to `now`, `None` once expired.
    pub fn remaining(&self, now: SystemTime) -> Option<Duration> {
        self.expires_at.duration_since(now).ok()
    }
}

#[derive(Deserialize)]
struct CredentialWire {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_at: Option<u64>,
    #[serde(default)]
    expires_in: Option<u64>,
}

impl<'de> Deserialize<'de> for Credential {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wire = CredentialWire::deserialize(deserializer)?;
        // checked_add: SystemTime arithmetic panics on overflow, and a
        // server is free to send an absurd expiry.
        let expires_at = match (wire.expires_at, wire.expires_in) {
            (Some(secs), _) => UNIX_EPOCH
                .checked_add(Duration::from_secs(secs))
                .ok_or_else(|| D::Error::custom("credential `expires_at` is out of range"))?,
            (None, Some(secs)) => SystemTime::now()
                .checked_add(Duration::from_secs(secs))
                .ok_or_else(|| D::Error::custom("credential `expires_in` is out of range"))?,
            (None, None) => {
                return Err(D::Error::custom(
                    "credential carries neither `expires_at` nor `expires_in`",
                ));
            }
        };
        Ok(Credential {
            access_token: wire.access_token,
            refresh_token: wire.refresh_token,
            expires_at,
        })
    }
}

impl Serialize for Credential {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        #[derive(Serialize)]
        struct Persisted<'a> {
            access_token: &'a str,
            refresh_token: &'a str,
            expires_at: u64,
        }
        Persisted {
            access_token: &self.access_token,
            refresh_token: &self.refresh_token,
            expires_at: secs_since_epoch(self.expires_at),
        }
        .serialize(serializer)
    }
}

fn secs_since_epoch(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs()
}

/// Where the current credential lives. Reads return a snapshot; the refresh
/// coordinator is the only writer. Implementations do not need their own
/// locking beyond making `read` and `write` individually safe.
pub trait CredentialStore: Send + Sync {
    fn read(&self) -> Credential;
    fn write(&self, credential: Credential);
}

/// In-memory store, suitable for processes that do not persist credentials
/// across runs and as a harness for tests.
pub struct MemoryCredentialStore {
    slot: RwLock<Credential>,
}

impl MemoryCredentialStore {
    pub fn new(credential: Credential) -> Self {
        Self {
            slot: RwLock::new(credential),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn read(&self) -> Credential {
        self.slot.read().expect("non-poisoned credential lock").clone()
    }

    fn write(&self, credential: Credential) {
        *self.slot.write().expect("non-poisoned credential lock") = credential;
    }
}
