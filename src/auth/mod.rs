mod credential;
mod policy;
mod refresh;

pub use credential::{Credential, CredentialStore, MemoryCredentialStore};
pub use policy::{AuthDecision, authorization_decision};
pub use refresh::{Engagement, RefreshCoordinator};

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::errors::RequestBuildError;
use crate::request::{BaseUrl, HeaderItem, UrlPath};

/// How the client authenticates outbound requests. Selected once per client
/// instance; immutable after construction.
#[derive(Clone)]
pub enum AuthMethod {
    /// The application manages its own authorization headers.
    None,
    /// Basic authorization applied from a username/password pair.
    Basic(BasicCredential),
    /// Bearer authorization with automated single-flight refresh. The store
    /// holds the current credential; the endpoint and client credential
    /// drive the refresh call.
    Bearer {
        endpoint: AuthorizationEndpoint,
        credential: ClientCredential,
        store: Arc<dyn CredentialStore>,
    },
}

/// Username/password pair for basic authentication. Combined as
/// `username:password` and base64 encoded when the header is built.
#[derive(Clone, Debug)]
pub struct BasicCredential {
    pub username: String,
    pub password: String,
}

impl BasicCredential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub(crate) fn header_value(&self) -> String {
        let combined = format!("{}:{}", self.username, self.password);
        format!("Basic {}", BASE64.encode(combined))
    }
}

/// OAuth 2.0 grant type sent in the refresh body. Automated refresh supports
/// the `refresh_token` grant (RFC 6749 section 6).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum GrantType {
    #[default]
    RefreshToken,
}

impl GrantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantType::RefreshToken => "refresh_token",
        }
    }
}

/// Client registration data used for the refresh call (RFC 6749 section 2.2).
/// The secret is omitted from the request body when absent.
#[derive(Clone, Debug)]
pub struct ClientCredential {
    pub grant_type: GrantType,
    pub id: String,
    pub secret: Option<String>,
}

impl ClientCredential {
    pub fn new(id: impl Into<String>, secret: Option<String>) -> Self {
        Self {
            grant_type: GrantType::default(),
            id: id.into(),
            secret,
        }
    }
}

/// Location of the authorization server's token endpoint. Host and path are
/// validated at construction so a bad endpoint surfaces during client setup,
/// never in the middle of a refresh.
#[derive(Clone, Debug)]
pub struct AuthorizationEndpoint {
    pub base_url: BaseUrl,
    pub path: UrlPath,
}

impl AuthorizationEndpoint {
    pub fn try_new(host: &str, path: &str) -> Result<Self, RequestBuildError> {
        Ok(Self {
            base_url: BaseUrl::try_new(host)?,
            path: UrlPath::try_new(path)?,
        })
    }

    pub fn from_parts(base_url: BaseUrl, path: UrlPath) -> Self {
        Self { base_url, path }
    }
}

pub(crate) fn bearer_header(credential: &Credential) -> HeaderItem {
    HeaderItem::new(
        crate::request::AUTHORIZATION_HEADER,
        format!("Bearer {}", credential.access_token),
    )
}
