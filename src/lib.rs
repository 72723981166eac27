//! Authenticated HTTP request coordination.
//!
//! The crate wraps a transport with three cooperating pieces:
//!
//! - an authorization policy that decides, per request, whether to attach a
//!   basic or bearer header, do nothing, or refresh the token first;
//! - a single-flight refresh coordinator, so any number of concurrent
//!   requests that find the bearer credential expired share one refresh
//!   call and one outcome;
//! - a FIFO serializer that holds requests back during the refresh and
//!   replays them in arrival order once it settles.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tokengate::{
//!     AuthMethod, AuthorizationEndpoint, AuthorizedClient, BaseUrl, ClientCredential,
//!     Credential, MemoryCredentialStore, RequestDescriptor, ServiceConfig, UrlPath,
//! };
//!
//! # async fn run(credential: Credential) -> Result<(), tokengate::Error> {
//! let config = ServiceConfig::new(AuthMethod::Bearer {
//!     endpoint: AuthorizationEndpoint::try_new("auth.example.com", "/oauth/token")?,
//!     credential: ClientCredential::new("client-id", None),
//!     store: Arc::new(MemoryCredentialStore::new(credential)),
//! });
//! let client = AuthorizedClient::new(config);
//!
//! let request = RequestDescriptor::new(
//!     BaseUrl::try_new("api.example.com")?,
//!     UrlPath::try_new("/v1/resource")?,
//! );
//! let _response = client.authorize_and_send(&request).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod errors;
pub mod events;
pub mod request;
pub mod response;
pub mod serializer;
pub mod telemetry;
pub mod transport;

pub use auth::{
    AuthDecision, AuthMethod, AuthorizationEndpoint, BasicCredential, ClientCredential, Credential,
    CredentialStore, GrantType, MemoryCredentialStore, RefreshCoordinator,
};
pub use client::AuthorizedClient;
pub use config::ServiceConfig;
pub use errors::{Error, RefreshError, RequestBuildError, TransportError};
pub use events::AuthEvent;
pub use request::{
    BaseUrl, HeaderItem, Method, PreparedRequest, QueryItem, RequestDescriptor, Scheme, UrlPath,
};
pub use response::Response;
pub use serializer::RequestSerializer;
pub use transport::{HttpTransport, Transport};
