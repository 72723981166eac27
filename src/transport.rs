use async_trait::async_trait;
use tracing::debug;

use crate::errors::TransportError;
use crate::request::{HeaderItem, PreparedRequest};
use crate::response::Response;

/// Executes a fully-formed request. Implementations return `Ok` for every
/// HTTP status; only connectivity-level failures are errors. This crate
/// never retries a transport failure.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &PreparedRequest) -> Result<Response, TransportError>;
}

/// Reqwest-backed [`Transport`].
#[derive(Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &PreparedRequest) -> Result<Response, TransportError> {
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|err| TransportError::Rejected(err.to_string()))?;
        let mut builder = self.client.request(method, request.url.clone());
        for item in &request.headers {
            builder = builder.header(&item.name, &item.value);
        }
        if let Some(body) = request.method.body() {
            builder = builder.body(body.to_vec());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| HeaderItem::new(name.as_str(), value))
            })
            .collect();
        let body = response.bytes().await?.to_vec();
        debug!(url = %request.url, method = %request.method.as_str(), status, "transport.response");
        Ok(Response {
            status,
            headers,
            body,
        })
    }
}
