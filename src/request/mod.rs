mod url;

pub use url::{BaseUrl, Scheme, UrlPath};

use crate::errors::RequestBuildError;

pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Single HTTP header name/value pair.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HeaderItem {
    pub name: String,
    pub value: String,
}

impl HeaderItem {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Single URL query name/value pair.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct QueryItem {
    pub name: String,
    pub value: String,
}

impl QueryItem {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// HTTP method. Methods that send a payload carry it as associated data.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Method {
    Delete,
    Get,
    Patch(Vec<u8>),
    Post(Vec<u8>),
    Put(Vec<u8>),
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Delete => "DELETE",
            Method::Get => "GET",
            Method::Patch(_) => "PATCH",
            Method::Post(_) => "POST",
            Method::Put(_) => "PUT",
        }
    }

    pub fn body(&self) -> Option<&[u8]> {
        match self {
            Method::Delete | Method::Get => None,
            Method::Patch(data) | Method::Post(data) | Method::Put(data) => Some(data),
        }
    }
}

/// The not-yet-sent representation of an HTTP request.
///
/// `requires_authorization` defaults to true; switching it off opts the
/// request out of automatic header injection and out of the refresh path,
/// even when the client is configured with basic or bearer authentication.
#[derive(Clone, Debug)]
pub struct RequestDescriptor {
    pub base_url: BaseUrl,
    pub path: UrlPath,
    pub method: Method,
    pub header_items: Vec<HeaderItem>,
    pub query_items: Vec<QueryItem>,
    pub requires_authorization: bool,
}

impl RequestDescriptor {
    pub fn new(base_url: BaseUrl, path: UrlPath) -> Self {
        Self {
            base_url,
            path,
            method: Method::Get,
            header_items: Vec::new(),
            query_items: Vec::new(),
            requires_authorization: true,
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.header_items.push(HeaderItem::new(name, value));
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_items.push(QueryItem::new(name, value));
        self
    }

    pub fn without_authorization(mut self) -> Self {
        self.requires_authorization = false;
        self
    }

    /// Lowers the descriptor into a dispatchable request with an absolute
    /// URL. Fails fast, before any network activity.
    pub fn prepare(&self) -> Result<PreparedRequest, RequestBuildError> {
        let raw = format!("{}{}", self.base_url, self.path);
        let mut url =
            ::url::Url::parse(&raw).map_err(|err| RequestBuildError::InvalidUrl(err.to_string()))?;
        if !self.query_items.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for item in &self.query_items {
                pairs.append_pair(&item.name, &item.value);
            }
        }
        Ok(PreparedRequest {
            url,
            method: self.method.clone(),
            headers: self.header_items.clone(),
        })
    }
}

/// A descriptor lowered to an absolute URL, ready for a
/// [`Transport`](crate::transport::Transport).
#[derive(Clone, Debug)]
pub struct PreparedRequest {
    pub url: ::url::Url,
    pub method: Method,
    pub headers: Vec<HeaderItem>,
}

impl PreparedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|item| item.name.eq_ignore_ascii_case(name))
            .map(|item| item.value.as_str())
    }
}

/// Merges a resolved authorization header into a descriptor, preserving the
/// existing header set and replacing any `Authorization` entry already there.
pub fn apply_authorization(descriptor: &RequestDescriptor, header: HeaderItem) -> RequestDescriptor {
    let mut authorized = descriptor.clone();
    authorized
        .header_items
        .retain(|item| !item.name.eq_ignore_ascii_case(AUTHORIZATION_HEADER));
    authorized.header_items.push(header);
    authorized
}
