use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::RequestBuildError;

// RFC 1035 style labels joined by dots, with an optional port so loopback
// test servers can be addressed.
static URL_HOST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^([a-z0-9]|[a-z0-9][a-z0-9-]{0,61}[a-z0-9])(\.([a-z0-9]|[a-z0-9][a-z0-9-]{0,61}[a-z0-9]))*(:\d{1,5})?$",
    )
    .expect("valid URL host pattern")
});

// One or more non-empty segments, each introduced by a slash.
static URL_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(/[A-Za-z0-9._~%!$&'()*+,;=:@-]+)+/?$").expect("valid URL path pattern")
});

/// URL scheme for a [`BaseUrl`]. Defaults to HTTPS.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Scheme {
    Http,
    #[default]
    Https,
}

impl Scheme {
    fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http://",
            Scheme::Https => "https://",
        }
    }
}

/// Validated scheme + host pair forming the root of a request URL.
///
/// The host is validated eagerly so that a malformed endpoint fails at
/// configuration time rather than at dispatch time.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BaseUrl {
    scheme: Scheme,
    host: String,
}

impl BaseUrl {
    pub fn try_new(host: impl Into<String>) -> Result<Self, RequestBuildError> {
        Self::with_scheme(Scheme::default(), host)
    }

    pub fn with_scheme(scheme: Scheme, host: impl Into<String>) -> Result<Self, RequestBuildError> {
        let host = host.into();
        if !URL_HOST.is_match(&host) {
            return Err(RequestBuildError::InvalidBaseUrl(host));
        }
        Ok(Self { scheme, host })
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.scheme.as_str(), self.host)
    }
}

/// Validated URL path. Must begin with `/` and contain at least one segment.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UrlPath {
    path: String,
}

impl UrlPath {
    pub fn try_new(path: impl Into<String>) -> Result<Self, RequestBuildError> {
        let path = path.into();
        if !URL_PATH.is_match(&path) {
            return Err(RequestBuildError::InvalidUrlPath(path));
        }
        Ok(Self { path })
    }

    /// The empty root path. Not constructible through validation; used for
    /// endpoints addressed by base URL alone.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for UrlPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}
