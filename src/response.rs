use serde::de::DeserializeOwned;

use crate::request::HeaderItem;

/// Response returned by a [`Transport`](crate::transport::Transport)
/// implementation. Carries every status code; classifying non-2xx statuses
/// as errors is the client's job, not the transport's.
#[derive(Clone, Debug)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<HeaderItem>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|item| item.name.eq_ignore_ascii_case(name))
            .map(|item| item.value.as_str())
    }

    /// Decodes the body as JSON into the expected model.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
