//! HTTP seam between the controller and a chat backend.
//!
//! The controller only ever needs "send one request, get one JSON value
//! back", so that is the whole trait. [`HttpTransport`] does it with a
//! blocking `ureq` agent; the controller moves calls onto tokio's blocking
//! pool.

use std::time::Duration;

use serde_json::Value;

use crate::error::SendError;
use crate::payload::error_message;
use crate::profile::BackendProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// One request to the backend. `path` is relative to the profile's base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: Some(body),
        }
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Put,
            path: path.into(),
            body: Some(body),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            path: path.into(),
            body: None,
        }
    }
}

impl std::fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method.as_str(), self.path)
    }
}

/// Transport-level failure, before any profile interpretation.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    /// Connection refused, DNS, timeout, ...
    Network(String),
    /// Non-2xx status, with the decoded body when it was JSON.
    Status { status: u16, body: Option<Value> },
    /// 2xx but the body was not JSON.
    Decode(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Network(e) => write!(f, "network error: {e}"),
            TransportError::Status { status, .. } => write!(f, "HTTP {status}"),
            TransportError::Decode(e) => write!(f, "invalid JSON body: {e}"),
        }
    }
}

impl std::error::Error for TransportError {}

impl TransportError {
    /// Map into the controller's taxonomy, reading the error field from JSON bodies.
    pub fn into_send_error(self, profile: &BackendProfile) -> SendError {
        match self {
            TransportError::Network(e) => SendError::Network(e),
            TransportError::Decode(e) => SendError::MalformedResponse(e),
            TransportError::Status { status, body } => SendError::Server {
                status: Some(status),
                message: body
                    .as_ref()
                    .and_then(|b| error_message(profile, b))
                    .unwrap_or_else(|| format!("HTTP {status}")),
            },
        }
    }
}

/// Something that can deliver an [`ApiRequest`] and return the JSON reply.
///
/// Implementations block; the controller calls them off the async thread.
pub trait ChatTransport: Send + Sync {
    fn send(&self, request: &ApiRequest) -> Result<Value, TransportError>;
}

/// `ureq`-backed transport rooted at a base URL.
pub struct HttpTransport {
    agent: ureq::Agent,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_profile(profile: &BackendProfile) -> Self {
        Self::new(&profile.base_url, profile.timeout())
    }

    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

impl ChatTransport for HttpTransport {
    fn send(&self, request: &ApiRequest) -> Result<Value, TransportError> {
        let url = self.url(&request.path);
        let call = self
            .agent
            .request(request.method.as_str(), &url)
            .set("Accept", "application/json");

        let result = match &request.body {
            Some(body) => call.send_json(body),
            None => call.call(),
        };

        match result {
            Ok(response) => response
                .into_json::<Value>()
                .map_err(|e| TransportError::Decode(e.to_string())),
            Err(ureq::Error::Status(status, response)) => Err(TransportError::Status {
                status,
                body: response.into_json::<Value>().ok(),
            }),
            Err(ureq::Error::Transport(e)) => Err(TransportError::Network(e.to_string())),
        }
    }
}
