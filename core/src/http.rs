//! HTTP transport types and the `Transport` seam.
//!
//! # Design
//! Requests and responses are plain data. Services build an `HttpRequest`,
//! hand it to a `Transport`, and interpret the returned `HttpResponse`. The
//! production transport is `UreqTransport`; tests swap in a recording stub,
//! so every status-mapping rule can be exercised without a socket.
//!
//! `HttpResponse::body` is `None` when the upstream sent no body at all
//! (e.g. 204), and `Some(vec![])` when a body was present but empty. The
//! upstream client treats those two cases differently.

use std::fmt;
use std::sync::Arc;

use crate::error::GatewayError;

pub const AUTHORIZATION: &str = "Authorization";
pub const CONTENT_TYPE: &str = "Content-Type";
pub const ACCEPT: &str = "Accept";
pub const ACCEPT_LANGUAGE: &str = "Accept-Language";
pub const APPLICATION_JSON: &str = "application/json";

/// HTTP method for an outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// POST and PATCH carry a request body; GET and DELETE never do.
    pub fn sends_body(self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outbound HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// First header value matching `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// An upstream response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Option<Vec<u8>>,
}

impl HttpResponse {
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }

    pub fn body_text(&self) -> String {
        self.body
            .as_deref()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default()
    }
}

/// Executes one blocking HTTP round-trip.
///
/// Implementations must return non-2xx statuses as data, not as errors;
/// `Err` is reserved for I/O failures and maps to `GatewayError::Transport`.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, GatewayError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, GatewayError> {
        (**self).execute(request)
    }
}
