//! Upstream client: header injection and response interpretation.
//!
//! # Design
//! `execute` is the raw primitive: it injects `Authorization`,
//! `Content-Type`, and `Accept` and returns whatever status and body came
//! back. `send` layers the JSON contract on top of it:
//!
//! | upstream                    | result                         |
//! |-----------------------------|--------------------------------|
//! | status >= 400               | `UpstreamHttp { status, body }`|
//! | 204, body absent or empty   | `{"message": NO_CONTENT_MESSAGE}` |
//! | other status, body absent   | `Transport("no response body")` |
//! | other status, body empty    | `EmptyResponse`                |
//! | JSON body                   | `UpstreamBody::Json`           |
//! | non-JSON body               | `UpstreamBody::Raw`            |

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::config::Credential;
use crate::error::GatewayError;
use crate::http::{
    HttpMethod, HttpRequest, HttpResponse, Transport, ACCEPT, APPLICATION_JSON, AUTHORIZATION,
    CONTENT_TYPE,
};

pub const NO_CONTENT_MESSAGE: &str = "No content returned from the server";

/// Parsed body of a successful upstream call.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamBody {
    Json(Value),
    Raw(Vec<u8>),
}

/// Outcome of a successful upstream call.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResult {
    pub status: u16,
    pub body: UpstreamBody,
}

impl UpstreamResult {
    fn no_content() -> Self {
        Self {
            status: 204,
            body: UpstreamBody::Json(json!({ "message": NO_CONTENT_MESSAGE })),
        }
    }

    /// The body as JSON; a raw body becomes a JSON string.
    pub fn into_json(self) -> Value {
        match self.body {
            UpstreamBody::Json(value) => value,
            UpstreamBody::Raw(bytes) => Value::String(String::from_utf8_lossy(&bytes).into_owned()),
        }
    }

    pub fn json(&self) -> Option<&Value> {
        match &self.body {
            UpstreamBody::Json(value) => Some(value),
            UpstreamBody::Raw(_) => None,
        }
    }
}

/// Synchronous call primitive shared by every service.
#[derive(Debug, Clone)]
pub struct UpstreamClient<T> {
    credential: Arc<Credential>,
    transport: T,
}

impl<T: Transport> UpstreamClient<T> {
    pub fn new(credential: Arc<Credential>, transport: T) -> Self {
        Self {
            credential,
            transport,
        }
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Sends `body` as JSON (POST/PATCH only) and interprets the response.
    pub fn send(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<&Value>,
    ) -> Result<UpstreamResult, GatewayError> {
        let payload = if method.sends_body() {
            let json = serde_json::to_vec(body.unwrap_or(&Value::Null))
                .map_err(|e| GatewayError::Serialization(e.to_string()))?;
            Some(json)
        } else {
            None
        };

        let response = self.execute(method, url, None, payload)?;
        interpret(response)
    }

    /// Runs one request with the standard headers. `authorization` overrides
    /// the credential's bearer token when it is non-empty.
    pub fn execute(
        &self,
        method: HttpMethod,
        url: &str,
        authorization: Option<&str>,
        body: Option<Vec<u8>>,
    ) -> Result<HttpResponse, GatewayError> {
        self.execute_with(method, url, authorization, body, &[])
    }

    pub(crate) fn execute_with(
        &self,
        method: HttpMethod,
        url: &str,
        authorization: Option<&str>,
        body: Option<Vec<u8>>,
        extra_headers: &[(&str, &str)],
    ) -> Result<HttpResponse, GatewayError> {
        let authorization = match authorization.map(str::trim) {
            Some(caller) if !caller.is_empty() => caller.to_string(),
            _ => self.credential.authorization(),
        };

        let mut headers = vec![
            (AUTHORIZATION.to_string(), authorization),
            (CONTENT_TYPE.to_string(), APPLICATION_JSON.to_string()),
            (ACCEPT.to_string(), APPLICATION_JSON.to_string()),
        ];
        headers.extend(
            extra_headers
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string())),
        );

        if let Some(bytes) = &body {
            debug!(payload = %String::from_utf8_lossy(bytes), "request payload");
        }
        info!(%method, %url, "sending CRM request");

        let response = self.transport.execute(&HttpRequest {
            method,
            url: url.to_string(),
            headers,
            body,
        })?;
        info!(status = response.status, "received CRM response");
        Ok(response)
    }
}

fn interpret(response: HttpResponse) -> Result<UpstreamResult, GatewayError> {
    let status = response.status;

    if response.is_error() {
        let body = response.body_text();
        error!(status, %body, "CRM returned an error response");
        return Err(GatewayError::UpstreamHttp { status, body });
    }

    let bytes = match response.body {
        Some(bytes) => bytes,
        None if status == 204 => {
            warn!("no content returned from the server (204)");
            return Ok(UpstreamResult::no_content());
        }
        None => return Err(GatewayError::Transport("no response body".into())),
    };

    if bytes.iter().all(u8::is_ascii_whitespace) {
        if status == 204 {
            warn!("empty response body for 204");
            return Ok(UpstreamResult::no_content());
        }
        error!(status, "empty response body received from CRM");
        return Err(GatewayError::EmptyResponse { status });
    }

    let body = match serde_json::from_slice(&bytes) {
        Ok(value) => UpstreamBody::Json(value),
        Err(e) => {
            warn!(status, error = %e, "CRM response is not JSON, returning raw body");
            UpstreamBody::Raw(bytes)
        }
    };
    Ok(UpstreamResult { status, body })
}
