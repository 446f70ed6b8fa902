//! Blocking `Transport` backed by ureq.
//!
//! Status codes are returned as data (`http_status_as_error(false)`), so the
//! upstream client and proxy decide what a 4xx/5xx means. The agent keeps no
//! idle connections: every call opens its own connection and drops it when
//! the response body has been read.

use std::time::Duration;

use tracing::{debug, error};
use ureq::Agent;

use crate::config::Credential;
use crate::error::GatewayError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};

#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    pub fn new(connect_timeout: Option<Duration>, read_timeout: Option<Duration>) -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .max_idle_connections(0)
            .timeout_connect(connect_timeout)
            .timeout_recv_response(read_timeout)
            .timeout_recv_body(read_timeout)
            .build()
            .new_agent();
        Self { agent }
    }

    /// Transport using the credential's configured timeouts.
    pub fn from_credential(credential: &Credential) -> Self {
        Self::new(credential.connect_timeout(), credential.read_timeout())
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, GatewayError> {
        let body = request.body.as_deref().unwrap_or_default();

        let result = match request.method {
            HttpMethod::Get => {
                let mut builder = self.agent.get(&request.url);
                for (name, value) in &request.headers {
                    builder = builder.header(name, value);
                }
                builder.call()
            }
            HttpMethod::Delete => {
                let mut builder = self.agent.delete(&request.url);
                for (name, value) in &request.headers {
                    builder = builder.header(name, value);
                }
                builder.call()
            }
            HttpMethod::Post => {
                let mut builder = self.agent.post(&request.url);
                for (name, value) in &request.headers {
                    builder = builder.header(name, value);
                }
                builder.send(body)
            }
            HttpMethod::Patch => {
                let mut builder = self.agent.patch(&request.url);
                for (name, value) in &request.headers {
                    builder = builder.header(name, value);
                }
                builder.send(body)
            }
        };

        let mut response = result.map_err(|e| {
            error!(method = %request.method, url = %request.url, error = %e, "CRM request failed");
            GatewayError::Transport(e.to_string())
        })?;

        let status = response.status().as_u16();
        // 204 and 304 never carry a body; anything else is read in full, even if empty.
        let body = if status == 204 || status == 304 {
            None
        } else {
            let bytes = response
                .body_mut()
                .with_config()
                .limit(u64::MAX)
                .read_to_vec()
                .map_err(|e| GatewayError::Transport(e.to_string()))?;
            Some(bytes)
        };
        debug!(status, bytes = body.as_ref().map_or(0, Vec::len), "CRM response received");

        Ok(HttpResponse { status, body })
    }
}
