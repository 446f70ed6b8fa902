//! Path-based passthrough to the CRM host.
//!
//! # Design
//! The proxy is content-agnostic: request bodies are written byte-for-byte
//! and the upstream status and body are relayed without parsing. Upstream
//! error statuses are data here, not errors. Only GET and POST are relayed.

use tracing::{debug, info, warn};

use crate::error::GatewayError;
use crate::http::{HttpMethod, Transport, ACCEPT_LANGUAGE};
use crate::types::{ProxyRequest, ProxyResponse};
use crate::upstream::UpstreamClient;

/// Body relayed when the upstream response has none.
pub const EMPTY_BODY: &[u8] = b"{}";

#[derive(Debug, Clone)]
pub struct GenericProxy<T> {
    upstream: UpstreamClient<T>,
}

impl<T: Transport> GenericProxy<T> {
    pub fn new(upstream: UpstreamClient<T>) -> Self {
        Self { upstream }
    }

    pub fn forward(&self, request: ProxyRequest) -> Result<ProxyResponse, GatewayError> {
        let method = parse_method(&request.method)?;
        let url = self.target_url(method, &request);
        info!(%method, %url, "proxying request to CRM");

        let body = match method {
            HttpMethod::Post => Some(request.body.unwrap_or_default()),
            _ => None,
        };

        let response = self.upstream.execute_with(
            method,
            &url,
            request.authorization.as_deref(),
            body,
            &[(ACCEPT_LANGUAGE, "en")],
        )?;

        let body = match response.body {
            Some(bytes) if response.status != 204 || !bytes.is_empty() => bytes,
            _ => EMPTY_BODY.to_vec(),
        };
        debug!(status = response.status, bytes = body.len(), "CRM proxy response");
        Ok(ProxyResponse {
            status: response.status,
            body,
        })
    }

    fn target_url(&self, method: HttpMethod, request: &ProxyRequest) -> String {
        let mut url = format!(
            "{}{}",
            self.upstream.credential().base_url(),
            request.path_suffix
        );
        if method == HttpMethod::Get {
            if let Some(query) = request.query_string.as_deref().filter(|q| !q.is_empty()) {
                url.push('?');
                url.push_str(query);
            }
        }
        url
    }
}

fn parse_method(method: &str) -> Result<HttpMethod, GatewayError> {
    if method.eq_ignore_ascii_case("GET") {
        Ok(HttpMethod::Get)
    } else if method.eq_ignore_ascii_case("POST") {
        Ok(HttpMethod::Post)
    } else {
        warn!(%method, "unsupported proxy method");
        Err(GatewayError::MethodNotAllowed(method.to_string()))
    }
}

/// Splits an inbound path into the part after `prefix`, or `None` when the
/// path is not under `prefix`.
pub fn path_suffix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let prefix = prefix.trim_end_matches('/');
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}
