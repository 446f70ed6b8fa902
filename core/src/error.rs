//! Error taxonomy for the CRM gateway.
//!
//! # Design
//! Every failure the gateway can produce lands in one `GatewayError` variant,
//! so callers pattern-match instead of inspecting messages. `PermissionDenied`
//! is only raised by the forms listing; a 403 from any other endpoint is an
//! ordinary `UpstreamHttp`. `status_code` gives the HTTP status the inbound
//! boundary renders for each kind.

use thiserror::Error;

/// Errors returned by the credential resolver, services, and proxy.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Configuration is missing or invalid, or the gateway is not active.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Caller input is missing a required field.
    #[error("{0}")]
    Validation(String),

    /// The proxy or action endpoint received an unsupported method.
    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),

    /// The forms endpoint answered 403.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The CRM answered with a non-2xx status.
    #[error("upstream returned HTTP {status}: {body}")]
    UpstreamHttp { status: u16, body: String },

    /// The CRM answered with an empty body where one was expected.
    #[error("empty response received from upstream (HTTP {status})")]
    EmptyResponse { status: u16 },

    /// Network or I/O failure talking to the CRM.
    #[error("transport error: {0}")]
    Transport(String),

    /// A request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The CRM answered 2xx with a body of the wrong shape.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl GatewayError {
    /// HTTP status rendered at the inbound boundary for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::Validation(_) => 400,
            GatewayError::PermissionDenied(_) => 403,
            GatewayError::MethodNotAllowed(_) => 405,
            GatewayError::Configuration(_)
            | GatewayError::UpstreamHttp { .. }
            | GatewayError::EmptyResponse { .. }
            | GatewayError::Transport(_)
            | GatewayError::Serialization(_)
            | GatewayError::UnexpectedResponse(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_errors_map_to_4xx() {
        assert_eq!(GatewayError::Validation("x".into()).status_code(), 400);
        assert_eq!(GatewayError::PermissionDenied("x".into()).status_code(), 403);
        assert_eq!(GatewayError::MethodNotAllowed("PUT".into()).status_code(), 405);
    }

    #[test]
    fn upstream_failures_default_to_500() {
        let err = GatewayError::UpstreamHttp {
            status: 403,
            body: "{}".into(),
        };
        assert_eq!(err.status_code(), 500);
        assert_eq!(GatewayError::EmptyResponse { status: 200 }.status_code(), 500);
        assert_eq!(GatewayError::Transport("reset".into()).status_code(), 500);
    }

    #[test]
    fn validation_message_is_rendered_verbatim() {
        let err = GatewayError::Validation("Lead ID is required".into());
        assert_eq!(err.to_string(), "Lead ID is required");
    }
}
