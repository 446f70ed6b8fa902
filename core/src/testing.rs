//! Recording stub transport for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::config::{Credential, RawConfig};
use crate::error::GatewayError;
use crate::http::{HttpRequest, HttpResponse, Transport};

pub(crate) fn raw_config() -> RawConfig {
    RawConfig {
        token: Some("test-token".to_string()),
        api_host: Some("api.example.com".to_string()),
        portal_id: Some("12345".to_string()),
        ..RawConfig::default()
    }
}

pub(crate) fn credential() -> Credential {
    Credential::resolve(&raw_config()).unwrap()
}

/// Replays queued responses and records every request it sees.
#[derive(Default)]
pub(crate) struct RecordingTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, GatewayError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl RecordingTransport {
    pub(crate) fn with_responses(responses: Vec<Result<HttpResponse, GatewayError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn replying(status: u16, body: &str) -> Arc<Self> {
        Self::with_responses(vec![Ok(HttpResponse {
            status,
            body: Some(body.as_bytes().to_vec()),
        })])
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn only_request(&self) -> HttpRequest {
        let requests = self.requests();
        assert_eq!(requests.len(), 1, "expected exactly one request");
        requests.into_iter().next().unwrap()
    }
}

impl Transport for RecordingTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, GatewayError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::Transport("no stubbed response".into())))
    }
}
