//! Inbound lead action: turns a CMS action request into Lead Service calls
//! and renders every outcome as a status plus JSON body.
//!
//! | request                              | result                          |
//! |--------------------------------------|---------------------------------|
//! | POST `{"properties": {...}}`         | 201, CRM response JSON          |
//! | POST with empty body                 | 400 `Payload is required`       |
//! | GET `?leadId=...`                    | 200, CRM lead JSON              |
//! | GET without `leadId`                 | 400 `Lead ID is required`       |
//! | any other method                     | 405 `Method not allowed`        |
//! | any `GatewayError`                   | `status_code()`, `{"error": msg}` |

use std::collections::HashMap;

use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::error::GatewayError;
use crate::gateway::Gateway;
use crate::http::Transport;
use crate::types::Lead;

pub const LEAD_ID_PARAM: &str = "leadId";

/// An inbound action request.
#[derive(Debug, Clone, Default)]
pub struct ActionRequest {
    pub method: String,
    pub body: String,
    pub params: HashMap<String, Vec<String>>,
}

impl ActionRequest {
    /// First value of query parameter `name`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

/// Status and JSON body returned to the inbound caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionResult {
    pub status: u16,
    pub body: Value,
}

impl ActionResult {
    fn ok(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn error(err: &GatewayError) -> Self {
        Self {
            status: err.status_code(),
            body: json!({ "error": err.to_string() }),
        }
    }
}

impl<T: Transport> Gateway<T> {
    /// Runs the lead action. Never fails: errors become JSON envelopes.
    pub fn handle_action(&self, request: &ActionRequest) -> ActionResult {
        info!(method = %request.method, "lead action triggered");
        let outcome = if request.method.eq_ignore_ascii_case("POST") {
            self.create_from_payload(&request.body)
        } else if request.method.eq_ignore_ascii_case("GET") {
            self.fetch_lead(request.param(LEAD_ID_PARAM))
        } else {
            Err(GatewayError::MethodNotAllowed(request.method.clone()))
        };

        match outcome {
            Ok(result) => result,
            Err(GatewayError::MethodNotAllowed(method)) => {
                warn!(%method, "lead action method not allowed");
                ActionResult::ok(405, json!({ "error": "Method not allowed" }))
            }
            Err(err) => {
                if err.status_code() >= 500 {
                    error!(error = %err, "lead action failed");
                } else {
                    warn!(error = %err, "lead action rejected");
                }
                ActionResult::error(&err)
            }
        }
    }

    fn create_from_payload(&self, payload: &str) -> Result<ActionResult, GatewayError> {
        debug!(%payload, "lead action payload");
        let lead = parse_properties(payload)?;
        let result = self.leads()?.create(&lead)?;
        info!(status = result.status, "lead created");
        Ok(ActionResult::ok(201, result.into_json()))
    }

    fn fetch_lead(&self, lead_id: Option<&str>) -> Result<ActionResult, GatewayError> {
        let lead_id = lead_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| GatewayError::Validation("Lead ID is required".into()))?;
        let result = self.leads()?.get_by_id(lead_id)?;
        Ok(ActionResult::ok(200, result.into_json()))
    }
}

/// Extracts the `properties` object from a create payload.
fn parse_properties(payload: &str) -> Result<Lead, GatewayError> {
    if payload.trim().is_empty() {
        return Err(GatewayError::Validation("Payload is required".into()));
    }
    let json: Value = serde_json::from_str(payload)
        .map_err(|e| GatewayError::Validation(format!("Payload is not valid JSON: {e}")))?;
    match json.get("properties") {
        Some(Value::Object(properties)) => Ok(properties.clone()),
        Some(_) => Err(GatewayError::Validation("'properties' must be an object".into())),
        None => Err(GatewayError::Validation("'properties' key is missing".into())),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::{raw_config, RecordingTransport};

    fn gateway(transport: &Arc<RecordingTransport>) -> Gateway<Arc<RecordingTransport>> {
        let mut gateway = Gateway::new();
        gateway
            .initialize_with(&raw_config(), |_| Arc::clone(transport))
            .unwrap();
        gateway
    }

    fn post(body: &str) -> ActionRequest {
        ActionRequest {
            method: "POST".to_string(),
            body: body.to_string(),
            ..ActionRequest::default()
        }
    }

    fn get(lead_id: Option<&str>) -> ActionRequest {
        let mut params = HashMap::new();
        if let Some(id) = lead_id {
            params.insert(LEAD_ID_PARAM.to_string(), vec![id.to_string()]);
        }
        ActionRequest {
            method: "GET".to_string(),
            params,
            ..ActionRequest::default()
        }
    }

    #[test]
    fn post_creates_lead_with_201() {
        let upstream = r#"{"id":"123","properties":{"email":"a@b.com"}}"#;
        let transport = RecordingTransport::replying(201, upstream);
        let result = gateway(&transport)
            .handle_action(&post(r#"{"properties":{"email":"a@b.com","firstname":"A"}}"#));

        assert_eq!(result.status, 201);
        assert_eq!(result.body, serde_json::from_str::<Value>(upstream).unwrap());

        let sent: Value =
            serde_json::from_slice(transport.only_request().body.as_deref().unwrap()).unwrap();
        assert_eq!(sent, json!({"properties": {"email": "a@b.com", "firstname": "A"}}));
    }

    #[test]
    fn empty_post_is_400() {
        let transport = RecordingTransport::with_responses(Vec::new());
        let result = gateway(&transport).handle_action(&post(""));
        assert_eq!(result.status, 400);
        assert_eq!(result.body, json!({"error": "Payload is required"}));
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn post_without_properties_is_400() {
        let transport = RecordingTransport::with_responses(Vec::new());
        let result = gateway(&transport).handle_action(&post(r#"{"email":"a@b.com"}"#));
        assert_eq!(result.status, 400);
        assert_eq!(result.body, json!({"error": "'properties' key is missing"}));

        let result = gateway(&transport).handle_action(&post("not json"));
        assert_eq!(result.status, 400);
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn get_returns_lead() {
        let transport = RecordingTransport::replying(200, r#"{"id":"9","properties":{"email":"x@y.z"}}"#);
        let result = gateway(&transport).handle_action(&get(Some("9")));
        assert_eq!(result.status, 200);
        assert_eq!(result.body["id"], "9");
        assert!(transport.only_request().url.ends_with("/contacts/9"));
    }

    #[test]
    fn get_without_lead_id_is_400() {
        let transport = RecordingTransport::with_responses(Vec::new());
        let gw = gateway(&transport);
        for request in [get(None), get(Some(""))] {
            let result = gw.handle_action(&request);
            assert_eq!(result.status, 400);
            assert_eq!(result.body, json!({"error": "Lead ID is required"}));
        }
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn other_methods_are_405() {
        let transport = RecordingTransport::with_responses(Vec::new());
        let result = gateway(&transport).handle_action(&ActionRequest {
            method: "DELETE".to_string(),
            ..ActionRequest::default()
        });
        assert_eq!(result.status, 405);
        assert_eq!(result.body, json!({"error": "Method not allowed"}));
    }

    #[test]
    fn upstream_failure_is_500_envelope() {
        let transport = RecordingTransport::replying(403, r#"{"message":"forbidden"}"#);
        let result = gateway(&transport).handle_action(&get(Some("9")));
        assert_eq!(result.status, 500);
        let message = result.body["error"].as_str().unwrap();
        assert!(message.contains("403"));
    }

    #[test]
    fn inactive_gateway_renders_500() {
        let gateway: Gateway<Arc<RecordingTransport>> = Gateway::new();
        let result = gateway.handle_action(&get(Some("9")));
        assert_eq!(result.status, 500);
        assert!(result.body["error"].is_string());
    }
}
