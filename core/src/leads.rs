//! Typed CRUD over the CRM contacts resource.
//!
//! # Design
//! `LeadService` holds only an `UpstreamClient` and carries no state between
//! calls. Create wraps the lead as `{"properties": lead}`; update sends the
//! lead as-is. Results and errors come straight from the upstream client,
//! with no interpretation of the fields the CRM returns.

use serde_json::{json, Value};
use tracing::info;

use crate::error::GatewayError;
use crate::http::{HttpMethod, Transport};
use crate::types::Lead;
use crate::upstream::{UpstreamClient, UpstreamResult};

#[derive(Debug, Clone)]
pub struct LeadService<T> {
    upstream: UpstreamClient<T>,
}

impl<T: Transport> LeadService<T> {
    pub fn new(upstream: UpstreamClient<T>) -> Self {
        Self { upstream }
    }

    pub fn create(&self, lead: &Lead) -> Result<UpstreamResult, GatewayError> {
        let url = self.upstream.credential().contacts_url();
        let payload = json!({ "properties": lead });
        info!(%url, "creating lead");
        self.upstream.send(HttpMethod::Post, &url, Some(&payload))
    }

    pub fn get_by_id(&self, id: &str) -> Result<UpstreamResult, GatewayError> {
        let url = self.lead_url(id)?;
        self.upstream.send(HttpMethod::Get, &url, None)
    }

    pub fn update(&self, id: &str, lead: &Lead) -> Result<UpstreamResult, GatewayError> {
        let url = self.lead_url(id)?;
        let payload = Value::Object(lead.clone());
        self.upstream.send(HttpMethod::Patch, &url, Some(&payload))
    }

    /// Deletes the lead. The response body is discarded.
    pub fn delete(&self, id: &str) -> Result<bool, GatewayError> {
        let url = self.lead_url(id)?;
        self.upstream.send(HttpMethod::Delete, &url, None)?;
        Ok(true)
    }

    fn lead_url(&self, id: &str) -> Result<String, GatewayError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(GatewayError::Validation("Lead ID is required".into()));
        }
        Ok(format!(
            "{}/{}",
            self.upstream.credential().contacts_url(),
            urlencoding::encode(id)
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::{credential, RecordingTransport};
    use crate::upstream::NO_CONTENT_MESSAGE;

    const CONTACTS: &str = "https://api.example.com/crm/v3/objects/contacts";

    fn service(transport: &Arc<RecordingTransport>) -> LeadService<Arc<RecordingTransport>> {
        LeadService::new(UpstreamClient::new(Arc::new(credential()), Arc::clone(transport)))
    }

    fn lead(value: Value) -> Lead {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn create_wraps_lead_in_properties() {
        let transport = RecordingTransport::replying(201, r#"{"id":"123"}"#);
        let input = lead(json!({"email": "a@b.com", "age": 42, "tags": ["x"]}));

        let result = service(&transport).create(&input).unwrap();
        assert_eq!(result.status, 201);
        assert_eq!(result.into_json(), json!({"id": "123"}));

        let req = transport.only_request();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, CONTACTS);
        let body: Value = serde_json::from_slice(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"properties": {"email": "a@b.com", "age": 42, "tags": ["x"]}}));
    }

    #[test]
    fn get_by_id_targets_lead_path() {
        let transport = RecordingTransport::replying(200, r#"{"id":"77","properties":{}}"#);
        service(&transport).get_by_id("77").unwrap();

        let req = transport.only_request();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, format!("{CONTACTS}/77"));
        assert!(req.body.is_none());
    }

    #[test]
    fn empty_id_fails_without_network_call() {
        let transport = RecordingTransport::with_responses(Vec::new());
        let svc = service(&transport);

        assert!(matches!(svc.get_by_id(""), Err(GatewayError::Validation(_))));
        assert!(matches!(svc.get_by_id("  "), Err(GatewayError::Validation(_))));
        assert!(matches!(svc.update("", &Lead::new()), Err(GatewayError::Validation(_))));
        assert!(matches!(svc.delete(""), Err(GatewayError::Validation(_))));
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn update_sends_lead_unwrapped() {
        let transport = RecordingTransport::replying(200, r#"{"id":"77"}"#);
        let input = lead(json!({"firstname": "Ada"}));
        service(&transport).update("77", &input).unwrap();

        let req = transport.only_request();
        assert_eq!(req.method, HttpMethod::Patch);
        assert_eq!(req.url, format!("{CONTACTS}/77"));
        let body: Value = serde_json::from_slice(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"firstname": "Ada"}));
    }

    #[test]
    fn delete_returns_true_on_no_content() {
        let transport = RecordingTransport::replying(204, "");
        assert!(service(&transport).delete("77").unwrap());
        let req = transport.only_request();
        assert_eq!(req.method, HttpMethod::Delete);
        assert!(req.body.is_none());
    }

    #[test]
    fn get_on_no_content_yields_sentinel() {
        let transport = RecordingTransport::replying(204, "");
        let result = service(&transport).get_by_id("77").unwrap();
        assert_eq!(result.into_json(), json!({"message": NO_CONTENT_MESSAGE}));
    }

    #[test]
    fn forbidden_contacts_is_plain_upstream_error() {
        let transport = RecordingTransport::replying(403, r#"{"message":"missing scope"}"#);
        let err = service(&transport).get_by_id("77").unwrap_err();
        assert!(matches!(err, GatewayError::UpstreamHttp { status: 403, .. }));
    }

    #[test]
    fn id_is_encoded_as_single_segment() {
        let transport = RecordingTransport::replying(200, "{}");
        service(&transport).get_by_id("a/b c").unwrap();
        assert_eq!(transport.only_request().url, format!("{CONTACTS}/a%2Fb%20c"));
    }
}
