//! Read-only listing of CRM forms and the CMS choice-list projection.
//!
//! A 403 here means the token lacks the forms scope and is reported as
//! `PermissionDenied`. Other endpoints do not get that treatment.

use serde_json::Value;
use tracing::{error, info};

use crate::error::GatewayError;
use crate::http::{HttpMethod, Transport};
use crate::types::{Form, FormChoice, FormChoiceMetadata};
use crate::upstream::UpstreamClient;

const EMBED_SCRIPT_SRC: &str = "//js.hsforms.net/forms/embed/v2.js";

#[derive(Debug, Clone)]
pub struct FormsLister<T> {
    upstream: UpstreamClient<T>,
}

impl<T: Transport> FormsLister<T> {
    pub fn new(upstream: UpstreamClient<T>) -> Self {
        Self { upstream }
    }

    /// Forms in the order the CRM returned them.
    pub fn list_forms(&self) -> Result<Vec<Form>, GatewayError> {
        let url = self.upstream.credential().forms_url();
        info!(%url, "listing CRM forms");

        let response = self.upstream.execute(HttpMethod::Get, &url, None, None)?;
        if response.status == 403 {
            error!("forms listing forbidden (403), token is likely missing the forms scope");
            return Err(GatewayError::PermissionDenied(
                "failed to fetch forms: HTTP 403; check that the token has the forms scope".into(),
            ));
        }
        if response.is_error() {
            return Err(GatewayError::UpstreamHttp {
                status: response.status,
                body: response.body_text(),
            });
        }

        let bytes = response.body.unwrap_or_default();
        let json: Value = serde_json::from_slice(&bytes)
            .map_err(|e| GatewayError::UnexpectedResponse(format!("forms body is not JSON: {e}")))?;
        let results = json
            .get("results")
            .and_then(Value::as_array)
            .ok_or_else(|| GatewayError::UnexpectedResponse("forms body has no results array".into()))?;

        Ok(results
            .iter()
            .map(|form| Form {
                id: text_field(form, "id"),
                name: text_field(form, "name"),
            })
            .collect())
    }

    /// Forms as selection-list entries carrying the embed snippet.
    pub fn choices(&self) -> Result<Vec<FormChoice>, GatewayError> {
        let credential = self.upstream.credential();
        let forms = self.list_forms()?;
        Ok(forms
            .into_iter()
            .map(|form| to_choice(form, credential.portal_id(), credential.forms_region()))
            .collect())
    }
}

/// Missing or null fields become "", other non-strings their JSON text.
fn text_field(form: &Value, key: &str) -> String {
    match form.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

pub fn embed_code(portal_id: &str, form_id: &str, region: &str) -> String {
    format!(
        "<script charset=\"utf-8\" type=\"text/javascript\" src=\"{EMBED_SCRIPT_SRC}\"></script>\n\
         <script>hbspt.forms.create({{region: \"{region}\", portalId: \"{portal_id}\", formId: \"{form_id}\"}});</script>"
    )
}

fn to_choice(form: Form, portal_id: Option<&str>, region: &str) -> FormChoice {
    let embed_code = portal_id.map(|portal| embed_code(portal, &form.id, region));
    FormChoice {
        label: form.name,
        value: form.id.clone(),
        metadata: FormChoiceMetadata {
            form_id: form.id,
            embed_code,
        },
    }
}
