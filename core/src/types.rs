//! Domain types exchanged with the CRM and the inbound callers.
//!
//! # Design
//! A lead has no fixed schema: it is a JSON object whose keys and value
//! types pass through untouched. Forms and choice entries are typed because
//! the gateway builds them itself.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A CRM contact record as an open property bag.
pub type Lead = Map<String, Value>;

/// A CRM-hosted lead-capture form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Form {
    pub id: String,
    pub name: String,
}

/// One entry of the forms selection list shown in the CMS.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormChoice {
    pub label: String,
    pub value: String,
    pub metadata: FormChoiceMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FormChoiceMetadata {
    pub form_id: String,
    /// Absent when no portal id is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed_code: Option<String>,
}

/// A request to relay verbatim to the CRM host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyRequest {
    /// Method as received; only GET and POST are forwarded.
    pub method: String,
    pub path_suffix: String,
    pub query_string: Option<String>,
    pub body: Option<Vec<u8>>,
    pub authorization: Option<String>,
}

/// Status and body relayed back from the CRM host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyResponse {
    pub status: u16,
    pub body: Vec<u8>,
}
