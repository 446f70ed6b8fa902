//! Credential resolution.
//!
//! # Design
//! `RawConfig` is whatever the operator supplied: every field optional,
//! loaded from a file and `CRM_*` environment variables. `Credential::resolve`
//! validates it once into an immutable `Credential`. `CredentialResolver`
//! wraps that in a one-shot state machine:
//!
//! ```text
//! Uninitialized --resolve ok--> Active
//! Uninitialized --resolve err-> Failed   (terminal)
//! ```
//!
//! The token never appears in `Debug` output.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::GatewayError;

pub const DEFAULT_SCHEMA: &str = "https";
pub const DEFAULT_CONTACTS_PATH: &str = "/crm/v3/objects/contacts";
pub const DEFAULT_FORMS_PATH: &str = "/forms/v2/forms";
pub const DEFAULT_FORMS_REGION: &str = "eu1";

const ENV_PREFIX: &str = "CRM";

/// Unvalidated gateway configuration.
#[derive(Clone, Default, Deserialize)]
pub struct RawConfig {
    pub token: Option<String>,
    #[serde(alias = "apiSchema")]
    pub api_schema: Option<String>,
    #[serde(alias = "apiHost")]
    pub api_host: Option<String>,
    #[serde(alias = "contactsPath")]
    pub contacts_path: Option<String>,
    #[serde(alias = "formsPath")]
    pub forms_path: Option<String>,
    #[serde(alias = "portalId")]
    pub portal_id: Option<String>,
    #[serde(alias = "formsRegion")]
    pub forms_region: Option<String>,
    #[serde(alias = "connectTimeoutSecs")]
    pub connect_timeout_secs: Option<u64>,
    #[serde(alias = "readTimeoutSecs")]
    pub read_timeout_secs: Option<u64>,
}

impl RawConfig {
    /// Loads `CRM_*` environment variables (`CRM_TOKEN`, `CRM_API_HOST`, ...).
    pub fn from_env() -> Result<Self, GatewayError> {
        Self::load(None)
    }

    /// Loads an optional config file, then overlays `CRM_*` environment
    /// variables. File keys use snake_case (`api_host`, `portal_id`, ...).
    pub fn load(file: Option<&Path>) -> Result<Self, GatewayError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .and_then(|cfg| cfg.try_deserialize())
            .map_err(|e| GatewayError::Configuration(e.to_string()))
    }
}

impl fmt::Debug for RawConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("api_schema", &self.api_schema)
            .field("api_host", &self.api_host)
            .field("contacts_path", &self.contacts_path)
            .field("forms_path", &self.forms_path)
            .field("portal_id", &self.portal_id)
            .field("forms_region", &self.forms_region)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("read_timeout_secs", &self.read_timeout_secs)
            .finish()
    }
}

/// Validated, immutable CRM credential and endpoint layout.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    schema: String,
    host: String,
    contacts_path: String,
    forms_path: String,
    portal_id: Option<String>,
    forms_region: String,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
}

impl Credential {
    /// Validates `raw`. Token and host are mandatory; everything else has a
    /// default. A missing portal id is only logged.
    pub fn resolve(raw: &RawConfig) -> Result<Self, GatewayError> {
        let token = required(raw.token.as_deref())
            .ok_or_else(|| GatewayError::Configuration("CRM token is not configured".into()))?;
        let host = required(raw.api_host.as_deref())
            .ok_or_else(|| GatewayError::Configuration("CRM API host is not configured".into()))?
            .trim_end_matches('/')
            .to_string();

        let schema = required(raw.api_schema.as_deref())
            .unwrap_or(DEFAULT_SCHEMA)
            .to_ascii_lowercase();
        if schema != "http" && schema != "https" {
            return Err(GatewayError::Configuration(format!(
                "unsupported API schema {schema:?}, expected http or https"
            )));
        }

        let portal_id = required(raw.portal_id.as_deref()).map(str::to_string);
        if portal_id.is_none() {
            warn!("CRM portal id is not configured; form embed codes will be omitted");
        }

        let credential = Credential {
            token: token.to_string(),
            schema,
            host,
            contacts_path: endpoint_path(raw.contacts_path.as_deref(), DEFAULT_CONTACTS_PATH),
            forms_path: endpoint_path(raw.forms_path.as_deref(), DEFAULT_FORMS_PATH),
            portal_id,
            forms_region: required(raw.forms_region.as_deref())
                .unwrap_or(DEFAULT_FORMS_REGION)
                .to_string(),
            connect_timeout: raw.connect_timeout_secs.map(Duration::from_secs),
            read_timeout: raw.read_timeout_secs.map(Duration::from_secs),
        };
        info!(contacts_url = %credential.contacts_url(), "resolved CRM credential");
        Ok(credential)
    }

    /// Default `Authorization` header value.
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// `<schema>://<host>`, the root every proxied path is appended to.
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.schema, self.host)
    }

    pub fn contacts_url(&self) -> String {
        format!("{}{}", self.base_url(), self.contacts_path)
    }

    pub fn forms_url(&self) -> String {
        format!("{}{}", self.base_url(), self.forms_path)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn portal_id(&self) -> Option<&str> {
        self.portal_id.as_deref()
    }

    pub fn forms_region(&self) -> &str {
        &self.forms_region
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("schema", &self.schema)
            .field("host", &self.host)
            .field("contacts_path", &self.contacts_path)
            .field("forms_path", &self.forms_path)
            .field("portal_id", &self.portal_id)
            .field("forms_region", &self.forms_region)
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}

fn required(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn endpoint_path(value: Option<&str>, default: &str) -> String {
    let path = required(value).unwrap_or(default);
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// Lifecycle of a `CredentialResolver`.
#[derive(Debug, Clone)]
pub enum ResolverState {
    Uninitialized,
    Active(Arc<Credential>),
    Failed(String),
}

/// One-shot credential resolution.
#[derive(Debug)]
pub struct CredentialResolver {
    state: ResolverState,
}

impl Default for CredentialResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialResolver {
    pub fn new() -> Self {
        Self {
            state: ResolverState::Uninitialized,
        }
    }

    /// Resolves `raw` on the first call. Later calls return the outcome of
    /// the first one without looking at `raw`.
    pub fn resolve(&mut self, raw: &RawConfig) -> Result<Arc<Credential>, GatewayError> {
        if let ResolverState::Uninitialized = self.state {
            self.state = match Credential::resolve(raw) {
                Ok(credential) => ResolverState::Active(Arc::new(credential)),
                Err(GatewayError::Configuration(msg)) => ResolverState::Failed(msg),
                Err(other) => ResolverState::Failed(other.to_string()),
            };
        }
        self.credential()
    }

    pub fn credential(&self) -> Result<Arc<Credential>, GatewayError> {
        match &self.state {
            ResolverState::Active(credential) => Ok(Arc::clone(credential)),
            ResolverState::Failed(msg) => Err(GatewayError::Configuration(msg.clone())),
            ResolverState::Uninitialized => Err(GatewayError::Configuration(
                "credential has not been resolved".into(),
            )),
        }
    }

    pub fn state(&self) -> &ResolverState {
        &self.state
    }
}
