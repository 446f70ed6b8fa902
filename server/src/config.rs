//! Server configuration

use std::path::PathBuf;

use serde::Deserialize;

/// HTTP host configuration, loaded from `GATEWAY_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Path prefix relayed to the CRM by the generic proxy
    pub proxy_prefix: String,
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Optional CRM credential file, overlaid by `CRM_*` variables
    #[serde(default)]
    pub crm_config_file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            proxy_prefix: "/hubspot".to_string(),
            log_level: "info".to_string(),
            crm_config_file: None,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment, falling back to defaults.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let defaults = Self::default();
        config::Config::builder()
            .set_default("host", defaults.host)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("proxy_prefix", defaults.proxy_prefix)?
            .set_default("log_level", defaults.log_level)?
            .add_source(config::Environment::with_prefix("GATEWAY"))
            .build()?
            .try_deserialize::<Self>()?
            .validated()
    }

    /// Rejects a root proxy prefix, which would shadow every other route.
    pub fn validated(self) -> Result<Self, config::ConfigError> {
        if self.proxy_prefix.trim_matches('/').is_empty() {
            return Err(config::ConfigError::Message(format!(
                "proxy_prefix must not be the root path, got {:?}",
                self.proxy_prefix
            )));
        }
        Ok(self)
    }

    /// Returns the bind address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
