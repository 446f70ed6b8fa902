//! Explicit gateway lifecycle.
//!
//! # Design
//! `Gateway` owns the credential resolver and, once active, the three
//! services built on it. Services only exist for an active credential, so a
//! failed or shut-down gateway refuses every call before touching the
//! network.
//!
//! ```text
//! Uninitialized --initialize ok--> Active --shutdown--> ShutDown
//! Uninitialized --initialize err-> Failed
//! ```

use std::fmt;

use tracing::{error, info};

use crate::config::{Credential, CredentialResolver, RawConfig, ResolverState};
use crate::error::GatewayError;
use crate::forms::FormsLister;
use crate::http::Transport;
use crate::leads::LeadService;
use crate::proxy::GenericProxy;
use crate::transport::UreqTransport;
use crate::upstream::UpstreamClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Active,
    Failed,
    ShutDown,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Lifecycle::Uninitialized => "uninitialized",
            Lifecycle::Active => "active",
            Lifecycle::Failed => "failed",
            Lifecycle::ShutDown => "shut_down",
        })
    }
}

#[derive(Debug)]
struct Services<T> {
    leads: LeadService<T>,
    forms: FormsLister<T>,
    proxy: GenericProxy<T>,
}

#[derive(Debug)]
pub struct Gateway<T> {
    resolver: CredentialResolver,
    services: Option<Services<T>>,
    shut_down: bool,
}

impl<T> Default for Gateway<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Gateway<T> {
    pub fn new() -> Self {
        Self {
            resolver: CredentialResolver::new(),
            services: None,
            shut_down: false,
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        if self.shut_down {
            return Lifecycle::ShutDown;
        }
        match self.resolver.state() {
            ResolverState::Uninitialized => Lifecycle::Uninitialized,
            ResolverState::Active(_) => Lifecycle::Active,
            ResolverState::Failed(_) => Lifecycle::Failed,
        }
    }

    /// Drops the services. Every later call fails with `Configuration`.
    pub fn shutdown(&mut self) {
        if self.services.take().is_some() {
            info!("CRM gateway shut down");
        }
        self.shut_down = true;
    }

    fn services(&self) -> Result<&Services<T>, GatewayError> {
        if self.shut_down {
            return Err(GatewayError::Configuration("gateway has been shut down".into()));
        }
        match &self.services {
            Some(services) => Ok(services),
            None => Err(self.resolver.credential().err().unwrap_or_else(|| {
                GatewayError::Configuration("gateway is not initialized".into())
            })),
        }
    }

    pub fn leads(&self) -> Result<&LeadService<T>, GatewayError> {
        self.services().map(|s| &s.leads)
    }

    pub fn forms(&self) -> Result<&FormsLister<T>, GatewayError> {
        self.services().map(|s| &s.forms)
    }

    pub fn proxy(&self) -> Result<&GenericProxy<T>, GatewayError> {
        self.services().map(|s| &s.proxy)
    }
}

impl<T: Transport + Clone> Gateway<T> {
    /// Resolves `raw` and builds the services, using `connect` to create the
    /// transport from the resolved credential. One-shot: only the first call
    /// on an uninitialized gateway does anything.
    pub fn initialize_with<F>(&mut self, raw: &RawConfig, connect: F) -> Result<(), GatewayError>
    where
        F: FnOnce(&Credential) -> T,
    {
        if self.shut_down {
            return Err(GatewayError::Configuration("gateway has been shut down".into()));
        }
        if self.lifecycle() != Lifecycle::Uninitialized {
            return self.services().map(|_| ());
        }

        let credential = self.resolver.resolve(raw).map_err(|e| {
            error!(error = %e, "CRM gateway failed to activate");
            e
        })?;
        let upstream = UpstreamClient::new(credential.clone(), connect(&credential));
        self.services = Some(Services {
            leads: LeadService::new(upstream.clone()),
            forms: FormsLister::new(upstream.clone()),
            proxy: GenericProxy::new(upstream),
        });
        info!(base_url = %credential.base_url(), "CRM gateway activated");
        Ok(())
    }
}

impl Gateway<UreqTransport> {
    /// Initializes with a ureq transport honoring the configured timeouts.
    pub fn initialize(&mut self, raw: &RawConfig) -> Result<(), GatewayError> {
        self.initialize_with(raw, UreqTransport::from_credential)
    }
}
