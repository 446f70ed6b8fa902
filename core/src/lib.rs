//! Synchronous gateway between a CMS and a CRM REST API.
//!
//! # Overview
//! Injects the CRM credential into outbound calls, forwards paths, queries,
//! and bodies, marshals JSON, and maps HTTP statuses onto `GatewayError`.
//! Three surfaces sit on one `UpstreamClient`:
//! - `LeadService`: typed CRUD on the contacts resource.
//! - `FormsLister`: form listing for the CMS selection list.
//! - `GenericProxy`: byte-for-byte passthrough for everything else.
//!
//! # Design
//! - `Gateway` owns the lifecycle: `initialize` resolves the credential once
//!   and builds the services; `shutdown` drops them.
//! - All network I/O goes through the `Transport` trait. `UreqTransport` is
//!   the blocking production implementation.
//! - The only shared state is the immutable `Arc<Credential>`.

pub mod action;
pub mod config;
pub mod error;
pub mod forms;
pub mod gateway;
pub mod http;
pub mod leads;
pub mod proxy;
pub mod transport;
pub mod types;
pub mod upstream;

#[cfg(test)]
mod testing;

pub use action::{ActionRequest, ActionResult};
pub use config::{Credential, CredentialResolver, RawConfig, ResolverState};
pub use error::GatewayError;
pub use forms::FormsLister;
pub use gateway::{Gateway, Lifecycle};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use leads::LeadService;
pub use proxy::GenericProxy;
pub use transport::UreqTransport;
pub use types::{Form, FormChoice, FormChoiceMetadata, Lead, ProxyRequest, ProxyResponse};
pub use upstream::{UpstreamBody, UpstreamClient, UpstreamResult, NO_CONTENT_MESSAGE};
