//! HTTP host for the CRM gateway.
//!
//! Exposes the lead action, the forms choice list, and the reverse-proxy
//! prefix. Gateway calls block, so each one runs on the blocking pool.

pub mod config;

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{Query, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use crm_gateway_core::{
    proxy::path_suffix, ActionRequest, ActionResult, Gateway, GatewayError, Lifecycle,
    ProxyRequest, UreqTransport,
};
use serde_json::json;
use tracing::error;

pub type SharedGateway = Arc<Gateway<UreqTransport>>;

#[derive(Clone)]
struct AppState {
    gateway: SharedGateway,
    proxy_prefix: Arc<str>,
}

/// Builds the router. `proxy_prefix` must name a non-root path such as
/// `/hubspot`; `ServerConfig::from_env` rejects `/`.
pub fn app(gateway: SharedGateway, proxy_prefix: &str) -> Router {
    let prefix = format!("/{}", proxy_prefix.trim_matches('/'));
    let state = AppState {
        gateway,
        proxy_prefix: Arc::from(prefix.as_str()),
    };
    Router::new()
        .route("/health", get(health))
        .route("/actions/lead", any(lead_action))
        .route("/forms", get(form_choices))
        .route(&prefix, any(proxy))
        .route(&format!("{prefix}/"), any(proxy))
        .route(&format!("{prefix}/{{*rest}}"), any(proxy))
        .with_state(state)
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn render(result: ActionResult) -> Response {
    (status(result.status), Json(result.body)).into_response()
}

fn render_error(err: &GatewayError) -> Response {
    render(ActionResult::error(err))
}

/// Runs a blocking gateway call off the async workers.
async fn blocking<F, R>(gateway: SharedGateway, f: F) -> Result<R, Response>
where
    F: FnOnce(&Gateway<UreqTransport>) -> R + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&gateway))
        .await
        .map_err(|e| {
            error!(error = %e, "gateway task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        })
}

async fn health(State(state): State<AppState>) -> Response {
    match state.gateway.lifecycle() {
        Lifecycle::Active => Json(json!({ "status": "active" })).into_response(),
        other => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": other.to_string() })),
        )
            .into_response(),
    }
}

async fn lead_action(
    State(state): State<AppState>,
    method: Method,
    Query(pairs): Query<Vec<(String, String)>>,
    body: Bytes,
) -> Response {
    let body = match String::from_utf8(body.to_vec()) {
        Ok(body) => body,
        Err(_) => {
            return render_error(&GatewayError::Validation(
                "Payload must be valid UTF-8".into(),
            ))
        }
    };
    let mut request = ActionRequest {
        method: method.as_str().to_string(),
        body,
        ..ActionRequest::default()
    };
    for (key, value) in pairs {
        request.params.entry(key).or_default().push(value);
    }

    match blocking(state.gateway, move |gateway| gateway.handle_action(&request)).await {
        Ok(result) => render(result),
        Err(response) => response,
    }
}

async fn form_choices(State(state): State<AppState>) -> Response {
    let outcome = blocking(state.gateway, |gateway| {
        gateway.forms().and_then(|forms| forms.choices())
    })
    .await;
    match outcome {
        Ok(Ok(choices)) => Json(choices).into_response(),
        Ok(Err(err)) => {
            error!(error = %err, "failed to fetch CRM forms");
            render_error(&err)
        }
        Err(response) => response,
    }
}

async fn proxy(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = ProxyRequest {
        method: method.as_str().to_string(),
        path_suffix: path_suffix(uri.path(), &state.proxy_prefix)
            .unwrap_or_default()
            .to_string(),
        query_string: uri.query().map(str::to_string),
        body: Some(body.to_vec()),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };

    let outcome = blocking(state.gateway, move |gateway| {
        gateway.proxy().and_then(|proxy| proxy.forward(request))
    })
    .await;

    match outcome {
        Ok(Ok(relayed)) => Response::builder()
            .status(status(relayed.status))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(relayed.body))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        Ok(Err(GatewayError::MethodNotAllowed(_))) => (
            StatusCode::METHOD_NOT_ALLOWED,
            Json(json!({ "error": "Method not supported" })),
        )
            .into_response(),
        Ok(Err(err @ GatewayError::Transport(_))) => {
            error!(error = %err, "error handling request to CRM");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Error communicating with CRM API" })),
            )
                .into_response()
        }
        Ok(Err(err)) => render_error(&err),
        Err(response) => response,
    }
}
