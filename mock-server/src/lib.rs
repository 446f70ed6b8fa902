use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const DEFAULT_TOKEN: &str = "test-token";
pub const CONTACTS_PATH: &str = "/crm/v3/objects/contacts";
pub const FORMS_PATH: &str = "/forms/v2/forms";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Contact {
    pub id: String,
    pub properties: Map<String, Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MockForm {
    pub id: String,
    pub name: String,
}

#[derive(Deserialize)]
pub struct CreateContact {
    pub properties: Map<String, Value>,
}

/// Knobs for a mock CRM instance.
#[derive(Clone, Debug)]
pub struct MockConfig {
    pub token: String,
    pub forms: Vec<MockForm>,
    /// Answer 403 on the forms endpoint, as for a token without forms scope.
    pub forms_forbidden: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            token: DEFAULT_TOKEN.to_string(),
            forms: vec![
                MockForm {
                    id: "f1".to_string(),
                    name: "Contact Us".to_string(),
                },
                MockForm {
                    id: "f2".to_string(),
                    name: "Newsletter".to_string(),
                },
            ],
            forms_forbidden: false,
        }
    }
}

pub struct MockCrm {
    config: MockConfig,
    contacts: RwLock<HashMap<String, Contact>>,
}

pub type Db = Arc<MockCrm>;

pub fn app() -> Router {
    app_with(MockConfig::default())
}

pub fn app_with(config: MockConfig) -> Router {
    let db: Db = Arc::new(MockCrm {
        config,
        contacts: RwLock::new(HashMap::new()),
    });
    Router::new()
        .route(CONTACTS_PATH, post(create_contact))
        .route(
            &format!("{CONTACTS_PATH}/{{id}}"),
            get(get_contact).patch(update_contact).delete(delete_contact),
        )
        .route(FORMS_PATH, get(list_forms))
        .route("/empty", get(empty_body))
        .route("/bytes/{len}", get(sized_body))
        .route("/echo", any(echo))
        .route("/echo/{*rest}", any(echo))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with(listener: TcpListener, config: MockConfig) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(config)).await
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "status": "error", "message": message }))).into_response()
}

fn authorize(db: &MockCrm, headers: &HeaderMap) -> Result<(), Response> {
    let expected = format!("Bearer {}", db.config.token);
    match headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err(error(
            StatusCode::UNAUTHORIZED,
            "Authentication credentials not found",
        )),
    }
}

async fn create_contact(
    State(db): State<Db>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Contact>), Response> {
    authorize(&db, &headers)?;
    let input: CreateContact = serde_json::from_slice(&body)
        .map_err(|_| error(StatusCode::BAD_REQUEST, "Invalid input JSON: properties required"))?;
    let contact = Contact {
        id: Uuid::new_v4().to_string(),
        properties: input.properties,
    };
    db.contacts
        .write()
        .await
        .insert(contact.id.clone(), contact.clone());
    Ok((StatusCode::CREATED, Json(contact)))
}

async fn get_contact(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Contact>, Response> {
    authorize(&db, &headers)?;
    let contacts = db.contacts.read().await;
    contacts
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "resource not found"))
}

/// Accepts either `{"properties": {...}}` or a bare property map.
async fn update_contact(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(input): Json<Map<String, Value>>,
) -> Result<Json<Contact>, Response> {
    authorize(&db, &headers)?;
    let changes = match input.get("properties") {
        Some(Value::Object(properties)) => properties.clone(),
        _ => input,
    };
    let mut contacts = db.contacts.write().await;
    let contact = contacts
        .get_mut(&id)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "resource not found"))?;
    contact.properties.extend(changes);
    Ok(Json(contact.clone()))
}

async fn delete_contact(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, Response> {
    authorize(&db, &headers)?;
    db.contacts.write().await.remove(&id);
    Ok(StatusCode::NO_CONTENT)
}

async fn list_forms(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Value>, Response> {
    authorize(&db, &headers)?;
    if db.config.forms_forbidden {
        return Err(error(
            StatusCode::FORBIDDEN,
            "This app hasn't been granted all required scopes to make this call.",
        ));
    }
    Ok(Json(json!({ "results": db.config.forms })))
}

async fn empty_body(State(db): State<Db>, headers: HeaderMap) -> Result<StatusCode, Response> {
    authorize(&db, &headers)?;
    Ok(StatusCode::OK)
}

/// Streams back `len` bytes of filler, for relaying bodies of a known size.
async fn sized_body(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(len): Path<usize>,
) -> Result<Vec<u8>, Response> {
    authorize(&db, &headers)?;
    Ok(vec![b'x'; len])
}

/// Reflects the request back so callers can check what was forwarded.
async fn echo(
    method: Method,
    uri: Uri,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Value> {
    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    Json(json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": query,
        "authorization": header_value(header::AUTHORIZATION),
        "content_type": header_value(header::CONTENT_TYPE),
        "accept": header_value(header::ACCEPT),
        "authorization_count": headers.get_all(header::AUTHORIZATION).iter().count(),
        "body": String::from_utf8_lossy(&body),
    }))
}
