//! Purpose: Provide the HTTP/JSON phonebook server for dialdex.
//! Exports: `ServeConfig`, `serve`.
//! Role: Axum-based request handler layer between transport and the book store.
//! Invariants: Every store failure funnels through `error_response`; no
//! persistence error escapes a handler unmapped.
//! Invariants: Unexpected failures are logged and surfaced generically; the
//! error envelope never carries internal detail.
//! Invariants: Unmatched routes return the fixed unknown-endpoint envelope.

use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Json, Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use tokio::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::api::{BookRef, ContactFields, Error, ErrorKind, LocalClient, PersonId};

#[derive(Clone, Debug)]
pub struct ServeConfig {
    pub bind: SocketAddr,
    pub data_dir: Option<PathBuf>,
    pub book: String,
    pub max_body_bytes: u64,
}

struct AppState {
    client: LocalClient,
    book: BookRef,
}

pub async fn serve(config: ServeConfig) -> Result<(), Error> {
    validate_config(&config)?;

    init_tracing();

    let max_body_bytes: usize = config
        .max_body_bytes
        .try_into()
        .map_err(|_| Error::new(ErrorKind::Usage).with_message("--max-body-bytes is too large"))?;

    let mut client = LocalClient::new();
    if let Some(data_dir) = config.data_dir {
        client = client.with_data_dir(data_dir);
    }
    let state = Arc::new(AppState {
        client,
        book: BookRef::name(config.book),
    });

    let app = Router::new()
        .route("/health", get(health))
        .route("/info", get(info))
        .route("/api/persons", get(list_persons).post(create_person))
        .route(
            "/api/persons/:id",
            get(get_person).put(update_person).delete(delete_person),
        )
        .fallback(unknown_endpoint)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to bind server")
                .with_source(err)
        })?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            result.map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("server failed")
                    .with_source(err)
            })?;
        }
        _ = shutdown_signal() => {
            let _ = shutdown_tx.send(());
            match tokio::time::timeout(Duration::from_secs(10), &mut server).await {
                Ok(result) => result.map_err(|err| {
                    Error::new(ErrorKind::Io)
                        .with_message("server failed")
                        .with_source(err)
                })?,
                Err(_) => {
                    return Err(Error::new(ErrorKind::Io).with_message("server shutdown timed out"));
                }
            }
        }
    };
    Ok(())
}

fn validate_config(config: &ServeConfig) -> Result<(), Error> {
    if config.book.contains('/') {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("book name must not contain path separators")
            .with_hint("Use a plain book name like `home`."));
    }

    if config.max_body_bytes == 0 {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("--max-body-bytes must be greater than zero")
            .with_hint("Use a positive value like 65536."));
    }

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        let mut signal = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler");
        signal.recv().await;
    };
    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    #[cfg(not(unix))]
    ctrl_c.await;
}

#[derive(Debug, Deserialize)]
struct ContactPayload {
    name: Option<String>,
    number: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

async fn list_persons(State(state): State<Arc<AppState>>) -> Response {
    match state.client.list_persons(&state.book) {
        Ok(persons) => json_response(json!({ "persons": persons })),
        Err(err) => error_response(err),
    }
}

async fn get_person(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
) -> Response {
    let id = match PersonId::parse(&id) {
        Ok(id) => id,
        Err(err) => return error_response(err),
    };
    match state.client.get_person(&state.book, &id) {
        Ok(person) => json_response(json!({ "person": person })),
        Err(err) => error_response(err),
    }
}

async fn create_person(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ContactPayload>, JsonRejection>,
) -> Response {
    let fields = match contact_fields(payload) {
        Ok(fields) => fields,
        Err(err) => return error_response(err),
    };
    match state.client.create_person(&state.book, fields) {
        Ok(person) => {
            (StatusCode::CREATED, axum::Json(json!({ "person": person }))).into_response()
        }
        Err(err) => error_response(err),
    }
}

async fn update_person(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
    payload: Result<Json<ContactPayload>, JsonRejection>,
) -> Response {
    let id = match PersonId::parse(&id) {
        Ok(id) => id,
        Err(err) => return error_response(err),
    };
    let fields = match contact_fields(payload) {
        Ok(fields) => fields,
        Err(err) => return error_response(err),
    };
    match state.client.update_person(&state.book, &id, fields) {
        Ok(person) => json_response(json!({ "person": person })),
        Err(err) => error_response(err),
    }
}

async fn delete_person(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
) -> Response {
    let id = match PersonId::parse(&id) {
        Ok(id) => id,
        Err(err) => return error_response(err),
    };
    match state.client.delete_person(&state.book, &id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

async fn info(State(state): State<Arc<AppState>>) -> Response {
    let count = match state.client.count_persons(&state.book) {
        Ok(count) => count,
        Err(err) => return error_response(err),
    };
    let now = match rfc3339_now() {
        Ok(now) => now,
        Err(err) => return error_response(err),
    };
    let body = format!("Phonebook has info for {count} people\n{now}\n");
    (StatusCode::OK, body).into_response()
}

async fn health(State(state): State<Arc<AppState>>) -> Response {
    match state.client.store_state(&state.book) {
        Ok(store) => json_response(json!({
            "status": "ok",
            "store": {
                "path": store.path.display().to_string(),
                "state": if store.ready { "ready" } else { "error" },
            },
        })),
        Err(err) => error_response(err),
    }
}

async fn unknown_endpoint() -> Response {
    let body = ErrorEnvelope {
        error: ErrorBody {
            kind: format!("{:?}", ErrorKind::NotFound),
            message: "unknown endpoint".to_string(),
            hint: None,
        },
    };
    (StatusCode::NOT_FOUND, axum::Json(body)).into_response()
}

/// Required-field validation for create and update. Missing or empty values
/// are a usage error before the store ever sees the request; the store
/// re-checks the entity constraints on save.
fn contact_fields(
    payload: Result<Json<ContactPayload>, JsonRejection>,
) -> Result<ContactFields, Error> {
    let Json(payload) = payload.map_err(|rejection| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid request body")
            .with_hint(rejection.body_text())
    })?;
    match (payload.name, payload.number) {
        (Some(name), Some(number)) if !name.is_empty() && !number.is_empty() => {
            Ok(ContactFields::new(name, number))
        }
        _ => Err(Error::new(ErrorKind::Usage).with_message("name and number are required")),
    }
}

fn rfc3339_now() -> Result<String, Error> {
    time::OffsetDateTime::now_utc().format(&Rfc3339).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to format timestamp")
            .with_source(err)
    })
}

fn json_response(payload: serde_json::Value) -> Response {
    axum::Json(payload).into_response()
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Usage | ErrorKind::Invalid => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::AlreadyExists => StatusCode::CONFLICT,
        ErrorKind::Busy => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Corrupt | ErrorKind::Io | ErrorKind::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(err: Error) -> Response {
    let status = status_for(err.kind());
    let body = if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
        ErrorBody {
            kind: format!("{:?}", ErrorKind::Internal),
            message: "internal error".to_string(),
            hint: None,
        }
    } else {
        ErrorBody {
            kind: format!("{:?}", err.kind()),
            message: err.message().unwrap_or("error").to_string(),
            hint: err.hint().map(str::to_string),
        }
    };
    (status, axum::Json(ErrorEnvelope { error: body })).into_response()
}
