//! HTTP transport for [`ConfigService`].
//!
//! | Method | Path | Body |
//! |--------|------|------|
//! | GET | `/health` | [`HealthResponse`] |
//! | GET | `/v1/instances/{instance}/config` | [`Document`] |
//! | GET | `/v1/instances/{instance}/config/status?hash=&scheme=` | [`StatusResponse`] |
//! | POST | `/v1/instances/{instance}/config/apply` | [`ApplyResponse`] |
//! | GET | `/v1/instances/{instance}/config/history` | [`HistoryResponse`] |
//!
//! Everything under `/v1` requires `Authorization: Bearer <token>` with a
//! non-empty token. The token is not checked against anything. Store calls
//! are synchronous and run on the blocking pool.

use std::future::Future;
use std::io;
use std::time::Instant;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::api::{
  ApplyRequest, ApplyResponse, ErrorBody, ErrorCode, HealthResponse, HistoryResponse, StatusResponse,
};
use crate::document::Document;
use crate::hash::HashScheme;
use crate::service::{ConfigService, ServiceError};

#[derive(Clone)]
struct AppState {
  service: ConfigService,
}

/// Build the router. Exposed separately from [`serve`] for tests.
pub fn router(service: ConfigService) -> Router {
  let v1 = Router::new()
    .route("/v1/instances/{instance}/config", get(get_config))
    .route("/v1/instances/{instance}/config/status", get(get_status))
    .route("/v1/instances/{instance}/config/apply", post(apply_config))
    .route("/v1/instances/{instance}/config/history", get(get_history))
    .route_layer(middleware::from_fn(require_bearer));

  Router::new()
    .route("/health", get(health))
    .merge(v1)
    .layer(middleware::from_fn(log_request))
    .with_state(AppState { service })
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, service: ConfigService, shutdown: F) -> io::Result<()>
where
  F: Future<Output = ()> + Send + 'static,
{
  let addr = listener.local_addr()?;
  info!(addr = %addr, "listening");
  axum::serve(listener, router(service))
    .with_graceful_shutdown(shutdown)
    .await
}

/// Error response: status plus [`ErrorBody`].
#[derive(Debug)]
struct ApiError {
  status: StatusCode,
  body: ErrorBody,
}

impl ApiError {
  fn new(code: ErrorCode, message: impl Into<String>) -> Self {
    Self {
      status: status_for(code),
      body: ErrorBody::new(code, message),
    }
  }
}

impl From<ServiceError> for ApiError {
  fn from(err: ServiceError) -> Self {
    let code = err.code();
    if code == ErrorCode::Internal {
      error!(error = %err, "request failed");
    }
    let mut body = ErrorBody::new(code, err.to_string());
    if let Some(findings) = err.findings() {
      body = body.with_findings(findings.to_vec());
    }
    Self {
      status: status_for(code),
      body,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    (self.status, Json(self.body)).into_response()
  }
}

fn status_for(code: ErrorCode) -> StatusCode {
  match code {
    ErrorCode::BadRequest | ErrorCode::InvalidDocument => StatusCode::BAD_REQUEST,
    ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
    ErrorCode::NotFound => StatusCode::NOT_FOUND,
    ErrorCode::Conflict => StatusCode::CONFLICT,
    ErrorCode::ValidationFailed => StatusCode::UNPROCESSABLE_ENTITY,
    ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

/// Run a service call on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
  F: FnOnce() -> Result<T, ServiceError> + Send + 'static,
  T: Send + 'static,
{
  match tokio::task::spawn_blocking(f).await {
    Ok(result) => result.map_err(ApiError::from),
    Err(err) => {
      error!(error = %err, "blocking task failed");
      Err(ApiError::new(ErrorCode::Internal, "internal error"))
    }
  }
}

async fn require_bearer(request: Request, next: Next) -> Response {
  let authorized = request
    .headers()
    .get(header::AUTHORIZATION)
    .and_then(|value| value.to_str().ok())
    .and_then(|value| value.strip_prefix("Bearer "))
    .is_some_and(|token| !token.trim().is_empty());

  if !authorized {
    warn!(path = %request.uri().path(), "rejected request without bearer token");
    return ApiError::new(ErrorCode::Unauthorized, "missing or empty bearer token").into_response();
  }

  next.run(request).await
}

async fn log_request(request: Request, next: Next) -> Response {
  let method = request.method().clone();
  let path = request.uri().path().to_string();
  let started = Instant::now();

  let response = next.run(request).await;

  info!(
    method = %method,
    path = %path,
    status = response.status().as_u16(),
    elapsed_ms = started.elapsed().as_millis() as u64,
    "request"
  );
  response
}

async fn health() -> Json<HealthResponse> {
  Json(HealthResponse::ok())
}

async fn get_config(State(state): State<AppState>, Path(instance): Path<String>) -> Result<Json<Document>, ApiError> {
  let service = state.service;
  let document = blocking(move || service.fetch(&instance)).await?;
  Ok(Json(document))
}

#[derive(Debug, Deserialize)]
struct StatusQuery {
  hash: Option<String>,
  /// Scheme `hash` was computed with; v1 when absent.
  #[serde(default)]
  scheme: HashScheme,
}

async fn get_status(
  State(state): State<AppState>,
  Path(instance): Path<String>,
  query: Result<Query<StatusQuery>, QueryRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
  let Query(query) = query.map_err(|rejection| ApiError::new(ErrorCode::BadRequest, rejection.body_text()))?;
  let service = state.service;
  let status = blocking(move || service.status(&instance, query.hash.as_deref(), query.scheme)).await?;
  Ok(Json(status))
}

async fn apply_config(
  State(state): State<AppState>,
  Path(instance): Path<String>,
  payload: Result<Json<ApplyRequest>, JsonRejection>,
) -> Result<Json<ApplyResponse>, ApiError> {
  let Json(request) = payload.map_err(|rejection| ApiError::new(ErrorCode::BadRequest, rejection.body_text()))?;
  let service = state.service;
  let response = blocking(move || service.apply(&instance, request)).await?;
  Ok(Json(response))
}

async fn get_history(
  State(state): State<AppState>,
  Path(instance): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
  let service = state.service;
  let history = blocking(move || service.history(&instance)).await?;
  Ok(Json(history))
}
