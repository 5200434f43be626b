//! HTTP client for the confkit service.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::api::{ApplyRequest, ApplyResponse, ErrorBody, ErrorCode, HealthResponse, HistoryResponse, StatusResponse};
use crate::consts::APP_NAME;
use crate::document::Document;
use crate::hash::{ConfigHash, HashScheme};
use crate::store::InstanceKey;
use crate::validate::Finding;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ClientError {
  #[error("invalid API URL '{url}': {source}")]
  InvalidUrl {
    url: String,
    #[source]
    source: url::ParseError,
  },

  #[error("no API key configured (set CONFKIT_API_KEY or api.key in config.toml)")]
  MissingApiKey,

  #[error("request failed: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("unauthorized: {message}")]
  Unauthorized { message: String },

  #[error("not found: {message}")]
  NotFound { message: String },

  #[error("conflict: {message}")]
  Conflict { message: String },

  #[error("{message}")]
  Validation { message: String, findings: Vec<Finding> },

  #[error("bad request ({code}): {message}")]
  BadRequest { code: ErrorCode, message: String },

  #[error("server error (HTTP {status}): {message}")]
  Server { status: u16, message: String },
}

impl ClientError {
  /// Findings returned with a validation rejection.
  pub fn findings(&self) -> &[Finding] {
    match self {
      ClientError::Validation { findings, .. } => findings,
      _ => &[],
    }
  }
}

/// Client for one service endpoint, authenticated with a bearer token.
#[derive(Debug, Clone)]
pub struct ApiClient {
  http: Client,
  base: Url,
  api_key: String,
}

impl ApiClient {
  pub fn new(base_url: &str, api_key: &str) -> Result<Self, ClientError> {
    if api_key.trim().is_empty() {
      return Err(ClientError::MissingApiKey);
    }

    let mut base = Url::parse(base_url).map_err(|source| ClientError::InvalidUrl {
      url: base_url.to_string(),
      source,
    })?;
    if !base.path().ends_with('/') {
      let path = format!("{}/", base.path());
      base.set_path(&path);
    }

    let http = Client::builder()
      .timeout(REQUEST_TIMEOUT)
      .user_agent(format!("{}/{}", APP_NAME, env!("CARGO_PKG_VERSION")))
      .build()?;

    Ok(Self {
      http,
      base,
      api_key: api_key.to_string(),
    })
  }

  pub fn base_url(&self) -> &Url {
    &self.base
  }

  fn url(&self, path: &str) -> Result<Url, ClientError> {
    self.base.join(path).map_err(|source| ClientError::InvalidUrl {
      url: format!("{}{}", self.base, path),
      source,
    })
  }

  fn config_url(&self, instance: &InstanceKey, suffix: &str) -> Result<Url, ClientError> {
    self.url(&format!("v1/instances/{}/config{}", instance, suffix))
  }

  fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
    builder.bearer_auth(&self.api_key)
  }

  pub async fn health(&self) -> Result<HealthResponse, ClientError> {
    let response = self.http.get(self.url("health")?).send().await?;
    decode(response).await
  }

  /// Current document of `instance`.
  pub async fn fetch(&self, instance: &InstanceKey) -> Result<Document, ClientError> {
    let url = self.config_url(instance, "")?;
    debug!(url = %url, "fetching configuration");
    let response = self.authorized(self.http.get(url)).send().await?;
    decode(response).await
  }

  /// Status of `instance`, reporting drift against `local_hash` if given.
  /// The hash is sent with the default scheme.
  pub async fn status(
    &self,
    instance: &InstanceKey,
    local_hash: Option<&ConfigHash>,
  ) -> Result<StatusResponse, ClientError> {
    let mut url = self.config_url(instance, "/status")?;
    if let Some(hash) = local_hash {
      url
        .query_pairs_mut()
        .append_pair("hash", hash.as_str())
        .append_pair("scheme", &HashScheme::default().to_string());
    }
    debug!(url = %url, "fetching status");
    let response = self.authorized(self.http.get(url)).send().await?;
    decode(response).await
  }

  pub async fn apply(&self, instance: &InstanceKey, request: &ApplyRequest) -> Result<ApplyResponse, ClientError> {
    let url = self.config_url(instance, "/apply")?;
    debug!(url = %url, "applying configuration");
    let response = self.authorized(self.http.post(url)).json(request).send().await?;
    decode(response).await
  }

  pub async fn history(&self, instance: &InstanceKey) -> Result<HistoryResponse, ClientError> {
    let url = self.config_url(instance, "/history")?;
    let response = self.authorized(self.http.get(url)).send().await?;
    decode(response).await
  }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
  let status = response.status();
  if status.is_success() {
    return Ok(response.json::<T>().await?);
  }

  let text = response.text().await?;
  let body: Option<ErrorBody> = serde_json::from_str(&text).ok();
  Err(error_from(status, body, text))
}

fn error_from(status: StatusCode, body: Option<ErrorBody>, text: String) -> ClientError {
  let (code, message, findings) = match body {
    Some(body) => (Some(body.error.code), body.error.message, body.findings.unwrap_or_default()),
    None if text.is_empty() => (None, status.to_string(), Vec::new()),
    None => (None, text, Vec::new()),
  };

  match status {
    StatusCode::UNAUTHORIZED => ClientError::Unauthorized { message },
    StatusCode::NOT_FOUND => ClientError::NotFound { message },
    StatusCode::CONFLICT => ClientError::Conflict { message },
    StatusCode::UNPROCESSABLE_ENTITY => ClientError::Validation { message, findings },
    StatusCode::BAD_REQUEST => ClientError::BadRequest {
      code: code.unwrap_or(ErrorCode::BadRequest),
      message,
    },
    other => ClientError::Server {
      status: other.as_u16(),
      message,
    },
  }
}
