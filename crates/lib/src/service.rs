//! The apply protocol on top of a [`ConfigStore`].
//!
//! The service owns request-shape checks: everything a caller can get wrong
//! about the envelope of a request is rejected here, before the store sees
//! it. Validation, hashing and diffing happen inside the store's revision
//! step.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{AppliedMetadata, ApplyRequest, ApplyResponse, ErrorCode, HistoryResponse, StatusResponse};
use crate::document::{Document, DocumentError};
use crate::hash::{ConfigHash, HashScheme, compute_hash_with};
use crate::store::{ConfigStore, InstanceKey, PutRequest, Source, StoreError};
use crate::validate::{Finding, FindingCounts};

/// Actor recorded when an apply does not name one.
const UNKNOWN_ACTOR: &str = "unknown";

#[derive(Debug, Error)]
pub enum ServiceError {
  #[error("{0}")]
  BadRequest(String),

  #[error("invalid document: {0}")]
  InvalidDocument(#[from] DocumentError),

  #[error("no configuration found for instance '{instance}'")]
  NotFound { instance: String },

  #[error("configuration rejected with {} validation error(s)", FindingCounts::of(.findings).errors)]
  Validation { findings: Vec<Finding> },

  #[error("{0}")]
  Conflict(String),

  #[error(transparent)]
  Store(StoreError),
}

impl From<StoreError> for ServiceError {
  fn from(err: StoreError) -> Self {
    match err {
      StoreError::Rejected { findings } => ServiceError::Validation { findings },
      conflict @ StoreError::Conflict { .. } => ServiceError::Conflict(conflict.to_string()),
      other => ServiceError::Store(other),
    }
  }
}

impl ServiceError {
  pub fn code(&self) -> ErrorCode {
    match self {
      ServiceError::BadRequest(_) => ErrorCode::BadRequest,
      ServiceError::InvalidDocument(_) => ErrorCode::InvalidDocument,
      ServiceError::NotFound { .. } => ErrorCode::NotFound,
      ServiceError::Validation { .. } => ErrorCode::ValidationFailed,
      ServiceError::Conflict(_) => ErrorCode::Conflict,
      ServiceError::Store(_) => ErrorCode::Internal,
    }
  }

  pub fn findings(&self) -> Option<&[Finding]> {
    match self {
      ServiceError::Validation { findings } => Some(findings),
      _ => None,
    }
  }
}

/// Fetch, status, apply and history over an injected store.
#[derive(Clone)]
pub struct ConfigService {
  store: Arc<dyn ConfigStore>,
}

impl ConfigService {
  pub fn new(store: Arc<dyn ConfigStore>) -> Self {
    Self { store }
  }

  /// Current document of `instance`.
  pub fn fetch(&self, instance: &str) -> Result<Document, ServiceError> {
    let key = parse_instance(instance)?;
    let stored = self.store.get(&key)?.ok_or_else(|| not_found(&key))?;
    Ok(stored.document)
  }

  /// Current hash and provenance of `instance`, with drift against
  /// `local_hash` when one is given. `local_scheme` is the scheme the caller
  /// hashed with, which need not be the store's.
  pub fn status(
    &self,
    instance: &str,
    local_hash: Option<&str>,
    local_scheme: HashScheme,
  ) -> Result<StatusResponse, ServiceError> {
    let key = parse_instance(instance)?;
    let local = local_hash.map(parse_hash).transpose()?;
    let stored = self.store.get(&key)?.ok_or_else(|| not_found(&key))?;

    let status = StatusResponse::from_stored(stored, local.as_ref().map(|hash| (hash, local_scheme)));
    debug!(instance = %key, hash = %status.hash, has_changes = status.has_changes, "status");
    Ok(status)
  }

  /// Check the request envelope, then store a new revision.
  pub fn apply(&self, instance: &str, request: ApplyRequest) -> Result<ApplyResponse, ServiceError> {
    let key = parse_instance(instance)?;
    let ApplyRequest { document, metadata } = request;
    let document = document.ok_or_else(|| ServiceError::BadRequest("request is missing 'document'".to_string()))?;
    let metadata = metadata.ok_or_else(|| ServiceError::BadRequest("request is missing 'metadata'".to_string()))?;
    let document = Document::from_value(document)?;

    let claimed = metadata
      .hash
      .as_deref()
      .ok_or_else(|| ServiceError::BadRequest("request is missing 'metadata.hash'".to_string()))
      .and_then(parse_hash)?;
    let scheme = metadata.hash_scheme.unwrap_or_default();
    let actual = compute_hash_with(&document, scheme);
    if claimed != actual {
      warn!(instance = %key, claimed = %claimed, actual = %actual, "hash mismatch in apply request");
      return Err(ServiceError::BadRequest(format!(
        "metadata.hash {} does not match document content ({})",
        claimed, actual
      )));
    }

    let expected_hash = metadata.expected_hash.as_deref().map(parse_hash).transpose()?;
    let actor = metadata
      .applied_by
      .filter(|actor| !actor.is_empty())
      .unwrap_or_else(|| UNKNOWN_ACTOR.to_string());
    let source = metadata.source.unwrap_or(Source::Api);

    info!(
      instance = %key,
      actor = %actor,
      source = %source,
      client_version = metadata.version.as_deref().unwrap_or("-"),
      "applying configuration"
    );

    let outcome = self.store.put(
      &key,
      PutRequest {
        document,
        actor,
        source,
        expected_hash,
        expected_scheme: scheme,
      },
    )?;

    Ok(ApplyResponse {
      success: true,
      metadata: AppliedMetadata {
        hash: outcome.revision.hash.clone(),
        applied_at: outcome.revision.last_modified,
        validation_findings: outcome.findings,
        change_summary: outcome.changes,
      },
      document: outcome.revision.document,
    })
  }

  /// Every applied revision of `instance`, oldest first.
  pub fn history(&self, instance: &str) -> Result<HistoryResponse, ServiceError> {
    let key = parse_instance(instance)?;
    let stored = self.store.get(&key)?.ok_or_else(|| not_found(&key))?;
    Ok(HistoryResponse {
      instance: key,
      entries: stored.history,
    })
  }
}

fn parse_instance(instance: &str) -> Result<InstanceKey, ServiceError> {
  InstanceKey::parse(instance).map_err(|e| ServiceError::BadRequest(e.to_string()))
}

fn parse_hash(value: &str) -> Result<ConfigHash, ServiceError> {
  ConfigHash::parse(value).map_err(|e| ServiceError::BadRequest(e.to_string()))
}

fn not_found(key: &InstanceKey) -> ServiceError {
  ServiceError::NotFound {
    instance: key.to_string(),
  }
}
