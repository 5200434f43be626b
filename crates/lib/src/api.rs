//! JSON wire types shared by the server and the client.
//!
//! Every type serializes camelCase. Request types are lenient (all fields
//! optional) so that shape problems surface as `BAD_REQUEST` from the
//! service instead of as deserialization failures.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::diff::ChangeSummary;
use crate::document::Document;
use crate::hash::{ConfigHash, HashScheme, compute_hash_with};
use crate::store::{HistoryEntry, InstanceKey, Source, StoredConfig};
use crate::validate::Finding;

/// Body of `POST /v1/instances/{instance}/config/apply`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub document: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub metadata: Option<ApplyMetadata>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyMetadata {
  /// Hash of `document` as computed by the sender.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub hash: Option<String>,
  /// Scheme the sender hashed with. Absent means v1.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub hash_scheme: Option<HashScheme>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub applied_at: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub applied_by: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source: Option<Source>,
  /// Version of the sending tool.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub version: Option<String>,
  /// Only apply if the current hash equals this one.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub expected_hash: Option<String>,
}

impl ApplyRequest {
  /// Build a complete request for `document`, hashing it with v1.
  pub fn new(document: &Document, applied_by: impl Into<String>, source: Source) -> Self {
    let scheme = HashScheme::V1;
    Self {
      document: Some(document.to_value()),
      metadata: Some(ApplyMetadata {
        hash: Some(compute_hash_with(document, scheme).to_string()),
        hash_scheme: Some(scheme),
        applied_at: Some(Utc::now()),
        applied_by: Some(applied_by.into()),
        source: Some(source),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
        expected_hash: None,
      }),
    }
  }

  pub fn with_expected_hash(mut self, hash: &ConfigHash) -> Self {
    if let Some(metadata) = self.metadata.as_mut() {
      metadata.expected_hash = Some(hash.to_string());
    }
    self
  }
}

/// Body returned by a successful apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResponse {
  pub success: bool,
  pub document: Document,
  pub metadata: AppliedMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedMetadata {
  pub hash: ConfigHash,
  pub applied_at: DateTime<Utc>,
  pub validation_findings: Vec<Finding>,
  pub change_summary: ChangeSummary,
}

/// Body of `GET /v1/instances/{instance}/config/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
  pub hash: ConfigHash,
  pub last_modified: DateTime<Utc>,
  pub last_modified_by: String,
  pub last_modified_source: Source,
  /// True when the caller's hash was given and differs from the current
  /// document hashed under the caller's scheme.
  pub has_changes: bool,
  pub document: Document,
}

impl StatusResponse {
  pub fn from_stored(stored: StoredConfig, local: Option<(&ConfigHash, HashScheme)>) -> Self {
    let has_changes = local.is_some_and(|(hash, scheme)| *hash != compute_hash_with(&stored.document, scheme));
    Self {
      hash: stored.hash,
      last_modified: stored.last_modified,
      last_modified_by: stored.last_modified_by,
      last_modified_source: stored.last_modified_source,
      has_changes,
      document: stored.document,
    }
  }
}

/// Body of `GET /v1/instances/{instance}/config/history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
  pub instance: InstanceKey,
  pub entries: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
  pub status: String,
}

impl HealthResponse {
  pub fn ok() -> Self {
    Self {
      status: "ok".to_string(),
    }
  }
}

/// Machine-readable error code carried in [`ErrorBody`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
  BadRequest,
  InvalidDocument,
  Unauthorized,
  NotFound,
  Conflict,
  ValidationFailed,
  Internal,
}

impl fmt::Display for ErrorCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let code = match self {
      ErrorCode::BadRequest => "BAD_REQUEST",
      ErrorCode::InvalidDocument => "INVALID_DOCUMENT",
      ErrorCode::Unauthorized => "UNAUTHORIZED",
      ErrorCode::NotFound => "NOT_FOUND",
      ErrorCode::Conflict => "CONFLICT",
      ErrorCode::ValidationFailed => "VALIDATION_FAILED",
      ErrorCode::Internal => "INTERNAL",
    };
    f.write_str(code)
  }
}

/// Error body returned with every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
  pub error: ErrorDetail,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub findings: Option<Vec<Finding>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
  pub code: ErrorCode,
  pub message: String,
}

impl ErrorBody {
  pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
    Self {
      error: ErrorDetail {
        code,
        message: message.into(),
      },
      findings: None,
    }
  }

  pub fn with_findings(mut self, findings: Vec<Finding>) -> Self {
    self.findings = Some(findings);
    self
  }
}
