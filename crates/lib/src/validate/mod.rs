//! Validation of configuration documents.
//!
//! [`validate`] runs a fixed set of rules and returns leveled findings in
//! rule order: version, authentication, organizations, redirects. It reads
//! the document only; it never mutates it and never performs I/O.
//!
//! Only [`Level::Error`] blocks an apply. Warnings and info are surfaced to
//! the caller and never stop anything.

mod rules;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::document::view::ConfigView;

/// Severity of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
  Error,
  Warning,
  Info,
}

impl fmt::Display for Level {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Level::Error => f.write_str("error"),
      Level::Warning => f.write_str("warning"),
      Level::Info => f.write_str("info"),
    }
  }
}

/// One validation result about a specific path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
  pub path: String,
  pub level: Level,
  pub message: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub suggestion: Option<String>,
}

impl Finding {
  pub fn new(path: impl Into<String>, level: Level, message: impl Into<String>) -> Self {
    Self {
      path: path.into(),
      level,
      message: message.into(),
      suggestion: None,
    }
  }

  pub fn error(path: impl Into<String>, message: impl Into<String>) -> Self {
    Self::new(path, Level::Error, message)
  }

  pub fn warning(path: impl Into<String>, message: impl Into<String>) -> Self {
    Self::new(path, Level::Warning, message)
  }

  pub fn info(path: impl Into<String>, message: impl Into<String>) -> Self {
    Self::new(path, Level::Info, message)
  }

  pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
    self.suggestion = Some(suggestion.into());
    self
  }

  pub fn is_error(&self) -> bool {
    self.level == Level::Error
  }
}

impl fmt::Display for Finding {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} at {}: {}", self.level, self.path, self.message)
  }
}

/// Run every rule against `doc`.
pub fn validate(doc: &Document) -> Vec<Finding> {
  let view = ConfigView::new(doc);
  let mut findings = Vec::new();

  rules::check_version(&view, &mut findings);
  rules::check_authentication(&view.authentication, &mut findings);
  rules::check_organizations(&view.organizations, &mut findings);
  rules::check_redirects(&view.redirects, &mut findings);

  findings
}

/// True if any finding blocks an apply.
pub fn has_errors(findings: &[Finding]) -> bool {
  findings.iter().any(|f| f.level == Level::Error)
}

pub fn has_warnings(findings: &[Finding]) -> bool {
  findings.iter().any(|f| f.level == Level::Warning)
}

/// Number of findings per level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FindingCounts {
  pub errors: usize,
  pub warnings: usize,
  pub info: usize,
}

impl FindingCounts {
  pub fn of(findings: &[Finding]) -> Self {
    findings.iter().fold(Self::default(), |mut counts, finding| {
      match finding.level {
        Level::Error => counts.errors += 1,
        Level::Warning => counts.warnings += 1,
        Level::Info => counts.info += 1,
      }
      counts
    })
  }
}
