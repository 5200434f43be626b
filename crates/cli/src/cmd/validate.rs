//! Validate command implementation.
//!
//! Parses a configuration file and runs every validation rule locally.
//! Exits non-zero if any finding is an error.

use std::path::Path;

use anyhow::{Result, bail};
use serde::Serialize;

use confkit_lib::validate::{Finding, FindingCounts, validate};

use super::load_file;
use crate::output::{OutputFormat, print_findings, print_json, print_success, print_warning};

#[derive(Debug, Serialize)]
struct ValidateOutput<'a> {
  file: String,
  valid: bool,
  counts: FindingCounts,
  findings: &'a [Finding],
}

pub fn cmd_validate(file: &Path, output: OutputFormat) -> Result<()> {
  let document = load_file(file)?;
  let findings = validate(&document);
  let counts = FindingCounts::of(&findings);

  if output.is_json() {
    print_json(&ValidateOutput {
      file: file.display().to_string(),
      valid: counts.errors == 0,
      counts,
      findings: &findings,
    })?;
  } else if findings.is_empty() {
    print_success(&format!("{} is valid", file.display()));
  } else {
    println!("{}:", file.display());
    print_findings(&findings);
    println!();
    if counts.errors == 0 {
      print_warning(&format!(
        "{} warning(s), {} info; nothing blocks an apply",
        counts.warnings, counts.info
      ));
    }
  }

  if counts.errors > 0 {
    bail!(
      "{} has {} validation error(s), {} warning(s)",
      file.display(),
      counts.errors,
      counts.warnings
    );
  }

  Ok(())
}
