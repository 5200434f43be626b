//! Implementation of the `confkit apply` command.
//!
//! Validates locally first: a document with error findings never leaves the
//! machine. Otherwise the document is hashed and sent to the service, which
//! validates again, diffs against its current revision and stores the new
//! one. The returned document replaces the local cache.

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde_json::json;
use tracing::{info, warn};

use confkit_lib::api::ApplyRequest;
use confkit_lib::cache::LocalCache;
use confkit_lib::client::ClientError;
use confkit_lib::diff::compute_changes;
use confkit_lib::hash::{ConfigHash, compute_hash};
use confkit_lib::store::Source;
use confkit_lib::validate::{FindingCounts, has_errors, validate};

use super::{api_client, instance_key, load_file, load_settings, runtime};
use crate::output::{
  OutputFormat, change_counts, print_changes, print_findings, print_info, print_json, print_stat, print_success,
  print_warning,
};

pub fn cmd_apply(
  file: &Path,
  instance: Option<&str>,
  dry_run: bool,
  expected_hash: Option<&str>,
  config_file: Option<&Path>,
  output: OutputFormat,
) -> Result<()> {
  let document = load_file(file)?;
  let findings = validate(&document);

  if has_errors(&findings) {
    let counts = FindingCounts::of(&findings);
    if output.is_json() {
      print_json(&json!({ "success": false, "findings": findings }))?;
    } else {
      println!("{}:", file.display());
      print_findings(&findings);
    }
    bail!("Not applying: {} validation error(s)", counts.errors);
  }

  let settings = load_settings(config_file)?;
  let key = instance_key(&settings, instance)?;
  let expected = expected_hash
    .map(ConfigHash::parse)
    .transpose()
    .context("Invalid --expected-hash")?;
  let cache = LocalCache::default_location();

  if dry_run {
    let cached = cache.load(&key).context("Failed to read local cache")?;
    let changes = compute_changes(cached.as_ref(), &document);
    let hash = compute_hash(&document);

    if output.is_json() {
      print_json(&json!({ "dryRun": true, "hash": hash, "findings": findings, "changeSummary": changes }))?;
    } else {
      print_findings(&findings);
      print_info(&format!("Dry run for '{}' (against local cache): {}", key, change_counts(&changes)));
      print_changes(&changes);
      print_stat("Hash", hash.as_str());
    }
    return Ok(());
  }

  let client = api_client(&settings)?;
  let mut request = ApplyRequest::new(&document, settings.actor(), Source::Cli);
  if let Some(expected) = &expected {
    request = request.with_expected_hash(expected);
  }

  info!(instance = %key, url = %client.base_url(), "applying configuration");
  let rt = runtime()?;
  let response = match rt.block_on(client.apply(&key, &request)) {
    Ok(response) => response,
    Err(err @ ClientError::Validation { .. }) => {
      if !output.is_json() {
        print_findings(err.findings());
      }
      return Err(err).context("Service rejected the configuration");
    }
    Err(err) => return Err(err).with_context(|| format!("Failed to apply to '{}'", key)),
  };

  if let Err(err) = cache.save(&key, &response.document) {
    warn!(error = %err, "failed to update local cache");
  }

  if output.is_json() {
    return print_json(&response);
  }

  let metadata = &response.metadata;
  if !metadata.validation_findings.is_empty() {
    print_findings(&metadata.validation_findings);
    let counts = FindingCounts::of(&metadata.validation_findings);
    print_warning(&format!("{} warning(s), {} info", counts.warnings, counts.info));
  }
  print_success(&format!("Applied to '{}': {}", key, change_counts(&metadata.change_summary)));
  print_changes(&metadata.change_summary);
  print_stat("Hash", metadata.hash.as_str());

  Ok(())
}
