//! Diff command implementation.
//!
//! Compares a configuration file against another file, or against the copy
//! cached by the last `pull` or `apply` of an instance. This diff is
//! advisory: the server diffs against its own state when applying.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::json;

use confkit_lib::cache::LocalCache;
use confkit_lib::diff::compute_changes;

use super::{instance_key, load_file, load_settings};
use crate::output::{OutputFormat, change_counts, print_changes, print_info, print_json};

pub fn cmd_diff(
  file: &Path,
  against: Option<&Path>,
  instance: Option<&str>,
  config_file: Option<&Path>,
  output: OutputFormat,
) -> Result<()> {
  let next = load_file(file)?;

  let (previous, base) = match against {
    Some(other) => (Some(load_file(other)?), other.display().to_string()),
    None => {
      let settings = load_settings(config_file)?;
      let key = instance_key(&settings, instance)?;
      let cached = LocalCache::default_location()
        .load(&key)
        .context("Failed to read local cache")?;
      (cached, format!("cached copy of '{}'", key))
    }
  };

  let changes = compute_changes(previous.as_ref(), &next);

  if output.is_json() {
    print_json(&json!({ "file": file.display().to_string(), "against": base, "changes": changes }))?;
    return Ok(());
  }

  if previous.is_none() {
    print_info(&format!("No {}; run 'confkit pull' first to diff against the server state", base));
  }
  println!("{} vs {}: {}", file.display(), base, change_counts(&changes));
  print_changes(&changes);

  Ok(())
}
