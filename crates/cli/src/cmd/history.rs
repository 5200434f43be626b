use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use owo_colors::{OwoColorize, Stream};

use super::{api_client, instance_key, load_settings, runtime};
use crate::output::{OutputFormat, format_age, print_info, print_json, truncate_hash};

/// List applied revisions of an instance, newest first.
pub fn cmd_history(instance: Option<&str>, config_file: Option<&Path>, output: OutputFormat) -> Result<()> {
  let settings = load_settings(config_file)?;
  let key = instance_key(&settings, instance)?;

  let client = api_client(&settings)?;
  let rt = runtime()?;
  let history = rt
    .block_on(client.history(&key))
    .with_context(|| format!("Failed to get history of '{}'", key))?;

  if output.is_json() {
    return print_json(&history);
  }

  if history.entries.is_empty() {
    print_info(&format!("No revisions applied to '{}'", key));
    return Ok(());
  }

  let now = Utc::now();
  println!(
    "{}",
    format!("{} revision(s) of '{}'", history.entries.len(), key).if_supports_color(Stream::Stdout, |s| s.bold())
  );
  for entry in history.entries.iter().rev() {
    println!(
      "  {}  {:<16} {:<12} {}",
      truncate_hash(entry.hash.as_str()).if_supports_color(Stream::Stdout, |s| s.cyan()),
      entry.actor,
      entry.source.to_string(),
      format_age(entry.timestamp, now).if_supports_color(Stream::Stdout, |s| s.dimmed())
    );
  }

  Ok(())
}
