//! Status command implementation.
//!
//! Shows the current hash and provenance of an instance. Given a local file,
//! also reports whether it differs from what the instance runs.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use owo_colors::{OwoColorize, Stream};

use confkit_lib::hash::compute_hash;

use super::{api_client, instance_key, load_file, load_settings, runtime};
use crate::output::{OutputFormat, format_age, print_info, print_json, print_stat, print_warning, truncate_hash};

pub fn cmd_status(
  file: Option<&Path>,
  instance: Option<&str>,
  config_file: Option<&Path>,
  verbose: bool,
  output: OutputFormat,
) -> Result<()> {
  let settings = load_settings(config_file)?;
  let key = instance_key(&settings, instance)?;
  let local_hash = file.map(load_file).transpose()?.map(|doc| compute_hash(&doc));

  let client = api_client(&settings)?;
  let rt = runtime()?;
  let status = rt
    .block_on(client.status(&key, local_hash.as_ref()))
    .with_context(|| format!("Failed to get status of '{}'", key))?;

  if output.is_json() {
    return print_json(&status);
  }

  println!(
    "{}",
    format!("Instance '{}'", key).if_supports_color(Stream::Stdout, |s| s.bold())
  );
  print_stat("Hash", truncate_hash(status.hash.as_str()));
  print_stat(
    "Last modified",
    &format!(
      "{} by {} via {}",
      format_age(status.last_modified, Utc::now()),
      status.last_modified_by,
      status.last_modified_source
    ),
  );

  if let (Some(path), Some(local)) = (file, &local_hash) {
    print_stat("Local", &format!("{} ({})", truncate_hash(local.as_str()), path.display()));
    if status.has_changes {
      print_warning(&format!("{} differs from what '{}' runs", path.display(), key));
    } else {
      print_info(&format!("{} matches what '{}' runs", path.display(), key));
    }
  }

  if verbose {
    println!();
    let text = status
      .document
      .to_pretty_string()
      .context("Failed to serialize configuration")?;
    println!("{}", text);
  }

  Ok(())
}
