//! Pull command implementation.
//!
//! Fetches the current document of an instance, prints it or writes it to a
//! file, and refreshes the local cache used by `diff` and `apply --dry-run`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use confkit_lib::cache::LocalCache;

use super::{api_client, instance_key, load_settings, runtime};
use crate::output::print_success;
use crate::prompts::confirm_overwrite;

pub fn cmd_pull(instance: Option<&str>, output: Option<&Path>, force: bool, config_file: Option<&Path>) -> Result<()> {
  let settings = load_settings(config_file)?;
  let key = instance_key(&settings, instance)?;

  if let Some(path) = output
    && !confirm_overwrite(path, force)?
  {
    bail!("Not overwriting {}", path.display());
  }

  let client = api_client(&settings)?;
  let rt = runtime()?;
  let document = rt
    .block_on(client.fetch(&key))
    .with_context(|| format!("Failed to pull '{}'", key))?;

  if let Err(err) = LocalCache::default_location().save(&key, &document) {
    warn!(error = %err, "failed to update local cache");
  }

  let text = document.to_pretty_string().context("Failed to serialize configuration")?;
  match output {
    Some(path) => {
      fs::write(path, format!("{}\n", text)).with_context(|| format!("Failed to write {}", path.display()))?;
      info!(instance = %key, path = %path.display(), "pulled configuration");
      print_success(&format!("Pulled '{}' into {}", key, path.display()));
    }
    None => println!("{}", text),
  }

  Ok(())
}
