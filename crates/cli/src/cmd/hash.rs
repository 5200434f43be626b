use std::path::Path;

use anyhow::Result;
use tracing::debug;

use confkit_lib::hash::{HashScheme, compute_hash_with};

use super::load_file;

pub fn cmd_hash(file: &Path, scheme: HashScheme) -> Result<()> {
  let document = load_file(file)?;
  let hash = compute_hash_with(&document, scheme);
  debug!(file = %file.display(), scheme = %scheme, "hashed document");
  println!("{}", hash);
  Ok(())
}
