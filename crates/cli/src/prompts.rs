use std::io::{self, BufRead, IsTerminal, Write};
use std::path::Path;

use anyhow::{Result, bail};

/// True if `confkit pull` may write `path`: it doesn't exist yet, `force` is
/// set, or the user answered yes on the terminal.
pub fn confirm_overwrite(path: &Path, force: bool) -> Result<bool> {
  if force || !path.exists() {
    return Ok(true);
  }

  if !io::stdin().is_terminal() || !io::stderr().is_terminal() {
    bail!(
      "{} already exists and there is no terminal to confirm on. Pass --force to replace it.",
      path.display()
    );
  }

  let mut stderr = io::stderr().lock();
  write!(stderr, "Replace {} with the instance's configuration? [y/N] ", path.display())?;
  stderr.flush()?;

  read_answer(io::stdin().lock())
}

fn read_answer(mut input: impl BufRead) -> Result<bool> {
  let mut answer = String::new();
  input.read_line(&mut answer)?;
  Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
