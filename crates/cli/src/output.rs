//! CLI output formatting utilities.
//!
//! Provides consistent formatting for terminal output: colored status
//! messages, validation findings, change summaries and relative times.
//! Rendering never feeds back into what a command decides.

use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

use confkit_lib::consts::HASH_PREFIX;
use confkit_lib::diff::ChangeSummary;
use confkit_lib::validate::{Finding, Level};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
  pub const ADD: &str = "+";
  pub const MODIFY: &str = "~";
  pub const REMOVE: &str = "-";
}

/// First 12 hex characters of a `sha256:` hash.
pub fn truncate_hash(hash: &str) -> &str {
  let hex = hash.strip_prefix(HASH_PREFIX).unwrap_or(hash);
  let len = hex.len().min(12);
  &hex[..len]
}

/// "3m 12s ago" style age of `time`, rounded to whole seconds.
pub fn format_age(time: DateTime<Utc>, now: DateTime<Utc>) -> String {
  let elapsed = (now - time).to_std().unwrap_or(Duration::ZERO);
  let rounded = Duration::from_secs(elapsed.as_secs());
  if rounded.is_zero() {
    return "just now".to_string();
  }
  format!("{} ago", humantime::format_duration(rounded))
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}

/// One line per finding, suggestion indented underneath.
pub fn print_findings(findings: &[Finding]) {
  for finding in findings {
    let symbol = match finding.level {
      Level::Error => format!("{}", symbols::ERROR.if_supports_color(Stream::Stdout, |s| s.red())),
      Level::Warning => format!("{}", symbols::WARNING.if_supports_color(Stream::Stdout, |s| s.yellow())),
      Level::Info => format!("{}", symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue())),
    };
    println!(
      "  {} {} {}",
      symbol,
      finding.path.if_supports_color(Stream::Stdout, |s| s.bold()),
      finding.message
    );
    if let Some(suggestion) = &finding.suggestion {
      println!(
        "      {} {}",
        symbols::ARROW.if_supports_color(Stream::Stdout, |s| s.dimmed()),
        suggestion.if_supports_color(Stream::Stdout, |s| s.dimmed())
      );
    }
  }
}

pub fn print_changes(changes: &ChangeSummary) {
  if changes.is_initial() {
    println!(
      "  {} {}",
      symbols::ADD.if_supports_color(Stream::Stdout, |s| s.green()),
      "everything (no previous configuration)".if_supports_color(Stream::Stdout, |s| s.dimmed())
    );
    return;
  }

  if changes.is_empty() {
    println!("  {}", "no changes".if_supports_color(Stream::Stdout, |s| s.dimmed()));
    return;
  }

  for path in &changes.added {
    println!("  {} {}", symbols::ADD.if_supports_color(Stream::Stdout, |s| s.green()), path);
  }
  for path in &changes.modified {
    println!("  {} {}", symbols::MODIFY.if_supports_color(Stream::Stdout, |s| s.yellow()), path);
  }
  for path in &changes.removed {
    println!("  {} {}", symbols::REMOVE.if_supports_color(Stream::Stdout, |s| s.red()), path);
  }
}

/// "2 added, 1 modified, 0 removed"
pub fn change_counts(changes: &ChangeSummary) -> String {
  if changes.is_initial() {
    return "initial configuration".to_string();
  }
  format!(
    "{} added, {} modified, {} removed",
    changes.added.len(),
    changes.modified.len(),
    changes.removed.len()
  )
}
