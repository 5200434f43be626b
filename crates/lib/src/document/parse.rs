//! Reading documents from JSON-with-comments text.
//!
//! Config files may contain `//` line comments, `/* */` block comments and
//! trailing commas. These are stripped before handing the text to
//! `serde_json`; newlines inside comments are kept so parser line numbers
//! still point at the original file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use super::Document;

/// Errors produced while turning text into a [`Document`].
#[derive(Debug, Error)]
pub enum DocumentError {
  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("unterminated block comment starting on line {line}")]
  UnterminatedComment { line: usize },

  #[error("invalid JSON: {0}")]
  Syntax(#[from] serde_json::Error),

  #[error("configuration must be a JSON object, found {found}")]
  NotAnObject { found: &'static str },
}

/// Parse document text, stripping comments and trailing commas first.
pub fn parse_document(text: &str) -> Result<Document, DocumentError> {
  let stripped = strip_comments(text)?;
  let value: Value = serde_json::from_str(&stripped)?;
  Document::from_value(value)
}

/// Read and parse a document file.
pub fn load_document(path: &Path) -> Result<Document, DocumentError> {
  let text = fs::read_to_string(path).map_err(|source| DocumentError::Read {
    path: path.to_path_buf(),
    source,
  })?;
  parse_document(&text)
}

/// Remove comments and trailing commas from JSON-with-comments text.
///
/// String literals are copied verbatim, so `"https://example.com"` keeps its
/// slashes.
pub fn strip_comments(text: &str) -> Result<String, DocumentError> {
  let mut out = String::with_capacity(text.len());
  let mut chars = text.chars().peekable();
  let mut in_string = false;
  let mut escaped = false;
  let mut line = 1;

  while let Some(c) = chars.next() {
    if c == '\n' {
      line += 1;
    }

    if in_string {
      out.push(c);
      if escaped {
        escaped = false;
      } else if c == '\\' {
        escaped = true;
      } else if c == '"' {
        in_string = false;
      }
      continue;
    }

    match c {
      '"' => {
        in_string = true;
        out.push(c);
      }
      '/' if chars.peek() == Some(&'/') => {
        while let Some(&next) = chars.peek() {
          if next == '\n' {
            break;
          }
          chars.next();
        }
      }
      '/' if chars.peek() == Some(&'*') => {
        chars.next();
        let start = line;
        let mut closed = false;
        while let Some(next) = chars.next() {
          if next == '\n' {
            line += 1;
            out.push('\n');
          } else if next == '*' && chars.peek() == Some(&'/') {
            chars.next();
            closed = true;
            break;
          }
        }
        if !closed {
          return Err(DocumentError::UnterminatedComment { line: start });
        }
      }
      _ => out.push(c),
    }
  }

  Ok(remove_trailing_commas(&out))
}

fn remove_trailing_commas(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  let mut in_string = false;
  let mut escaped = false;

  for (i, c) in text.char_indices() {
    if in_string {
      out.push(c);
      if escaped {
        escaped = false;
      } else if c == '\\' {
        escaped = true;
      } else if c == '"' {
        in_string = false;
      }
      continue;
    }

    if c == '"' {
      in_string = true;
    } else if c == ',' && text[i + 1..].trim_start().starts_with(['}', ']']) {
      continue;
    }
    out.push(c);
  }

  out
}
