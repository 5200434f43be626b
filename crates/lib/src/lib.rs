//! confkit-lib: configuration as code
//!
//! This crate provides the pipeline that decides whether two configuration
//! documents are the same, what changed between them, and whether a
//! document is safe to apply:
//! - `document`: JSON-with-comments documents and their reserved metadata
//! - `hash`: canonical content hashes for drift detection
//! - `flatten` / `diff`: dotted-path change summaries
//! - `validate`: leveled findings from a fixed rule set
//!
//! Around it sit the collaborators that move documents around: `store`,
//! `service`, `server`, `client`, plus `settings`, `paths` and `cache`.

pub mod api;
pub mod cache;
pub mod client;
pub mod consts;
pub mod diff;
pub mod document;
pub mod flatten;
pub mod hash;
pub mod paths;
pub mod server;
pub mod service;
pub mod settings;
pub mod store;
pub mod validate;
