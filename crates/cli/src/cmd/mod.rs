mod apply;
mod diff;
mod hash;
mod history;
mod pull;
mod serve;
mod status;
mod validate;

pub use apply::cmd_apply;
pub use diff::cmd_diff;
pub use hash::cmd_hash;
pub use history::cmd_history;
pub use pull::cmd_pull;
pub use serve::cmd_serve;
pub use status::cmd_status;
pub use validate::cmd_validate;

use std::path::Path;

use anyhow::{Context, Result};
use tokio::runtime::Runtime;

use confkit_lib::client::ApiClient;
use confkit_lib::document::{Document, load_document};
use confkit_lib::settings::Settings;
use confkit_lib::store::InstanceKey;

fn load_settings(config_file: Option<&Path>) -> Result<Settings> {
  Settings::load(config_file).context("Failed to load settings")
}

fn load_file(file: &Path) -> Result<Document> {
  load_document(file).with_context(|| format!("Failed to load {}", file.display()))
}

/// The `--instance` flag, else `api.instance`.
fn instance_key(settings: &Settings, flag: Option<&str>) -> Result<InstanceKey> {
  let value = flag.unwrap_or(&settings.api.instance);
  InstanceKey::parse(value).context("Invalid instance")
}

fn api_client(settings: &Settings) -> Result<ApiClient> {
  let key = settings.api.key.as_deref().unwrap_or_default();
  ApiClient::new(&settings.api.url, key).context("Failed to create API client")
}

fn runtime() -> Result<Runtime> {
  Runtime::new().context("Failed to create async runtime")
}
