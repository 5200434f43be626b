//! Serve command implementation.
//!
//! Runs the configuration service on the configured address until Ctrl-C.
//! Flags override the `[server]` section of the settings file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};

use confkit_lib::hash::HashScheme;
use confkit_lib::server;
use confkit_lib::service::ConfigService;
use confkit_lib::settings::StoreKind;

use super::{load_settings, runtime};
use crate::output::{print_info, print_stat};

pub fn cmd_serve(
  addr: Option<String>,
  store: Option<StoreKind>,
  store_dir: Option<PathBuf>,
  hash_scheme: Option<HashScheme>,
  config_file: Option<&Path>,
) -> Result<()> {
  let settings = load_settings(config_file)?;
  let mut server_settings = settings.server;
  if let Some(addr) = addr {
    server_settings.addr = addr;
  }
  if let Some(store) = store {
    server_settings.store = store;
  }
  if let Some(dir) = store_dir {
    server_settings.store_dir = Some(dir);
  }
  if let Some(scheme) = hash_scheme {
    server_settings.hash_scheme = scheme;
  }

  let socket_addr = server_settings.socket_addr()?;
  let store = server_settings.open_store().context("Failed to open store")?;
  let service = ConfigService::new(store);

  let rt = runtime()?;
  rt.block_on(async move {
    let listener = TcpListener::bind(socket_addr)
      .await
      .with_context(|| format!("Failed to bind {}", socket_addr))?;
    let local = listener.local_addr().context("Failed to read listen address")?;

    print_info(&format!("Serving on http://{}", local));
    print_stat("Store", &server_settings.store.to_string());
    if server_settings.store == StoreKind::File {
      print_stat("Directory", &server_settings.store_dir().display().to_string());
    }
    print_stat("Hash scheme", &server_settings.hash_scheme.to_string());

    server::serve(listener, service, shutdown_signal())
      .await
      .context("Server failed")?;
    info!("server stopped");
    Ok(())
  })
}

async fn shutdown_signal() {
  if let Err(err) = tokio::signal::ctrl_c().await {
    warn!(error = %err, "failed to listen for Ctrl-C");
    std::future::pending::<()>().await;
  }
}
