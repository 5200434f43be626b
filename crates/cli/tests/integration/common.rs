//! Shared test helpers for CLI integration tests.

use std::net::TcpListener as StdTcpListener;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;
use tokio::runtime::Builder;
use tokio::sync::oneshot;

use confkit_lib::hash::HashScheme;
use confkit_lib::server;
use confkit_lib::service::ConfigService;
use confkit_lib::store::MemoryStore;

pub const INSTANCE: &str = "ins_test";
pub const ACTOR: &str = "tester";

/// Address nothing listens on, for commands that must not reach a server.
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:9";

/// Isolated test environment.
///
/// Each test gets its own temporary directory for settings, cache and
/// configuration files.
pub struct TestEnv {
  pub temp: TempDir,
  api_url: String,
  _server: Option<TestServer>,
}

impl TestEnv {
  /// Environment talking to a fresh in-process service.
  pub fn with_server() -> Self {
    Self::with_server_scheme(HashScheme::V1)
  }

  /// Environment talking to a service that stores hashes under `scheme`.
  pub fn with_server_scheme(scheme: HashScheme) -> Self {
    let server = TestServer::start(scheme);
    Self {
      temp: TempDir::new().unwrap(),
      api_url: server.base_url.clone(),
      _server: Some(server),
    }
  }

  /// Environment without a service.
  pub fn offline() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
      api_url: UNREACHABLE_URL.to_string(),
      _server: None,
    }
  }

  /// Write a file relative to the temp directory.
  pub fn write_file(&self, relative_path: &str, content: &str) -> PathBuf {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
  }

  pub fn path(&self, relative_path: &str) -> PathBuf {
    self.temp.path().join(relative_path)
  }

  /// Cached copy of [`INSTANCE`].
  pub fn cache_file(&self) -> PathBuf {
    self
      .temp
      .path()
      .join("data")
      .join("confkit")
      .join("cache")
      .join(format!("{}.json", INSTANCE))
  }

  /// Get a pre-configured Command for the confkit binary.
  ///
  /// Sets environment variables for isolated testing:
  /// - `XDG_CONFIG_HOME` / `XDG_DATA_HOME`: isolated settings and cache
  /// - `APPDATA`: the same, for Windows
  /// - `CONFKIT_*`: service URL, key, instance and actor
  pub fn confkit_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("confkit");
    cmd.env("XDG_CONFIG_HOME", self.temp.path().join("config"));
    cmd.env("XDG_DATA_HOME", self.temp.path().join("data"));
    cmd.env("APPDATA", self.temp.path().join("data"));
    cmd.env_remove("CONFKIT_CONFIG");
    cmd.env_remove("RUST_LOG");
    cmd.env("CONFKIT_API_URL", &self.api_url);
    cmd.env("CONFKIT_API_KEY", "sk_test");
    cmd.env("CONFKIT_INSTANCE", INSTANCE);
    cmd.env("CONFKIT_ACTOR", ACTOR);
    cmd
  }
}

/// The HTTP service on an ephemeral port, stopped on drop.
struct TestServer {
  base_url: String,
  shutdown: Option<oneshot::Sender<()>>,
  join: Option<JoinHandle<()>>,
}

impl TestServer {
  fn start(scheme: HashScheme) -> Self {
    let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();
    let service = ConfigService::new(Arc::new(MemoryStore::with_scheme(scheme)));
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let join = thread::spawn(move || {
      let runtime = Builder::new_current_thread().enable_all().build().unwrap();
      runtime.block_on(async move {
        let listener = tokio::net::TcpListener::from_std(listener).unwrap();
        let shutdown = async move {
          let _ = shutdown_rx.await;
        };
        server::serve(listener, service, shutdown).await.unwrap();
      });
    });

    Self {
      base_url: format!("http://{}", addr),
      shutdown: Some(shutdown_tx),
      join: Some(join),
    }
  }
}

impl Drop for TestServer {
  fn drop(&mut self) {
    if let Some(tx) = self.shutdown.take() {
      let _ = tx.send(());
    }
    if let Some(join) = self.join.take() {
      let _ = join.join();
    }
  }
}
