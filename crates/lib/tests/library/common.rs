//! Shared helpers for library integration tests.

use std::net::TcpListener as StdTcpListener;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use serde_json::Value;
use tokio::runtime::Builder;
use tokio::sync::oneshot;

use confkit_lib::document::Document;
use confkit_lib::server;
use confkit_lib::service::ConfigService;
use confkit_lib::store::{ConfigStore, InstanceKey, MemoryStore};

/// Build a document from a `json!` literal.
pub fn doc(value: Value) -> Document {
  Document::from_value(value).unwrap()
}

pub fn key(value: &str) -> InstanceKey {
  InstanceKey::parse(value).unwrap()
}

/// A service over a fresh memory store, plus the store for direct checks.
pub fn memory_service() -> (ConfigService, Arc<MemoryStore>) {
  let store = Arc::new(MemoryStore::new());
  let service = ConfigService::new(Arc::clone(&store) as Arc<dyn ConfigStore>);
  (service, store)
}

/// The HTTP service on an ephemeral port, stopped on drop.
pub struct TestServer {
  pub base_url: String,
  shutdown: Option<oneshot::Sender<()>>,
  join: Option<JoinHandle<()>>,
}

impl TestServer {
  pub fn start(service: ConfigService) -> Self {
    let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();
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
