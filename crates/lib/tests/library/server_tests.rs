//! HTTP round trips against a real listener.

use std::sync::Arc;

use serde_json::{Value, json};

use confkit_lib::api::{ApplyMetadata, ApplyRequest, ErrorCode};
use confkit_lib::client::{ApiClient, ClientError};
use confkit_lib::hash::{HashScheme, compute_hash, compute_hash_with};
use confkit_lib::service::ConfigService;
use confkit_lib::store::{MemoryStore, Source};

use super::common::{TestServer, doc, key, memory_service};

fn start() -> (TestServer, ApiClient) {
  let (service, _store) = memory_service();
  let server = TestServer::start(service);
  let client = ApiClient::new(&server.base_url, "sk_test").unwrap();
  (server, client)
}

#[tokio::test]
async fn health_is_open() {
  let (server, client) = start();
  assert_eq!(client.health().await.unwrap().status, "ok");

  let response = reqwest::get(format!("{}/health", server.base_url)).await.unwrap();
  assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn missing_bearer_is_unauthorized() {
  let (server, _client) = start();
  let response = reqwest::get(format!("{}/v1/instances/ins_1/config", server.base_url))
    .await
    .unwrap();
  assert_eq!(response.status(), 401);

  let body: Value = response.json().await.unwrap();
  assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn unknown_instance_is_not_found() {
  let (_server, client) = start();
  let err = client.fetch(&key("ins_missing")).await.unwrap_err();
  assert!(matches!(err, ClientError::NotFound { .. }), "got {:?}", err);

  let err = client.history(&key("ins_missing")).await.unwrap_err();
  assert!(matches!(err, ClientError::NotFound { .. }));
}

#[tokio::test]
async fn apply_fetch_status_history_round_trip() {
  let (_server, client) = start();
  let instance = key("ins_http");
  let document = doc(json!({
    "version": "1.0",
    "authentication": { "signUp": { "mode": "restricted" } }
  }));

  let applied = client
    .apply(&instance, &ApplyRequest::new(&document, "alice", Source::Cli))
    .await
    .unwrap();
  assert!(applied.success);
  assert!(applied.metadata.change_summary.is_initial());
  assert_eq!(applied.metadata.validation_findings.len(), 1);
  assert_eq!(applied.metadata.hash, compute_hash(&document));

  let fetched = client.fetch(&instance).await.unwrap();
  assert_eq!(fetched.without_metadata(), document);

  let status = client.status(&instance, Some(&compute_hash(&document))).await.unwrap();
  assert!(!status.has_changes);
  assert_eq!(status.last_modified_by, "alice");
  assert_eq!(status.last_modified_source, Source::Cli);

  let history = client.history(&instance).await.unwrap();
  assert_eq!(history.entries.len(), 1);
  assert_eq!(history.instance, instance);
}

#[tokio::test]
async fn status_against_v2_store_matches_unchanged_file() {
  let service = ConfigService::new(Arc::new(MemoryStore::with_scheme(HashScheme::V2)));
  let server = TestServer::start(service);
  let client = ApiClient::new(&server.base_url, "sk_test").unwrap();
  let instance = key("ins_v2");
  let document = doc(json!({
    "version": "1.0",
    "redirects": { "signUpUrl": "https://example.com/up", "signInUrl": "https://example.com/in" }
  }));

  let applied = client
    .apply(&instance, &ApplyRequest::new(&document, "alice", Source::Cli))
    .await
    .unwrap();
  assert_eq!(applied.metadata.hash, compute_hash_with(&document, HashScheme::V2));

  let status = client.status(&instance, Some(&compute_hash(&document))).await.unwrap();
  assert!(!status.has_changes);
  assert_eq!(status.hash, applied.metadata.hash);
}

#[tokio::test]
async fn unknown_status_scheme_is_bad_request() {
  let (server, client) = start();
  let document = doc(json!({ "version": "1.0" }));
  client
    .apply(&key("ins_scheme"), &ApplyRequest::new(&document, "alice", Source::Cli))
    .await
    .unwrap();

  let response = reqwest::Client::new()
    .get(format!(
      "{}/v1/instances/ins_scheme/config/status?hash={}&scheme=v9",
      server.base_url,
      compute_hash(&document)
    ))
    .bearer_auth("sk_test")
    .send()
    .await
    .unwrap();
  assert_eq!(response.status(), 400);
  let body: Value = response.json().await.unwrap();
  assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn blocking_findings_come_back_as_unprocessable() {
  let (_server, client) = start();
  let document = doc(json!({ "redirects": { "signInUrl": "not a url" } }));

  let err = client
    .apply(&key("ins_bad"), &ApplyRequest::new(&document, "alice", Source::Cli))
    .await
    .unwrap_err();
  assert!(matches!(err, ClientError::Validation { .. }), "got {:?}", err);
  let paths: Vec<&str> = err.findings().iter().map(|f| f.path.as_str()).collect();
  assert_eq!(paths, vec!["version", "redirects.signInUrl"]);

  assert!(matches!(
    client.fetch(&key("ins_bad")).await,
    Err(ClientError::NotFound { .. })
  ));
}

#[tokio::test]
async fn stale_expected_hash_is_conflict() {
  let (_server, client) = start();
  let instance = key("ins_cas");
  let first = doc(json!({ "version": "1.0" }));
  let stale = compute_hash(&first);
  client
    .apply(&instance, &ApplyRequest::new(&first, "alice", Source::Cli))
    .await
    .unwrap();
  client
    .apply(
      &instance,
      &ApplyRequest::new(&doc(json!({ "version": "1.0", "redirects": {} })), "alice", Source::Cli),
    )
    .await
    .unwrap();

  let late = doc(json!({ "version": "1.0", "organizations": { "enabled": false } }));
  let err = client
    .apply(&instance, &ApplyRequest::new(&late, "bob", Source::Cli).with_expected_hash(&stale))
    .await
    .unwrap_err();
  assert!(matches!(err, ClientError::Conflict { .. }), "got {:?}", err);
}

#[tokio::test]
async fn request_shape_errors_are_bad_request() {
  let (server, client) = start();
  let instance = key("ins_shape");

  let no_metadata = ApplyRequest {
    document: Some(json!({ "version": "1.0" })),
    metadata: None,
  };
  let err = client.apply(&instance, &no_metadata).await.unwrap_err();
  assert!(matches!(err, ClientError::BadRequest { code: ErrorCode::BadRequest, .. }));

  let not_object = ApplyRequest {
    document: Some(json!(["version"])),
    metadata: Some(ApplyMetadata {
      hash: Some(format!("sha256:{}", "0".repeat(64))),
      ..ApplyMetadata::default()
    }),
  };
  let err = client.apply(&instance, &not_object).await.unwrap_err();
  assert!(matches!(
    err,
    ClientError::BadRequest {
      code: ErrorCode::InvalidDocument,
      ..
    }
  ));

  let response = reqwest::Client::new()
    .post(format!("{}/v1/instances/ins_shape/config/apply", server.base_url))
    .bearer_auth("sk_test")
    .header("content-type", "application/json")
    .body("{ not json")
    .send()
    .await
    .unwrap();
  assert_eq!(response.status(), 400);
}
