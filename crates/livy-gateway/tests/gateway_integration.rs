use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use livy_config::ApiConfig;
use livy_db::{Migrator, SqlRepository, SqliteStore};
use livy_gateway::{ConfigurationService, GatewayServer};
use serde_json::{Value, json};

/// Pick a random available port.
fn random_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind to random port");
    listener.local_addr().unwrap().port()
}

/// Migrate a fresh in-memory store, start the gateway in the background and
/// return its base URL.
async fn start_test_gateway() -> String {
    let port = random_port();
    let api = ApiConfig {
        host: "127.0.0.1".to_string(),
        port,
        request_timeout_ms: 5_000,
    };

    let repo = Arc::new(SqlRepository::new(Arc::new(SqliteStore::in_memory().unwrap())));
    Migrator::new(repo.clone()).run().await.unwrap();
    let service = ConfigurationService::new(repo, api.request_timeout());

    tokio::spawn(async move {
        let server = GatewayServer::new(api, service);
        let _ = server.run_until(std::future::pending()).await;
    });

    // Wait for the server to be ready
    for _ in 0..50 {
        if TcpListener::bind(format!("127.0.0.1:{port}")).is_err() {
            break; // port is in use = server is up
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    format!("http://127.0.0.1:{port}")
}

async fn create(client: &reqwest::Client, base: &str, name: &str, value: &str) -> Value {
    let resp = client
        .post(format!("{base}/api/configuration/create"))
        .json(&json!({ "name": name, "value": value }))
        .send()
        .await
        .expect("create request failed");
    assert_eq!(resp.status(), 200);
    resp.json().await.unwrap()
}

#[tokio::test]
async fn health_endpoint_returns_ok() {
    let base = start_test_gateway().await;
    let resp = reqwest::get(format!("{base}/health"))
        .await
        .expect("health request failed");
    assert_eq!(resp.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn insert_then_fetch_by_name() {
    let base = start_test_gateway().await;
    let client = reqwest::Client::new();

    let created = create(&client, &base, "x", "1").await;
    let id = created["data"]["id"].as_str().unwrap().to_string();
    assert!(!id.is_empty());

    let body: Value = client
        .get(format!("{base}/api/configuration/x"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], 200);
    assert_eq!(body["data"]["id"], id);
    assert_eq!(body["data"]["value"], "1");
}

#[tokio::test]
async fn update_by_id_moves_the_name() {
    let base = start_test_gateway().await;
    let client = reqwest::Client::new();

    let created = create(&client, &base, "x", "1").await;
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let resp = client
        .put(format!("{base}/api/configuration/update/{id}"))
        .json(&json!({ "name": "y", "value": "2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Configuration Updated Successfully");
    assert_eq!(body["data"]["updated"], 1);

    let renamed: Value = client
        .get(format!("{base}/api/configuration/y"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(renamed["data"]["value"], "2");
    assert_eq!(renamed["data"]["id"], id);

    let old: Value = client
        .get(format!("{base}/api/configuration/x"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(old["data"]["id"], "");
}

#[tokio::test]
async fn list_returns_both_entries() {
    let base = start_test_gateway().await;
    let client = reqwest::Client::new();

    let a = create(&client, &base, "alpha", "1").await;
    let b = create(&client, &base, "beta", "2").await;

    let body: Value = client
        .get(format!("{base}/api/configuration"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let entries = body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    let ids: Vec<&Value> = entries.iter().map(|e| &e["id"]).collect();
    assert!(ids.contains(&&a["data"]["id"]));
    assert!(ids.contains(&&b["data"]["id"]));
}

#[tokio::test]
async fn invalid_json_is_a_client_error() {
    let base = start_test_gateway().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/api/configuration/create"))
        .body("{\"name\": 1}")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], 400);
    assert!(body["data"].is_null());

    // The server keeps serving after a rejected request.
    let resp = reqwest::get(format!("{base}/api/configuration")).await.unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn cors_preflight_is_allowed() {
    let base = start_test_gateway().await;
    let client = reqwest::Client::new();

    let resp = client
        .request(reqwest::Method::OPTIONS, format!("{base}/api/configuration"))
        .header("Origin", "http://example.com")
        .header("Access-Control-Request-Method", "GET")
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    assert!(resp.headers().contains_key("access-control-allow-origin"));
}
