// Tests for the HTTP front end

use querykill::cli::commands::AuditSelection;
use querykill::cli::serve::router;
use querykill::config::Config;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;

async fn spawn_app() -> (String, TempDir) {
    let temp = TempDir::new().unwrap();
    let app = router(
        Config::default(),
        AuditSelection::Sqlite(temp.path().join("audit.db")),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), temp)
}

async fn post_kill(base: &str, body: Value) -> (u16, Value) {
    let response = reqwest::Client::new()
        .post(format!("{}/api/kill-query", base))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn test_health() {
    let (base, _temp) = spawn_app().await;

    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_missing_administrator_is_argument_error() {
    let (base, _temp) = spawn_app().await;

    let (status, body) = post_kill(
        &base,
        json!({ "host": "db1", "user": "root", "query": "SELECT 1" }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["status"], "argument_error");
    assert_eq!(body["exit_code"], 4);
    assert!(body["message"].as_str().unwrap().contains("killed-by-user"));
}

#[tokio::test]
async fn test_malformed_body_is_argument_error() {
    let (base, _temp) = spawn_app().await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/kill-query", base))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "argument_error");
    assert_eq!(body["exit_code"], 4);
}

#[tokio::test]
async fn test_unreachable_server_is_connection_error() {
    let (base, temp) = spawn_app().await;

    let (status, body) = post_kill(
        &base,
        json!({
            "host": "127.0.0.1",
            "port": 1,
            "user": "root",
            "password": "",
            "query": "SELECT * FROM big_table",
            "killed_by_user": "alice"
        }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["status"], "connection_error");
    assert_eq!(body["exit_code"], 3);
    assert!(body["message"].as_str().unwrap().contains("127.0.0.1:1"));
    assert!(body.get("session_id").is_none());
    // Nothing was killed, so the audit store was never opened
    assert!(!temp.path().join("audit.db").exists());
}
