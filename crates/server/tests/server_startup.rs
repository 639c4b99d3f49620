use std::io::Write;
use std::net::TcpListener;
use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use serde_json::json;
use tempfile::{NamedTempFile, TempDir};
use tokio::time::{sleep, timeout};

/// Find an available port
fn get_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Create a minimal valid config with storage inside `documents_dir`
fn minimal_config(port: u16, documents_dir: &Path) -> String {
    format!(
        r#"
[server]
host = "127.0.0.1"
port = {}

[storage]
documents_dir = {:?}

[converter]
min_delay_ms = 0
max_delay_ms = 0
"#,
        port,
        documents_dir.display().to_string()
    )
}

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

/// Spawn the server and return a handle
async fn spawn_server(config_path: &Path) -> tokio::process::Child {
    tokio::process::Command::new(env!("CARGO_BIN_EXE_convertino"))
        .env("CONVERTINO_CONFIG", config_path)
        .env("RUST_LOG", "error") // Quiet logs during tests
        .kill_on_drop(true)
        .spawn()
        .expect("Failed to spawn server")
}

/// Wait for server to be ready
async fn wait_for_server(port: u16, max_attempts: u32) -> bool {
    let client = Client::new();
    for _ in 0..max_attempts {
        if client
            .get(format!("http://127.0.0.1:{}/api/v1/health", port))
            .send()
            .await
            .is_ok()
        {
            return true;
        }
        sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test]
async fn test_health_endpoint() {
    let port = get_available_port();
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&minimal_config(port, &temp_dir.path().join("documents")));

    let mut server = spawn_server(config.path()).await;

    assert!(
        wait_for_server(port, 40).await,
        "Server did not start in time"
    );

    let client = Client::new();
    let response = client
        .get(format!("http://127.0.0.1:{}/api/v1/health", port))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let json: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(json["status"], "ok");

    server.kill().await.ok();
}

#[tokio::test]
async fn test_config_endpoint_reflects_file() {
    let port = get_available_port();
    let temp_dir = TempDir::new().unwrap();
    let documents_dir = temp_dir.path().join("documents");
    let config = write_config(&minimal_config(port, &documents_dir));

    let mut server = spawn_server(config.path()).await;

    assert!(
        wait_for_server(port, 40).await,
        "Server did not start in time"
    );

    let client = Client::new();
    let response = client
        .get(format!("http://127.0.0.1:{}/api/v1/config", port))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let json: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(json["server"]["port"], port);
    assert_eq!(json["converter"]["max_delay_ms"], 0);
    assert!(documents_dir.is_dir(), "documents dir created at startup");

    server.kill().await.ok();
}

#[tokio::test]
async fn test_import_and_convert_over_http() {
    let port = get_available_port();
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("part.shapr");
    std::fs::write(&source, vec![0x0fu8; 4096]).unwrap();
    let config = write_config(&minimal_config(port, &temp_dir.path().join("documents")));

    let mut server = spawn_server(config.path()).await;
    assert!(
        wait_for_server(port, 40).await,
        "Server did not start in time"
    );

    let client = Client::new();
    let base = format!("http://127.0.0.1:{}/api/v1", port);

    let response = client
        .post(format!("{}/documents", base))
        .json(&json!({ "paths": [source] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    let id = body["documents"][0]["id"].as_str().unwrap().to_string();

    let response = client
        .post(format!("{}/documents/{}/conversions/obj", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 202);

    let output_path = timeout(Duration::from_secs(10), async {
        loop {
            let document: serde_json::Value = client
                .get(format!("{}/documents/{}", base, id))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            let state = &document["states"]["obj"];
            match state["status"].as_str() {
                Some("completed") => return state["output_path"].as_str().unwrap().to_string(),
                // Injected faults are rare but possible; retry
                Some("failed") => {
                    client
                        .post(format!("{}/documents/{}/conversions/obj", base, id))
                        .send()
                        .await
                        .unwrap();
                }
                _ => {}
            }
            sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .expect("conversion did not complete");

    let output = std::fs::read(&output_path).unwrap();
    assert_eq!(output.len(), 4096);
    assert!(output.iter().all(|&b| b == 0xf0));

    server.kill().await.ok();
}

#[tokio::test]
async fn test_restores_cached_documents_as_idle() {
    let port = get_available_port();
    let temp_dir = TempDir::new().unwrap();
    let documents_dir = temp_dir.path().join("documents");
    std::fs::create_dir_all(&documents_dir).unwrap();
    std::fs::write(documents_dir.join("abc_part.shapr"), b"shape").unwrap();

    let cache = json!([{
        "id": "550e8400-e29b-41d4-a716-446655440000",
        "display_name": "part.shapr",
        "file_name": "abc_part.shapr",
        "conversion_states": {
            "step": { "type": "converting", "progress": 0.4 },
            "stl": { "type": "failed", "message": "boom" }
        }
    }]);
    std::fs::write(
        documents_dir.join(".documents_cache.json"),
        serde_json::to_vec_pretty(&cache).unwrap(),
    )
    .unwrap();

    let config = write_config(&minimal_config(port, &documents_dir));
    let mut server = spawn_server(config.path()).await;
    assert!(
        wait_for_server(port, 40).await,
        "Server did not start in time"
    );

    let body: serde_json::Value = Client::new()
        .get(format!("http://127.0.0.1:{}/api/v1/documents", port))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["total"], 1);
    let document = &body["documents"][0];
    assert_eq!(document["id"], "550e8400-e29b-41d4-a716-446655440000");
    assert_eq!(document["file_name"], "part.shapr");
    assert_eq!(document["states"]["step"]["status"], "idle");
    assert_eq!(document["states"]["stl"]["status"], "failed");
    assert_eq!(document["states"]["obj"]["status"], "idle");

    server.kill().await.ok();
}

#[tokio::test]
async fn test_missing_config_file_exits_with_error() {
    let result = timeout(
        Duration::from_secs(5),
        tokio::process::Command::new(env!("CARGO_BIN_EXE_convertino"))
            .env("CONVERTINO_CONFIG", "/nonexistent/config.toml")
            .env("RUST_LOG", "error")
            .output(),
    )
    .await
    .expect("Command timed out")
    .expect("Failed to execute command");

    assert!(!result.status.success());
}

#[tokio::test]
async fn test_invalid_config_exits_with_error() {
    let config = write_config(
        r#"
[server]
port = 0
"#,
    );

    let result = timeout(
        Duration::from_secs(5),
        tokio::process::Command::new(env!("CARGO_BIN_EXE_convertino"))
            .env("CONVERTINO_CONFIG", config.path())
            .env("RUST_LOG", "error")
            .output(),
    )
    .await
    .expect("Command timed out")
    .expect("Failed to execute command");

    assert!(!result.status.success());
}
