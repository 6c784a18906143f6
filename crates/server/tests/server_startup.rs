use std::io::Write;
use std::net::TcpListener;
use std::path::Path;
use std::time::Duration;

use reqwest::Client;
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

/// Create a minimal valid config
fn minimal_config(port: u16, accounts_path: &Path) -> String {
    format!(
        r#"
[server]
host = "127.0.0.1"
port = {}

[storage]
accounts_path = "{}"

[orchestrator]
retry_backoff_ms = 50

[executor]
jobs_per_account = 2

[executor.command]
program = "true"
args = ["--hidden-flag"]
"#,
        port,
        accounts_path.display()
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
    tokio::process::Command::new(env!("CARGO_BIN_EXE_claimer"))
        .env("CLAIMER_CONFIG", config_path)
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

/// Run the binary to completion with the given config path.
async fn run_to_exit(config_path: &Path) -> std::process::Output {
    timeout(
        Duration::from_secs(5),
        tokio::process::Command::new(env!("CARGO_BIN_EXE_claimer"))
            .env("CLAIMER_CONFIG", config_path)
            .env("RUST_LOG", "error")
            .output(),
    )
    .await
    .expect("Command timed out")
    .expect("Failed to execute command")
}

#[tokio::test]
async fn test_health_endpoint() {
    let port = get_available_port();
    let dir = TempDir::new().unwrap();
    let config = write_config(&minimal_config(port, &dir.path().join("accounts.json")));

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
async fn test_config_endpoint_returns_sanitized() {
    let port = get_available_port();
    let dir = TempDir::new().unwrap();
    let config = write_config(&minimal_config(port, &dir.path().join("accounts.json")));

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
    assert_eq!(json["executor"]["command_configured"], true);
    assert_eq!(json["executor"]["program"], "true");
    assert!(!json.to_string().contains("--hidden-flag"));

    server.kill().await.ok();
}

#[cfg(unix)]
#[tokio::test]
async fn test_run_with_command_executor() {
    let port = get_available_port();
    let dir = TempDir::new().unwrap();
    let accounts_path = dir.path().join("accounts.json");
    let config = write_config(&minimal_config(port, &accounts_path));

    let mut server = spawn_server(config.path()).await;
    assert!(
        wait_for_server(port, 40).await,
        "Server did not start in time"
    );

    let base = format!("http://127.0.0.1:{}/api/v1", port);
    let client = Client::new();

    let response = client
        .put(format!("{}/accounts", base))
        .json(&serde_json::json!([
            {"email": "a@example.com", "password": "one"},
            {"email": "b@example.com", "password": "two"},
        ]))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let response = client
        .post(format!("{}/start", base))
        .json(&serde_json::json!({"concurrent": 2}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 202);

    let mut finished = false;
    for _ in 0..100 {
        let state: serde_json::Value = client
            .get(format!("{}/state", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if state["running"] == false && state["jobs_left"] == 0 {
            assert_eq!(state["account_status"], serde_json::json!([0, 0]));
            finished = true;
            break;
        }
        sleep(Duration::from_millis(50)).await;
    }
    assert!(finished, "Run did not finish in time");

    // Credentials were saved by the background writer
    let stored = std::fs::read_to_string(&accounts_path).expect("accounts file missing");
    assert!(stored.contains("a@example.com"));
    assert!(stored.contains("b@example.com"));

    server.kill().await.ok();
}

#[tokio::test]
async fn test_missing_config_file_exits_with_error() {
    let result = run_to_exit(Path::new("/nonexistent/config.toml")).await;
    assert!(!result.status.success());
}

#[tokio::test]
async fn test_missing_command_exits_with_error() {
    let config_without_command = r#"
[server]
port = 8080
"#;
    let config = write_config(config_without_command);

    let result = run_to_exit(config.path()).await;
    assert!(!result.status.success());
}

#[tokio::test]
async fn test_invalid_config_exits_with_error() {
    let config = write_config(
        r#"
[orchestrator]
concurrent = 0

[executor.command]
program = "true"
"#,
    );

    let result = run_to_exit(config.path()).await;
    assert!(!result.status.success());
}
