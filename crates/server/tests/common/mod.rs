//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with a scriptable job executor, so the HTTP surface can be exercised
//! without running any external command.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use claimer_core::testing::MockJobExecutor;
use claimer_core::{
    create_store_writer, AccountOrchestrator, AccountRegistry, AccountStore, AppState, Config,
    FixedJobSource, JsonAccountStore, OrchestratorConfig, ServerConfig, StorageConfig,
};
use claimer_server::state::ServerState;

/// Re-export fixtures for test convenience
pub use claimer_core::testing::fixtures;

/// Test fixture for API testing.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_add_account() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.post("/api/v1/accounts", json!({
///         "email": "a@example.com",
///         "password": "pw"
///     })).await;
///
///     assert_eq!(response.status, StatusCode::CREATED);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock executor - script failures and durations
    pub executor: MockJobExecutor,
    /// Orchestrator behind the router
    pub orchestrator: AccountOrchestrator,
    /// Temporary directory holding the account store
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with default settings.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let accounts_path = temp_dir.path().join("accounts.json");

        let orchestrator_config = OrchestratorConfig {
            concurrent: test_config.concurrent,
            retry_budget: test_config.retry_budget,
            retry_backoff_ms: 20,
            job_timeout_secs: 5,
            ..Default::default()
        };

        let config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            storage: StorageConfig {
                accounts_path: accounts_path.clone(),
            },
            orchestrator: orchestrator_config.clone(),
            ..Default::default()
        };

        let executor = MockJobExecutor::new();
        executor.set_job_duration(test_config.job_duration).await;

        let store: Arc<dyn AccountStore> = Arc::new(JsonAccountStore::new(accounts_path));
        let (store_handle, store_writer) = create_store_writer(store);
        tokio::spawn(store_writer.run());

        let registry = AccountRegistry::from_accounts(test_config.accounts.clone())
            .expect("Invalid fixture accounts");
        let orchestrator = AccountOrchestrator::new(
            orchestrator_config,
            registry,
            Arc::new(FixedJobSource::new(test_config.jobs_per_account)),
            Arc::new(executor.clone()),
            Some(store_handle),
        );

        let state = Arc::new(ServerState::new(config, orchestrator.clone()));
        let router = claimer_server::api::create_router(state);

        Self {
            router,
            executor,
            orchestrator,
            temp_dir,
        }
    }

    /// Wait until the published state satisfies `f`.
    pub async fn wait_for_state<F>(&self, f: F) -> AppState
    where
        F: FnMut(&AppState) -> bool,
    {
        tokio::time::timeout(Duration::from_secs(10), self.orchestrator.status().wait_for(f))
            .await
            .expect("Timed out waiting for state")
            .expect("Status publisher closed")
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a PUT request with JSON body.
    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a GET request and return the raw body text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        (status, String::from_utf8_lossy(&body_bytes).into_owned())
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone)]
pub struct TestConfig {
    /// Accounts registered before the router is built
    pub accounts: Vec<claimer_core::Account>,
    pub concurrent: usize,
    pub retry_budget: u32,
    pub jobs_per_account: u64,
    pub job_duration: Duration,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            accounts: Vec::new(),
            concurrent: 1,
            retry_budget: 3,
            jobs_per_account: 1,
            job_duration: Duration::from_millis(10),
        }
    }
}

impl TestConfig {
    /// Create config with the given accounts registered.
    pub fn with_accounts(names: &[&str]) -> Self {
        Self {
            accounts: fixtures::accounts(names),
            ..Default::default()
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
