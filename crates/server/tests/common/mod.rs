//! Common test utilities for in-process API testing.
//!
//! This module provides a test fixture that builds the full router over a
//! real document library, with the conversion engine replaced by a
//! controllable mock.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use convertino_core::testing::MockConverter;
use convertino_core::{
    Config, ConversionManager, Converter, DocumentCache, DocumentLibrary, FsFileStore,
};
use convertino_server::api::create_router;
use convertino_server::state::AppState;

/// Re-export fixtures for test convenience
pub use convertino_core::testing::fixtures;

/// Test fixture for API testing with a mock converter.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_import() {
///     let fixture = TestFixture::new().await;
///     let source = fixture.source_file("part.shapr", 64);
///
///     let response = fixture.post("/api/v1/documents", json!({ "paths": [source] })).await;
///
///     assert_eq!(response.status, 201);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock converter - control duration, progress steps and failures
    pub converter: Arc<MockConverter>,
    /// The library behind the router
    pub library: Arc<DocumentLibrary>,
    /// Managed documents directory
    pub documents_dir: PathBuf,
    /// Directory holding source files to import from
    pub inbox_dir: PathBuf,
    /// Keeps the directories alive for the fixture's lifetime
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with default configuration.
    pub async fn new() -> Self {
        Self::with_config(Config::default()).await
    }

    /// Create a test fixture from `config`; storage is redirected into a temp dir.
    pub async fn with_config(mut config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let documents_dir = temp_dir.path().join("documents");
        let inbox_dir = temp_dir.path().join("inbox");
        std::fs::create_dir_all(&documents_dir).expect("Failed to create documents dir");
        std::fs::create_dir_all(&inbox_dir).expect("Failed to create inbox dir");

        config.storage.documents_dir = documents_dir.clone();

        let converter = Arc::new(MockConverter::new());
        let (manager, _) =
            ConversionManager::spawn(Arc::clone(&converter) as Arc<dyn Converter>);

        let cache = DocumentCache::new(&documents_dir, &config.storage.cache_file_name);
        let library = Arc::new(DocumentLibrary::new(
            Arc::new(FsFileStore::new()),
            cache,
            manager,
        ));
        library.restore().await;

        let state = Arc::new(AppState::new(config, Arc::clone(&library)));
        let router = create_router(state);

        Self {
            router,
            converter,
            library,
            documents_dir,
            inbox_dir,
            temp_dir,
        }
    }

    /// Write a source file of `len` bytes into the inbox.
    pub fn source_file(&self, name: &str, len: usize) -> PathBuf {
        fixtures::source_file(&self.inbox_dir, name, len)
    }

    /// Import `name` through the API and return the created document's id.
    pub async fn import(&self, name: &str) -> String {
        let source = self.source_file(name, 64);
        let response = self
            .post(
                "/api/v1/documents",
                serde_json::json!({ "paths": [source] }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "import failed: {}", response.body);
        response.body["documents"][0]["id"]
            .as_str()
            .expect("created document has an id")
            .to_string()
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

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a GET request and return the raw body as text.
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

/// Helper to assert a JSON path equals expected value.
#[macro_export]
macro_rules! assert_json_path {
    ($json:expr, $path:expr, $expected:expr) => {
        let actual = &$json[$path];
        assert_eq!(
            actual, &$expected,
            "Path '{}' expected {:?}, got {:?}",
            $path, $expected, actual
        );
    };
}
