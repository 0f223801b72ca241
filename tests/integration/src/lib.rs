//! Integration tests for Restgate server.
//!
//! These tests require a running Restgate server at `localhost:8080` started
//! without `RESTGATE_API_KEY`. They are marked `#[ignore]` so they don't run
//! during normal `cargo test`.
//!
//! Run them with:
//! ```text
//! cargo test -p restgate-integration -- --ignored
//! ```

use std::sync::Once;

use serde_json::Value;

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Base URL of the server.
#[must_use]
pub fn endpoint_url() -> String {
    std::env::var("RESTGATE_ENDPOINT_URL").unwrap_or_else(|_| "http://localhost:8080".to_owned())
}

/// URL of the widgets collection for an API version.
#[must_use]
pub fn widgets_url(version: u32) -> String {
    format!("{}/api/v{version}/widgets", endpoint_url())
}

/// Create an HTTP client.
#[must_use]
pub fn client() -> reqwest::Client {
    init_tracing();
    reqwest::Client::new()
}

/// Generate a unique widget name for a test.
#[must_use]
pub fn test_widget_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    format!("test-{prefix}-{id}")
}

/// Create a widget and return its id. Caller is responsible for cleanup.
pub async fn create_test_widget(client: &reqwest::Client, prefix: &str) -> String {
    let name = test_widget_name(prefix);
    let resp = client
        .post(widgets_url(1))
        .json(&serde_json::json!({ "name": name }))
        .send()
        .await
        .unwrap_or_else(|e| panic!("failed to create widget {name}: {e}"));
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);

    let body: Value = resp.json().await.expect("create response should be JSON");
    let id = body["data"]["id"]
        .as_str()
        .expect("created widget should have an id")
        .to_owned();
    tracing::debug!(widget_id = %id, %name, "created test widget");
    id
}

/// Delete a widget, ignoring failures.
pub async fn cleanup_widget(client: &reqwest::Client, id: &str) {
    match client
        .delete(format!("{}/{id}", widgets_url(1)))
        .send()
        .await
    {
        Ok(resp) => tracing::debug!(widget_id = id, status = %resp.status(), "cleaned up widget"),
        Err(e) => tracing::warn!(widget_id = id, error = %e, "failed to clean up widget"),
    }
}

mod test_error;
mod test_health;
mod test_pagination;
mod test_widgets;
