//! Health check integration tests.

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use crate::{client, endpoint_url};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_report_running_with_resources() {
        let resp = client()
            .get(format!("{}/health", endpoint_url()))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "running");
        assert_eq!(body["resources"], serde_json::json!(["widgets"]));
    }
}
