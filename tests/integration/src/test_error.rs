//! Error handling integration tests.

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use serde_json::{Value, json};

    use crate::{client, endpoint_url, widgets_url};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_invalid_json_body() {
        let resp = client()
            .post(widgets_url(1))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["kind"], "Decode");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_missing_required_name() {
        let resp = client()
            .post(widgets_url(1))
            .json(&json!({"color": "red"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["kind"], "Validation");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_unknown_format() {
        let resp = client()
            .get(format!("{}?format=xml", widgets_url(1)))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_IMPLEMENTED);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["kind"], "UnsupportedFormat");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_return_not_found_for_unknown_path() {
        let resp = client()
            .get(format!("{}/api/v1/gadgets", endpoint_url()))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_return_method_not_allowed() {
        let resp = client()
            .patch(format!("{}/1", widgets_url(1)))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_oversized_body() {
        let name = "x".repeat(2 * 1024 * 1024);
        let resp = client()
            .post(widgets_url(1))
            .json(&json!({ "name": name }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
