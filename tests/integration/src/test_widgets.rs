//! Widget CRUD integration tests.

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use serde_json::{Value, json};

    use crate::{cleanup_widget, client, create_test_widget, test_widget_name, widgets_url};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_create_widget() {
        let client = client();
        let name = test_widget_name("create");

        let resp = client
            .post(widgets_url(1))
            .json(&json!({ "name": name }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert!(resp.headers().contains_key("x-request-id"));

        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["data"]["name"], name.as_str());
        assert!(body["data"]["createdAt"].is_string());

        cleanup_widget(&client, body["data"]["id"].as_str().unwrap()).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_read_widget() {
        let client = client();
        let id = create_test_widget(&client, "read").await;

        let resp = client
            .get(format!("{}/{id}", widgets_url(1)))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["data"]["id"], id.as_str());

        cleanup_widget(&client, &id).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_update_widget() {
        let client = client();
        let id = create_test_widget(&client, "update").await;

        let resp = client
            .put(format!("{}/{id}", widgets_url(2)))
            .json(&json!({"name": "renamed", "color": "green"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["data"]["name"], "renamed");
        assert_eq!(body["data"]["color"], "green");

        cleanup_widget(&client, &id).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_delete_widget() {
        let client = client();
        let id = create_test_widget(&client, "delete").await;
        let url = format!("{}/{id}", widgets_url(1));

        let resp = client.delete(&url).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = client.get(&url).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_hide_color_before_version_two() {
        let client = client();
        let resp = client
            .post(widgets_url(1))
            .json(&json!({"name": test_widget_name("color"), "color": "red"}))
            .send()
            .await
            .unwrap();
        let body: Value = resp.json().await.unwrap();
        assert!(body["data"].get("color").is_none());
        let id = body["data"]["id"].as_str().unwrap().to_owned();

        let resp = client
            .get(format!("{}/{id}", widgets_url(2)))
            .send()
            .await
            .unwrap();
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["data"]["color"], "red");

        cleanup_widget(&client, &id).await;
    }
}
