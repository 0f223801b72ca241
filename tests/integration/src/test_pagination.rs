//! List pagination integration tests.

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use serde_json::Value;

    use crate::{cleanup_widget, client, create_test_widget, widgets_url};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_follow_next_cursor_until_exhausted() {
        let client = client();
        let mut created = Vec::new();
        for _ in 0..3 {
            created.push(create_test_widget(&client, "page").await);
        }

        let mut seen = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let url = match cursor.as_deref() {
                Some(c) => format!("{}?limit=2&cursor={c}", widgets_url(1)),
                None => format!("{}?limit=2", widgets_url(1)),
            };
            let resp = client.get(url).send().await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
            let has_link = resp.headers().contains_key(reqwest::header::LINK);

            let body: Value = resp.json().await.unwrap();
            let page = body["data"].as_array().unwrap();
            assert!(page.len() <= 2);
            seen.extend(page.iter().filter_map(|w| w["id"].as_str().map(ToOwned::to_owned)));

            match body["next"].as_str() {
                Some(next) => {
                    assert!(has_link);
                    cursor = Some(next.to_owned());
                }
                None => {
                    assert!(!has_link);
                    break;
                }
            }
        }

        for id in &created {
            assert!(seen.contains(id), "widget {id} missing from listing");
            cleanup_widget(&client, id).await;
        }
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_use_default_limit_for_invalid_limit() {
        let client = client();
        let resp = client
            .get(format!("{}?limit=lots", widgets_url(1)))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        assert!(body["data"].is_array());
    }
}
