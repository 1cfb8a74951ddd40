#[cfg(test)]
mod test {
    use reqwest::StatusCode;
    use serde_json::Value;

    use crate::tests::common::*;

    async fn app() -> TestApp {
        // token routes never dial the provider
        let config = test_config("ws://127.0.0.1:9/v1/listen", None).await;
        TestApp::spawn(&config).await
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn issues_token_for_valid_request() {
        let app = app().await;
        let client = build_reqwest_client();

        // ----------------------------
        // 1. Valid secret and session id
        // ----------------------------
        let res = client
            .post(app.url("/stt/token"))
            .header("x-shared-secret", TEST_SECRET)
            .json(&json!({ "sessionId": "MIS-42" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let body: Value = res.json().await.unwrap();
        assert_eq!(body["ok"], json!(true));
        assert_eq!(body["expiresInSec"], json!(600));
        let token = body["token"].as_str().unwrap();
        assert!(!token.is_empty());

        // ----------------------------
        // 2. Stored under the trimmed session id
        // ----------------------------
        assert!(app.state.store.contains(token).await);
        assert_eq!(app.state.store.len().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn tokens_are_distinct_per_request() {
        let app = app().await;
        let first = app.issue_token("MIS-42").await;
        let second = app.issue_token("MIS-42").await;
        assert_ne!(first, second);
        assert_eq!(app.state.store.len().await, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn rejects_missing_or_wrong_secret() {
        let app = app().await;
        let client = build_reqwest_client();

        let res = client
            .post(app.url("/stt/token"))
            .json(&json!({ "sessionId": "MIS-42" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], json!("unauthorized"));

        let res = client
            .post(app.url("/stt/token"))
            .header("x-shared-secret", "not-the-secret")
            .json(&json!({ "sessionId": "MIS-42" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        // nothing was issued
        assert!(app.state.store.is_empty().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn rejects_blank_or_missing_session_id() {
        let app = app().await;
        let client = build_reqwest_client();

        for payload in [json!({ "sessionId": "   " }), json!({ "sessionId": "" }), json!({})] {
            let res = client
                .post(app.url("/stt/token"))
                .header("x-shared-secret", TEST_SECRET)
                .json(&payload)
                .send()
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::BAD_REQUEST, "payload {}", payload);
            let body: Value = res.json().await.unwrap();
            assert_eq!(body["error"], json!("invalid_argument"));
        }

        let res = client
            .post(app.url("/stt/token"))
            .header("x-shared-secret", TEST_SECRET)
            .header("Content-Type", "application/json")
            .body("not json")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        assert!(app.state.store.is_empty().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn health_and_metrics_are_open() {
        let app = app().await;
        let client = build_reqwest_client();
        app.issue_token("MIS-7").await;

        let res = client.get(app.url("/health")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.text().await.unwrap(), "OK");

        let res = client.get(app.url("/metrics")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let text = res.text().await.unwrap();
        assert!(text.contains("interviewrelay_tokens_issued_total"), "metrics: {}", text);
    }
}
