#[path = "tests/tests/auth.rs"]
mod auth_tests;
#[path = "tests/tests/friend.rs"]
mod friend_tests;
#[path = "tests/tests/messaging.rs"]
mod messaging_tests;

pub(crate) mod harness {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::server::config::AppConfig;
    use crate::server::router::build_router;

    pub(crate) fn test_app() -> axum::Router {
        build_router(&AppConfig::default()).expect("router builds against in-memory state")
    }

    /// Registers a fresh user and returns the decoded `TokenResponse` body.
    pub(crate) async fn register_and_login_as(app: &axum::Router, username: &str) -> Value {
        let email = format!("{username}@example.com");
        let register = Request::builder()
            .method("POST")
            .uri("/auth/register")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({
                    "username": username,
                    "email": email,
                    "password": "super-secure-password",
                    "display_name": username,
                })
                .to_string(),
            ))
            .unwrap();
        let response = app.clone().oneshot(register).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    pub(crate) async fn authed_json_request(
        app: &axum::Router,
        method: &str,
        uri: &str,
        access_token: &str,
        body: Option<Value>,
    ) -> (StatusCode, Option<Value>) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {access_token}"));
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        let request = builder
            .body(match body {
                Some(payload) => Body::from(payload.to_string()),
                None => Body::empty(),
            })
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return (status, None);
        }
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let payload = serde_json::from_slice(&bytes).ok();
        (status, payload)
    }
}
