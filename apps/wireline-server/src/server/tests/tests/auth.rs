use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::server::tests::harness::{register_and_login_as, test_app};

#[tokio::test]
async fn register_then_login_issues_bearer_tokens() {
    let app = test_app();
    let token = register_and_login_as(&app, "alice").await;
    assert_eq!(token["token_type"], "bearer");
    assert_eq!(token["username"], "alice");
    assert!(token["access_token"].as_str().unwrap().len() > 0);
    assert!(token["refresh_token"].as_str().unwrap().len() > 0);

    let login = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"email": "alice@example.com", "password": "super-secure-password"}).to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(login).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let app = test_app();
    register_and_login_as(&app, "alice").await;

    let register = Request::builder()
        .method("POST")
        .uri("/auth/register")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "username": "alice",
                "email": "someone-else@example.com",
                "password": "super-secure-password",
                "display_name": "Alice Clone",
            })
            .to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(register).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let app = test_app();
    register_and_login_as(&app, "alice").await;

    let login = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"email": "alice@example.com", "password": "totally-wrong"}).to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(login).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_mints_a_new_access_token() {
    let app = test_app();
    let token = register_and_login_as(&app, "alice").await;
    let refresh_token = token["refresh_token"].as_str().unwrap();

    let refresh = Request::builder()
        .method("POST")
        .uri("/auth/refresh")
        .header("content-type", "application/json")
        .body(Body::from(json!({"refresh_token": refresh_token}).to_string()))
        .unwrap();
    let response = app.clone().oneshot(refresh).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_ne!(body["access_token"], token["access_token"]);
}
