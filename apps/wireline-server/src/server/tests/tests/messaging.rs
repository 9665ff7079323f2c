use axum::http::StatusCode;
use serde_json::json;

use crate::server::tests::harness::{authed_json_request, register_and_login_as, test_app};

async fn befriend(app: &axum::Router, alice_token: &str, bob_token: &str) {
    authed_json_request(
        app,
        "POST",
        "/users/friends/request",
        alice_token,
        Some(json!({"username": "bob"})),
    )
    .await;
    authed_json_request(
        app,
        "POST",
        "/users/friends/request",
        bob_token,
        Some(json!({"username": "alice"})),
    )
    .await;
}

#[tokio::test]
async fn sending_a_message_requires_friendship() {
    let app = test_app();
    let alice = register_and_login_as(&app, "alice").await;
    register_and_login_as(&app, "bob").await;
    let alice_token = alice["access_token"].as_str().unwrap();

    let (status, _) = authed_json_request(
        &app,
        "POST",
        "/messages/",
        alice_token,
        Some(json!({"recipient_username": "bob", "text": "hi"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn message_is_buffered_and_then_acked_on_delivery() {
    let app = test_app();
    let alice = register_and_login_as(&app, "alice").await;
    let bob = register_and_login_as(&app, "bob").await;
    let alice_token = alice["access_token"].as_str().unwrap();
    let bob_token = bob["access_token"].as_str().unwrap();
    befriend(&app, alice_token, bob_token).await;

    let (status, body) = authed_json_request(
        &app,
        "POST",
        "/messages/",
        alice_token,
        Some(json!({"recipient_username": "bob", "text": "hello bob"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let message_id = body.unwrap()["id"].as_str().unwrap().to_string();

    let (status, body) = authed_json_request(&app, "GET", "/messages/pending", bob_token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap().as_array().unwrap().len(), 1);

    let (status, _) = authed_json_request(
        &app,
        "POST",
        &format!("/messages/delivered/{message_id}"),
        bob_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = authed_json_request(&app, "GET", "/messages/pending", bob_token, None).await;
    assert!(body.unwrap().as_array().unwrap().is_empty());
}

#[tokio::test]
async fn only_the_recipient_may_acknowledge_delivery() {
    let app = test_app();
    let alice = register_and_login_as(&app, "alice").await;
    let bob = register_and_login_as(&app, "bob").await;
    let alice_token = alice["access_token"].as_str().unwrap();
    let bob_token = bob["access_token"].as_str().unwrap();
    befriend(&app, alice_token, bob_token).await;

    let (_, body) = authed_json_request(
        &app,
        "POST",
        "/messages/",
        alice_token,
        Some(json!({"recipient_username": "bob", "text": "hello bob"})),
    )
    .await;
    let message_id = body.unwrap()["id"].as_str().unwrap().to_string();

    let (status, _) = authed_json_request(
        &app,
        "POST",
        &format!("/messages/delivered/{message_id}"),
        alice_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
