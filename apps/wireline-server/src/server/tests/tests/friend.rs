use axum::http::StatusCode;
use serde_json::json;

use crate::server::tests::harness::{authed_json_request, register_and_login_as, test_app};

#[tokio::test]
async fn friendship_request_acceptance_and_list_management_work() {
    let app = test_app();
    let alice = register_and_login_as(&app, "alice").await;
    let bob = register_and_login_as(&app, "bob").await;
    let alice_token = alice["access_token"].as_str().unwrap();
    let bob_token = bob["access_token"].as_str().unwrap();

    let (status, body) = authed_json_request(
        &app,
        "POST",
        "/users/friends/request",
        alice_token,
        Some(json!({"username": "bob"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["status"], "pending");
    let request_id = body["id"].as_str().unwrap().to_string();

    let (status, body) = authed_json_request(
        &app,
        "GET",
        "/users/friends/requests/received",
        bob_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap().as_array().unwrap().len(), 1);

    let (status, body) = authed_json_request(
        &app,
        "POST",
        "/users/friends/respond",
        bob_token,
        Some(json!({"request_id": request_id, "action": "accept"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["username"], "alice");

    let (status, body) = authed_json_request(&app, "GET", "/users/friends", alice_token, None).await;
    assert_eq!(status, StatusCode::OK);
    let friends = body.unwrap();
    assert_eq!(friends.as_array().unwrap().len(), 1);
    assert_eq!(friends[0]["username"], "bob");
}

#[tokio::test]
async fn reverse_pending_request_auto_accepts_without_a_second_approval() {
    let app = test_app();
    let alice = register_and_login_as(&app, "alice").await;
    let bob = register_and_login_as(&app, "bob").await;
    let alice_token = alice["access_token"].as_str().unwrap();
    let bob_token = bob["access_token"].as_str().unwrap();

    authed_json_request(
        &app,
        "POST",
        "/users/friends/request",
        alice_token,
        Some(json!({"username": "bob"})),
    )
    .await;

    let (status, body) = authed_json_request(
        &app,
        "POST",
        "/users/friends/request",
        bob_token,
        Some(json!({"username": "alice"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["status"], "accepted");

    let (_, body) = authed_json_request(&app, "GET", "/users/friends", alice_token, None).await;
    assert_eq!(body.unwrap().as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn cannot_send_friend_request_to_self() {
    let app = test_app();
    let alice = register_and_login_as(&app, "alice").await;
    let alice_token = alice["access_token"].as_str().unwrap();

    let (status, _) = authed_json_request(
        &app,
        "POST",
        "/users/friends/request",
        alice_token,
        Some(json!({"username": "alice"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rejected_request_blocks_resubmission() {
    let app = test_app();
    let alice = register_and_login_as(&app, "alice").await;
    let bob = register_and_login_as(&app, "bob").await;
    let alice_token = alice["access_token"].as_str().unwrap();
    let bob_token = bob["access_token"].as_str().unwrap();

    let (_, body) = authed_json_request(
        &app,
        "POST",
        "/users/friends/request",
        alice_token,
        Some(json!({"username": "bob"})),
    )
    .await;
    let request_id = body.unwrap()["id"].as_str().unwrap().to_string();

    authed_json_request(
        &app,
        "POST",
        "/users/friends/respond",
        bob_token,
        Some(json!({"request_id": request_id, "action": "reject"})),
    )
    .await;

    let (status, _) = authed_json_request(
        &app,
        "POST",
        "/users/friends/request",
        alice_token,
        Some(json!({"username": "bob"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}
