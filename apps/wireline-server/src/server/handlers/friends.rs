use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;

use super::super::errors::AppError;
use super::super::social::service;
use super::super::state::AppState;
use super::super::types::{
    FriendRequestCreatedResponse, FriendRequestResponse, RespondAction,
    RespondToFriendRequestRequest, SearchQuery, SendFriendRequestRequest, UserPublic,
};
use super::auth::authenticate;

pub(crate) async fn search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<UserPublic>>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    let results = service::search(&state, &query.q, &caller.username).await?;
    Ok(Json(results.iter().map(UserPublic::from).collect()))
}

pub(crate) async fn list_friends(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<UserPublic>>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    let friends = service::list_friends(&state, &caller.username).await;
    Ok(Json(friends.iter().map(UserPublic::from).collect()))
}

pub(crate) async fn send_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SendFriendRequestRequest>,
) -> Result<Json<FriendRequestCreatedResponse>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    let outcome = service::send_request(&state, &caller.username, &payload.username).await?;
    Ok(Json(FriendRequestCreatedResponse {
        id: outcome.id,
        sender_username: outcome.sender_username,
        recipient_username: outcome.recipient_username,
        status: outcome.status,
    }))
}

pub(crate) async fn respond(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RespondToFriendRequestRequest>,
) -> Result<Json<UserPublic>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    let other_party = match payload.action {
        RespondAction::Accept => {
            service::accept_request(&state, &payload.request_id, &caller.username).await?
        }
        RespondAction::Reject => {
            service::reject_request(&state, &payload.request_id, &caller.username).await?
        }
    };
    Ok(Json(UserPublic::from(&other_party)))
}

pub(crate) async fn list_received(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<FriendRequestResponse>>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    let requests = service::list_received(&state, &caller.username).await;
    Ok(Json(requests.iter().map(FriendRequestResponse::from).collect()))
}

pub(crate) async fn list_sent(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<FriendRequestResponse>>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    let requests = service::list_sent(&state, &caller.username).await;
    Ok(Json(requests.iter().map(FriendRequestResponse::from).collect()))
}
