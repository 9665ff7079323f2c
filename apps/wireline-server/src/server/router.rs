use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::config::AppConfig;
use super::db::ensure_schema;
use super::handlers::auth::{login, refresh, register};
use super::handlers::friends::{
    list_friends, list_received, list_sent, respond, search, send_request,
};
use super::handlers::messages::{list_pending, mark_delivered, send as send_message};
use super::realtime::gateway_ws;
use super::state::AppState;

#[cfg(test)]
pub(crate) const ROUTE_MANIFEST: &[(&str, &str)] = &[
    ("POST", "/auth/register"),
    ("POST", "/auth/login"),
    ("POST", "/auth/refresh"),
    ("GET", "/users/search"),
    ("GET", "/users/friends"),
    ("POST", "/users/friends/request"),
    ("POST", "/users/friends/respond"),
    ("GET", "/users/friends/requests/received"),
    ("GET", "/users/friends/requests/sent"),
    ("POST", "/messages/"),
    ("GET", "/messages/pending"),
    ("POST", "/messages/delivered/{message_id}"),
    ("GET", "/messages/ws/{username}"),
];

/// Builds the router against a freshly constructed, not-yet-bootstrapped
/// `AppState`. Use `build_router_with_db_bootstrap` when a live database
/// schema must exist before serving traffic.
pub fn build_router(config: &AppConfig) -> anyhow::Result<Router> {
    let app_state = AppState::new(config)?;
    Ok(build_router_with_state(config, app_state))
}

/// Builds the router and fails fast if database schema bootstrap fails.
pub async fn build_router_with_db_bootstrap(config: &AppConfig) -> anyhow::Result<Router> {
    let app_state = AppState::new(config)?;
    ensure_schema(&app_state)
        .await
        .map_err(|_| anyhow::anyhow!("database schema bootstrap failed"))?;
    Ok(build_router_with_state(config, app_state))
}

fn build_cors_layer(config: &AppConfig) -> CorsLayer {
    if !config.cors_enabled {
        return CorsLayer::new();
    }
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| HeaderValue::try_from(origin.as_str()).ok())
        .collect();
    if config.cors_origins.is_empty() || config.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    CorsLayer::new().allow_origin(AllowOrigin::list(origins))
}

fn build_router_with_state(config: &AppConfig, app_state: AppState) -> Router {
    let request_id_header = HeaderName::from_static("x-request-id");
    let cors_layer = build_cors_layer(config);

    let routes = Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/users/search", get(search))
        .route("/users/friends", get(list_friends))
        .route("/users/friends/request", post(send_request))
        .route("/users/friends/respond", post(respond))
        .route("/users/friends/requests/received", get(list_received))
        .route("/users/friends/requests/sent", get(list_sent))
        .route("/messages/", post(send_message))
        .route("/messages/pending", get(list_pending))
        .route("/messages/delivered/{message_id}", post(mark_delivered))
        .route("/messages/ws/{username}", get(gateway_ws));

    routes.with_state(app_state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
            .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                config.request_timeout,
            ))
            .layer(cors_layer),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn build_router_with_db_bootstrap_fails_fast_when_schema_init_fails() {
        let result = build_router_with_db_bootstrap(&AppConfig {
            database_url: Some(String::from("postgres://127.0.0.1:1/wireline")),
            ..AppConfig::default()
        })
        .await;

        assert!(
            result.is_err(),
            "schema bootstrap failure should fail router startup"
        );
    }

    #[test]
    fn route_manifest_covers_every_documented_endpoint() {
        assert_eq!(ROUTE_MANIFEST.len(), 13);
    }
}
