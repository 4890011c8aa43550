pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;

use axum::{http::Method, middleware::from_fn_with_state, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ServerConfig;
use crate::db::services::rbac_service::RbacService;
use crate::db::services::webhook_service::WebhookService;
use crate::webhooks::dispatcher::WebhookDispatcher;

/// Shared application state: configuration plus the explicitly constructed
/// service objects. Built once at bootstrap and cloned into handlers.
pub struct AppState {
    pub config: ServerConfig,
    pub webhook_service: WebhookService,
    pub rbac_service: RbacService,
    pub dispatcher: WebhookDispatcher,
}

async fn health_check() -> &'static str {
    "OK"
}

pub fn build_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    let protected = Router::new()
        .nest("/api/auth", routes::auth_routes::create_auth_router())
        .nest("/api/webhooks", routes::webhook_routes::create_webhook_router())
        .nest("/api/rbac", routes::rbac_routes::create_rbac_router())
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::auth::auth,
        ));

    Router::new()
        .route("/api/health", get(health_check))
        .nest("/api/auth", routes::auth_routes::create_public_auth_router())
        .merge(protected)
        .with_state(app_state)
        .layer(cors)
}

pub async fn run_http_server(
    app_state: Arc<AppState>,
    http_addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app_router = build_router(app_state);

    tracing::info!("HTTP server listening on {http_addr}");
    let listener = tokio::net::TcpListener::bind(http_addr).await?;
    axum::serve(listener, app_router).await?;
    Ok(())
}
