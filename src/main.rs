// src/main.rs

use axum::{
    Router,
    middleware as axum_middleware,
    routing::{delete, get, put},
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use crate::middleware::auth::session_guard;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .compact()
        .init();

    // If configuration fails the application must not start.
    let app_state = AppState::new()
        .await
        .expect("failed to initialize application state");

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("failed to run database migrations");

    // Idempotent: existing slugs and customized roles are left alone.
    services::bootstrap::run(&app_state.db_pool, &app_state.rbac_repo)
        .await
        .expect("failed to seed the permission catalog");

    let permission_routes = Router::new()
        .route(
            "/",
            get(handlers::rbac::list_permissions).post(handlers::rbac::create_permission),
        )
        .route(
            "/{id}",
            put(handlers::rbac::update_permission).delete(handlers::rbac::delete_permission),
        );

    let role_routes = Router::new()
        .route(
            "/",
            get(handlers::rbac::list_roles).post(handlers::rbac::create_role),
        )
        .route(
            "/{id}",
            put(handlers::rbac::update_role).delete(handlers::rbac::delete_role),
        )
        .route(
            "/{id}/permissions",
            get(handlers::rbac::get_role_permissions).put(handlers::rbac::set_role_permissions),
        )
        .route(
            "/{id}/permissions/{permission_id}",
            delete(handlers::rbac::revoke_role_permission),
        );

    let user_routes = Router::new()
        .route("/", get(handlers::users::list_users))
        .route("/{id}/role", put(handlers::users::assign_role));

    // Every admin route sits behind the session middleware; per-route
    // permission guards run after it.
    let admin_routes = Router::new()
        .nest("/permissions", permission_routes)
        .nest("/roles", role_routes)
        .nest("/users", user_routes)
        .route("/me", get(handlers::users::get_me))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            session_guard,
        ));

    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/admin", admin_routes)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .with_state(app_state);

    let addr = AppState::bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .expect("failed to bind TCP listener");
    tracing::info!("server listening on {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.expect("axum server error");
}
