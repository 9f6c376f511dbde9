//! Transferências de estoque entre filiais de uma rede de farmácias (multi-tenant).

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod common;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use crate::{config::AppState, docs::ApiDoc, middleware::auth::tenant_guard};

/// Monta o router completo: rotas públicas, rotas protegidas (JWT + X-Tenant-ID) e o Swagger.
pub fn router(app_state: AppState) -> Router {
    let branch_routes = Router::new()
        .route(
            "/",
            post(handlers::branches::create_branch).get(handlers::branches::list_branches),
        )
        .route(
            "/{id}",
            get(handlers::branches::get_branch)
                .put(handlers::branches::update_branch)
                .delete(handlers::branches::delete_branch),
        );

    let stock_routes = Router::new()
        .route("/", get(handlers::stock::list_stock))
        .route("/entries", post(handlers::stock::assign_stock))
        .route("/{branch_id}/{product_id}", get(handlers::stock::get_stock));

    let transfer_routes = Router::new()
        .route(
            "/",
            post(handlers::transfers::create_transfer).get(handlers::transfers::list_transfers),
        )
        .route("/{id}", get(handlers::transfers::get_transfer))
        .route("/{id}/approve", post(handlers::transfers::approve_transfer))
        .route("/{id}/ship", post(handlers::transfers::ship_transfer))
        .route("/{id}/receive", post(handlers::transfers::receive_transfer))
        .route("/{id}/cancel", post(handlers::transfers::cancel_transfer));

    // Tudo abaixo exige Bearer + X-Tenant-ID
    let protected = Router::new()
        .nest("/branches", branch_routes)
        .nest("/stock", stock_routes)
        .nest("/transfers", transfer_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            tenant_guard,
        ));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api", protected)
        .with_state(app_state)
}
