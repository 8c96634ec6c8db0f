//! HTTP service exposing the document database.
//!
//! This is the backend the [`RemoteStore`](crate::store::RemoteStore) talks
//! to. Collections are schema-less: any JSON object can be stored, and only
//! the client decides what a valid note looks like.

mod handlers;
pub mod middleware;

use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use notes_core::db::Database;

pub use middleware::SecurityConfig;

/// Router with authentication disabled, for local use and tests.
pub fn create_router(db: Database) -> Router {
    create_router_with_config(db, SecurityConfig::disabled())
}

pub fn create_router_with_config(db: Database, security: SecurityConfig) -> Router {
    let documents = Router::new()
        .route(
            "/collections/{collection}/documents",
            get(handlers::list_documents).post(handlers::create_document),
        )
        .route(
            "/collections/{collection}/documents/{id}",
            get(handlers::get_document)
                .patch(handlers::merge_document)
                .delete(handlers::delete_document),
        )
        .route_layer(from_fn_with_state(
            security.clone(),
            middleware::auth_middleware,
        ));

    let api = documents.route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&security)),
        )
        .with_state(db)
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    match &security.cors_origins {
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None => CorsLayer::permissive(),
    }
}
