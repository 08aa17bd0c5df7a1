pub mod assistant;
pub mod config;
pub mod csv_io;
pub mod db;
pub mod error;
pub mod extract;
pub mod mail;
pub mod middlewares;
pub mod models;
pub mod pages;
pub mod reports;
pub mod routes;
pub mod schedule;
pub mod store;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    routing::get,
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::assistant::ChatCompletion;
use crate::config::Config;
use crate::mail::Mailer;
use crate::middlewares::auth::auth_middleware;
use crate::routes::assistant::assistant_routes;
use crate::routes::auth::auth_routes;
use crate::routes::recurring::recurring_routes;
use crate::routes::reminders::reminder_routes;
use crate::routes::reports::report_routes;
use crate::routes::transactions::transaction_routes;
use crate::routes::users::user_routes;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub mailer: Arc<dyn Mailer>,
    pub assistant: Arc<dyn ChatCompletion>,
    pub config: Arc<Config>,
}

fn cors(config: &Config) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);
    match config.cors_origin.parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => {
            tracing::warn!(origin = %config.cors_origin, "ignoring unparseable CORS origin");
            layer
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let protected_api = Router::new()
        .merge(user_routes())
        .merge(transaction_routes())
        .merge(recurring_routes())
        .merge(reminder_routes())
        .merge(report_routes())
        .merge(assistant_routes())
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api_router = Router::new().merge(auth_routes()).merge(protected_api);

    Router::new()
        .route("/", get(pages::home))
        .nest("/api", api_router)
        .nest_service(
            "/assets",
            axum::routing::get_service(ServeDir::new(&state.config.assets_dir)),
        )
        .layer(DefaultBodyLimit::max(state.config.body_limit_bytes))
        .layer(cors(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
