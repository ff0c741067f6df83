//! Router construction.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{
    ApiDoc, create_quote_handler, get_order_handler, get_quote_handler, health_check_handler,
    list_user_quotes_handler, liveness_handler, new_user_event_handler, place_order_handler,
    readiness_handler, swap_event_handler,
};
use crate::app::AppState;

/// Build the application router with docs and request tracing
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/events/new-user", post(new_user_event_handler))
        .route("/events/swap", post(swap_event_handler))
        .route("/quotes", post(create_quote_handler))
        .route("/quotes/{id}", get(get_quote_handler))
        .route("/users/{id}/quotes", get(list_user_quotes_handler))
        .route("/orders", post(place_order_handler))
        .route("/orders/{id}", get(get_order_handler))
        .route("/health", get(health_check_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler))
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
}
