//! HTTP request handlers with OpenAPI documentation.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;
use utoipa::OpenApi;

use crate::app::AppState;
use crate::domain::{
    AppError, DatabaseError, ErrorDetail, ErrorResponse, EventResponse, ExternalServiceError,
    HealthResponse, HealthStatus, NewUserEvent, Order, OrderStatus, PlaceOrderRequest,
    PlaceOrderResponse, Quote, QuoteRequest, SwapEvent, WalletError,
};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Reward Relayer API",
        version = "0.1.0",
        description = "Event intake for token rewards, swaps and G1 to GX orders",
        license(
            name = "MIT"
        )
    ),
    paths(
        new_user_event_handler,
        swap_event_handler,
        create_quote_handler,
        get_quote_handler,
        list_user_quotes_handler,
        place_order_handler,
        get_order_handler,
        health_check_handler,
        liveness_handler,
        readiness_handler,
    ),
    components(
        schemas(
            NewUserEvent,
            SwapEvent,
            EventResponse,
            QuoteRequest,
            Quote,
            PlaceOrderRequest,
            PlaceOrderResponse,
            Order,
            OrderStatus,
            HealthResponse,
            HealthStatus,
            ErrorResponse,
            ErrorDetail,
        )
    ),
    tags(
        (name = "events", description = "Inbound event delivery"),
        (name = "orders", description = "Quotes and orders"),
        (name = "health", description = "Health check endpoints")
    )
)]
pub struct ApiDoc;

/// Deliver a new-user event
///
/// Pays every requested sign-up reward and records the user once all of
/// them succeeded. `success: false` asks the delivery layer to redeliver the
/// same event later; rewards already paid are not paid again.
#[utoipa::path(
    post,
    path = "/events/new-user",
    tag = "events",
    request_body = NewUserEvent,
    responses(
        (status = 200, description = "Event handled; check `success`", body = EventResponse)
    )
)]
pub async fn new_user_event_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewUserEvent>,
) -> Json<EventResponse> {
    let success = state.rewards.handle_new_user(&payload).await;
    Json(EventResponse { success })
}

/// Deliver a swap event
#[utoipa::path(
    post,
    path = "/events/swap",
    tag = "events",
    request_body = SwapEvent,
    responses(
        (status = 200, description = "Event handled; check `success`", body = EventResponse)
    )
)]
pub async fn swap_event_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SwapEvent>,
) -> Json<EventResponse> {
    let success = state.swaps.handle_swap(&payload).await;
    Json(EventResponse { success })
}

/// Create a conversion quote
#[utoipa::path(
    post,
    path = "/quotes",
    tag = "orders",
    request_body = QuoteRequest,
    responses(
        (status = 200, description = "Quote created", body = Quote),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn create_quote_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QuoteRequest>,
) -> Result<Json<Quote>, AppError> {
    let quote = state.orders.create_quote(payload).await?;
    Ok(Json(quote))
}

/// Get a quote by ID
#[utoipa::path(
    get,
    path = "/quotes/{id}",
    tag = "orders",
    params(
        ("id" = String, Path, description = "Quote ID")
    ),
    responses(
        (status = 200, description = "Quote found", body = Quote),
        (status = 404, description = "Quote not found", body = ErrorResponse)
    )
)]
pub async fn get_quote_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Quote>, AppError> {
    let quote = state
        .orders
        .get_quote(&id)
        .await?
        .ok_or(AppError::Database(DatabaseError::NotFound(id)))?;
    Ok(Json(quote))
}

/// List a user's quotes, newest first
#[utoipa::path(
    get,
    path = "/users/{id}/quotes",
    tag = "orders",
    params(
        ("id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Quotes for the user", body = Vec<Quote>)
    )
)]
pub async fn list_user_quotes_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Quote>>, AppError> {
    let quotes = state.orders.list_quotes_for_user(&id).await?;
    Ok(Json(quotes))
}

/// Place an order against a quote
///
/// Runs the G1 leg of the order. Placing the same quote again while the
/// order is in progress or done reports it as already being processed.
#[utoipa::path(
    post,
    path = "/orders",
    tag = "orders",
    request_body = PlaceOrderRequest,
    responses(
        (status = 200, description = "Order outcome; check `success`", body = PlaceOrderResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn place_order_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PlaceOrderRequest>,
) -> Result<Json<PlaceOrderResponse>, AppError> {
    let outcome = state.orders.place_order(payload).await?;
    Ok(Json(outcome.into()))
}

/// Get an order by ID
#[utoipa::path(
    get,
    path = "/orders/{id}",
    tag = "orders",
    params(
        ("id" = String, Path, description = "Order ID (same as the quote ID)")
    ),
    responses(
        (status = 200, description = "Order found", body = Order),
        (status = 404, description = "Order not found", body = ErrorResponse)
    )
)]
pub async fn get_order_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .orders
        .get_order(&id)
        .await?
        .ok_or(AppError::Database(DatabaseError::NotFound(id)))?;
    Ok(Json(order))
}

/// Detailed health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Health status", body = HealthResponse)
    )
)]
pub async fn health_check_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let health = state.health_check().await;
    Json(health)
}

/// Kubernetes liveness probe
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "health",
    responses(
        (status = 200, description = "Application is alive")
    )
)]
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

/// Kubernetes readiness probe
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "health",
    responses(
        (status = 200, description = "Application is ready to serve traffic"),
        (status = 503, description = "Application is not ready")
    )
)]
pub async fn readiness_handler(State(state): State<Arc<AppState>>) -> StatusCode {
    let health = state.health_check().await;
    match health.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_type) = match &self {
            AppError::Database(db_err) => match db_err {
                DatabaseError::Connection(_) => (StatusCode::SERVICE_UNAVAILABLE, "database_error"),
                DatabaseError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                DatabaseError::Duplicate(_) => (StatusCode::CONFLICT, "duplicate"),
                DatabaseError::StaleWrite(_) => (StatusCode::CONFLICT, "conflict"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            },
            AppError::Wallet(wallet_err) => match wallet_err {
                WalletError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
                WalletError::ResolutionFailed(_) => (StatusCode::BAD_GATEWAY, "wallet_error"),
                _ => (StatusCode::SERVICE_UNAVAILABLE, "wallet_error"),
            },
            AppError::ExternalService(ext_err) => match ext_err {
                ExternalServiceError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
                _ => (StatusCode::BAD_GATEWAY, "external_service_error"),
            },
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error"),
            AppError::Serialization(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "serialization_error")
            }
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            AppError::NotSupported(_) => (StatusCode::NOT_IMPLEMENTED, "not_supported"),
        };

        // Server-side detail stays in the logs
        let message = if status.is_server_error() {
            error!(error_type = %error_type, error = %self, "Server error");
            status
                .canonical_reason()
                .unwrap_or("Server error")
                .to_string()
        } else {
            self.to_string()
        };

        let body = Json(ErrorResponse {
            error: ErrorDetail {
                r#type: error_type.to_string(),
                message,
            },
        });

        (status, body).into_response()
    }
}
