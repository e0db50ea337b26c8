use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use marketplace_core::DomainError;
use marketplace_infra::services::ServiceError;

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::Concurrency(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        ServiceError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        ServiceError::Store(msg) => {
            tracing::error!(error = %msg, "store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg)
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        DomainError::Validation(_) => json_error(StatusCode::BAD_REQUEST, "validation_error", message),
        DomainError::InvalidId(_) => json_error(StatusCode::BAD_REQUEST, "invalid_id", message),
        DomainError::InvalidState(_) => json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_state", message),
        DomainError::InsufficientStock { .. } => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "insufficient_stock", message)
        }
        DomainError::BelowMinimumQuantity { .. } => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "below_minimum_quantity", message)
        }
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", message),
        DomainError::Conflict(_) => json_error(StatusCode::CONFLICT, "conflict", message),
        DomainError::Unauthorized => json_error(StatusCode::FORBIDDEN, "unauthorized", message),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
