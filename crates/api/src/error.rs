//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cart::CartError;
use common::ErrorKind;
use orders::OrderError;

/// API-level error type that maps to HTTP responses.
///
/// Business errors surface their own message; infrastructure errors are
/// logged and replaced with a generic body so storage details never leak
/// to clients.
#[derive(Debug)]
pub enum ApiError {
    /// Cart engine error.
    Cart(CartError),
    /// Order core error.
    Order(OrderError),
    /// Malformed request from the client.
    BadRequest(String),
}

fn kind_to_status(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Infrastructure => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Cart(err) => (kind_to_status(err.kind()), err.to_string()),
            ApiError::Order(err) => (kind_to_status(err.kind()), err.to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %message, "internal server error");
            "internal server error".to_string()
        } else {
            message
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

impl From<CartError> for ApiError {
    fn from(err: CartError) -> Self {
        ApiError::Cart(err)
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        ApiError::Order(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::OrderId;

    #[test]
    fn statuses_follow_the_error_kind() {
        assert_eq!(kind_to_status(ErrorKind::Validation), StatusCode::BAD_REQUEST);
        assert_eq!(kind_to_status(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(kind_to_status(ErrorKind::Conflict), StatusCode::CONFLICT);
        assert_eq!(
            kind_to_status(ErrorKind::Infrastructure),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn conflict_maps_to_409() {
        let err = ApiError::Order(OrderError::PaymentReferenceAttached(OrderId::new()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
