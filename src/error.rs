//! API error taxonomy and HTTP mapping.
//!
//! Client-caused failures carry their message to the response body; unexpected
//! persistence failures are logged server-side and surfaced as a generic 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Mutually exclusive boolean filters both set.
    #[error("{0}")]
    InvalidFilterCombination(String),

    /// Single-entity lookup with no matching row.
    #[error("{0}")]
    NotFound(String),

    /// Malformed input rejected before or during a transaction.
    #[error("{0}")]
    Validation(String),

    /// Unexpected persistence failure; details stay server-side.
    #[error("database error")]
    Database(#[from] sqlx::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Error::InvalidFilterCombination(msg) | Error::Validation(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Error::Database(err) => {
                tracing::error!(error = %err, "unexpected database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "statusCode": status.as_u16(),
            "message": message,
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_keep_their_message() {
        let resp = Error::NotFound("book not found".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = Error::InvalidFilterCombination("both flags set".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = Error::Validation("bad author ids".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn database_errors_are_opaque_500s() {
        let resp = Error::Database(sqlx::Error::RowNotFound).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
