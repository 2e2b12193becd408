// Copyright (c) Finsight Team
// SPDX-License-Identifier: Apache-2.0

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

/// Error taxonomy for ledger and fan-out operations
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        ServiceError::Internal(err.into())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Persistence detail stays in the log, not the response body
        let message = match &self {
            ServiceError::Internal(source) => {
                error!("internal error: {:#}", source);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_the_taxonomy() {
        let cases = [
            (
                ServiceError::Validation("bad".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServiceError::Authentication("who".into()),
                StatusCode::UNAUTHORIZED,
            ),
            (ServiceError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (
                ServiceError::NotFound("gone".into()),
                StatusCode::NOT_FOUND,
            ),
            (
                ServiceError::Internal(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.status_code(), status);
        }
    }

    #[test]
    fn internal_detail_is_not_in_the_message() {
        let err = ServiceError::Internal(anyhow::anyhow!("connection refused"));
        assert_eq!(err.to_string(), "internal error");
    }
}
