use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("invalid token")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("password hashing failed")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) | AppError::Token(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Hash(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            match &self {
                AppError::Database(e) => tracing::error!(error = %e, "storage failure"),
                AppError::Hash(e) => tracing::error!(error = %e, "hashing failure"),
                AppError::Internal(e) => tracing::error!(error = %e, "internal error"),
                _ => {}
            }
        }

        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        let cases = [
            (AppError::Validation("missing unit id".into()), StatusCode::BAD_REQUEST),
            (AppError::Unauthorized("bad credentials".into()), StatusCode::UNAUTHORIZED),
            (AppError::NotFound("course"), StatusCode::NOT_FOUND),
            (AppError::Database(sqlx::Error::PoolClosed), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
