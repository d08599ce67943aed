use std::sync::Arc;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use platform_authz::AuthzError;
use serde::Serialize;
use thiserror::Error;

mod pagination;

pub use pagination::{Page, PageParams};

/// Shared HTTP result type.
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error, Clone)]
pub enum ApiError {
    #[error("{message}")]
    Validation {
        field: Option<&'static str>,
        message: String,
    },
    #[error("authentication credentials were not provided")]
    Unauthenticated,
    #[error("you do not have permission to perform this action")]
    PermissionDenied,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("method not allowed")]
    MethodNotAllowed,
    #[error("internal server error")]
    Internal(Arc<anyhow::Error>),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            field: None,
            message: message.into(),
        }
    }

    pub fn invalid_field(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: Some(field),
            message: message.into(),
        }
    }

    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(Arc::new(err.into()))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::PermissionDenied => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "VALIDATION",
            ApiError::Unauthenticated => "UNAUTHENTICATED",
            ApiError::PermissionDenied => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            ApiError::Internal(_) => "INTERNAL",
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self::internal(value)
    }
}

impl From<AuthzError> for ApiError {
    fn from(value: AuthzError) -> Self {
        match value {
            AuthzError::Unauthenticated => ApiError::Unauthenticated,
            AuthzError::Denied { policy, access } => {
                tracing::debug!(%policy, %access, "request denied by policy");
                ApiError::PermissionDenied
            }
            AuthzError::DuplicateReview => ApiError::validation(value.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'static str,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'a str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(cause) = &self {
            tracing::error!(error = ?cause, "request failed");
        }
        let field = match &self {
            ApiError::Validation { field, .. } => *field,
            _ => None,
        };
        let body = ErrorBody {
            code: self.code(),
            detail: self.to_string(),
            field,
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use platform_authz::{Access, Policy};
    use serde_json::Value;

    async fn render(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn internal_errors_are_masked() {
        let (status, body) = render(ApiError::internal(anyhow::anyhow!("boom"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "internal server error");
        assert_eq!(body["code"], "INTERNAL");
    }

    #[tokio::test]
    async fn validation_errors_name_the_field() {
        let (status, body) = render(ApiError::invalid_field("score", "must be 1..=10")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "score");
        assert_eq!(body["detail"], "must be 1..=10");
    }

    #[test]
    fn authz_errors_map_to_statuses() {
        assert_eq!(
            ApiError::from(AuthzError::Unauthenticated).status(),
            StatusCode::UNAUTHORIZED
        );
        let denied = AuthzError::Denied {
            policy: Policy::AdminOnly,
            access: Access::Safe,
        };
        assert_eq!(ApiError::from(denied).status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::from(AuthzError::DuplicateReview).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
