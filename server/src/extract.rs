use std::convert::Infallible;

use axum::{
    extract::{
        FromRequest, FromRequestParts, Request,
        rejection::{PathRejection, QueryRejection},
    },
    http::{HeaderMap, Method, header::AUTHORIZATION, request::Parts},
};
use entity::users;
use platform_api::{ApiError, ApiResult};
use platform_authz::{Access, Policy, Principal, Resource, Role, authorize};
use sea_orm::EntityTrait;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{http::AppState, routes::db_error};

/// JSON body whose decoding error surfaces only at [`JsonBody::parse`],
/// which handlers call after their policy checks.
pub struct JsonBody<T>(ApiResult<T>);

impl<T> JsonBody<T> {
    pub fn parse(self) -> ApiResult<T> {
        self.0
    }
}

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = axum::Json::<T>::from_request(req, state)
            .await
            .map(|axum::Json(value)| value)
            .map_err(|rejection| ApiError::validation(rejection.body_text()));
        Ok(Self(body))
    }
}

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(BodyRejection))]
pub struct QueryParams<T>(pub T);

/// Path segments that fail to parse (e.g. `/titles/abc/`) are a 404.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(BodyRejection))]
pub struct PathParams<T>(pub T);

pub struct BodyRejection(ApiError);

impl From<QueryRejection> for BodyRejection {
    fn from(rejection: QueryRejection) -> Self {
        Self(ApiError::validation(rejection.body_text()))
    }
}

impl From<PathRejection> for BodyRejection {
    fn from(_: PathRejection) -> Self {
        Self(ApiError::NotFound("resource"))
    }
}

impl axum::response::IntoResponse for BodyRejection {
    fn into_response(self) -> axum::response::Response {
        self.0.into_response()
    }
}

/// The caller of the current request. Requests without a usable bearer
/// token (missing, malformed, expired, or naming an inactive user) are
/// served as anonymous; policies then decide what anonymous may do.
pub struct Caller {
    pub principal: Principal,
    pub user: Option<users::Model>,
}

impl Caller {
    fn anonymous() -> Self {
        Self {
            principal: Principal::anonymous(),
            user: None,
        }
    }

    fn from_user(user: users::Model) -> Self {
        let principal = Principal::from_parts(
            Some(user.id),
            true,
            user.is_staff,
            user.is_superuser,
            Role::from(user.role),
        );
        Self {
            principal,
            user: Some(user),
        }
    }

    pub fn authorize(&self, policy: Policy, method: &Method) -> ApiResult<()> {
        let access = Access::for_method(method.as_str());
        authorize(policy, access, &self.principal, None).map_err(ApiError::from)
    }

    pub fn authorize_object(
        &self,
        policy: Policy,
        method: &Method,
        resource: Resource,
    ) -> ApiResult<()> {
        let access = Access::for_method(method.as_str());
        authorize(policy, access, &self.principal, Some(&resource)).map_err(ApiError::from)
    }

    pub fn require_user(&self) -> ApiResult<&users::Model> {
        self.user.as_ref().ok_or(ApiError::Unauthenticated)
    }
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(&parts.headers) else {
            return Ok(Caller::anonymous());
        };
        let user_id = match state.tokens.validate(token) {
            Ok(user_id) => user_id,
            Err(err) => {
                debug!(error = %err, "ignoring unusable bearer token");
                return Ok(Caller::anonymous());
            }
        };
        let user = users::Entity::find_by_id(user_id)
            .one(&state.db)
            .await
            .map_err(db_error)?;
        Ok(match user {
            Some(user) if user.is_active => Caller::from_user(user),
            _ => Caller::anonymous(),
        })
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_is_extracted() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic Zm9vOmJhcg=="));
        assert_eq!(bearer_token(&headers), None);
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(bearer_token(&headers), None);
    }
}
