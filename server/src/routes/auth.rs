use axum::{Json, extract::State};
use chrono::Utc;
use entity::users;
use platform_api::{ApiError, ApiResult};
use platform_authn::OutgoingMail;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{db_error, write_error};
use crate::{extract::JsonBody, http::AppState, validate};

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    username: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    username: String,
    email: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    username: Option<String>,
    confirmation_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    token: String,
}

/// Registers a user, or re-sends a code to an existing exact
/// (username, email) pair, and mails a confirmation code.
pub async fn signup(
    State(state): State<AppState>,
    body: JsonBody<SignupRequest>,
) -> ApiResult<Json<SignupResponse>> {
    let body = body.parse()?;
    let username = validate::username(&validate::required("username", body.username)?)?;
    let email = validate::email(&validate::required("email", body.email)?)?;

    let by_username = users::Entity::find()
        .filter(users::Column::Username.eq(username.as_str()))
        .one(&state.db)
        .await
        .map_err(db_error)?;
    let user = match by_username {
        Some(existing) if existing.email == email => existing,
        Some(_) => {
            return Err(ApiError::invalid_field(
                "username",
                "a user with that username already exists",
            ));
        }
        None => {
            let email_taken = users::Entity::find()
                .filter(users::Column::Email.eq(email.as_str()))
                .one(&state.db)
                .await
                .map_err(db_error)?
                .is_some();
            if email_taken {
                return Err(ApiError::invalid_field(
                    "email",
                    "a user with that email already exists",
                ));
            }
            new_user(&username, &email)
                .insert(&state.db)
                .await
                .map_err(write_error("a user with that username or email already exists"))?
        }
    };

    let code = state.codes.make_code(user.id, &user.email).map_err(ApiError::internal)?;
    let mail = OutgoingMail {
        to: user.email.clone(),
        subject: "YaMDb confirmation code".into(),
        body: format!(
            "Hello {}!\n\nYour confirmation code: {code}\n\n\
             Exchange it for an access token at /api/v1/auth/token/.",
            user.username
        ),
    };
    if let Err(err) = state.mailer.send(mail).await {
        warn!(user_id = user.id, error = %err, "confirmation mail was not delivered");
    }

    info!(user_id = user.id, username = %user.username, "signup accepted");
    Ok(Json(SignupResponse {
        username: user.username,
        email: user.email,
    }))
}

pub async fn token(
    State(state): State<AppState>,
    body: JsonBody<TokenRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let body = body.parse()?;
    let username = validate::required("username", body.username)?;
    let code = validate::required("confirmation_code", body.confirmation_code)?;

    let user = users::Entity::find()
        .filter(users::Column::Username.eq(username.trim()))
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or(ApiError::NotFound("user"))?;

    if !user.is_active || !state.codes.check_code(user.id, &user.email, code.trim()) {
        return Err(ApiError::invalid_field(
            "confirmation_code",
            "invalid or expired confirmation code",
        ));
    }

    let token = state.tokens.issue(user.id).map_err(ApiError::internal)?;
    info!(user_id = user.id, "access token issued");
    Ok(Json(TokenResponse { token }))
}

pub(crate) fn new_user(username: &str, email: &str) -> users::ActiveModel {
    users::ActiveModel {
        username: Set(username.to_string()),
        email: Set(email.to_string()),
        first_name: Set(String::new()),
        last_name: Set(String::new()),
        bio: Set(String::new()),
        role: Set(users::Role::User),
        is_staff: Set(false),
        is_superuser: Set(false),
        is_active: Set(true),
        date_joined: Set(Utc::now().fixed_offset()),
        ..Default::default()
    }
}
