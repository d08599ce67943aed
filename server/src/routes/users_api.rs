use axum::{
    Json,
    extract::State,
    http::{Method, StatusCode},
};
use entity::users;
use platform_api::{ApiError, ApiResult, Page, PageParams};
use platform_authz::Policy;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{auth::new_user, db_error, icontains, paginate, write_error};
use crate::{
    extract::{Caller, JsonBody, PathParams, QueryParams},
    http::AppState,
    validate::{self, PERSON_NAME_MAX},
};

const DUPLICATE_USER: &str = "a user with that username or email already exists";

#[derive(Debug, Serialize)]
pub struct UserView {
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    bio: String,
    role: users::Role,
}

impl From<users::Model> for UserView {
    fn from(user: users::Model) -> Self {
        Self {
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            bio: user.bio,
            role: user.role,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    search: Option<String>,
    page: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserPayload {
    username: Option<String>,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    bio: Option<String>,
    role: Option<users::Role>,
}

pub async fn list(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    QueryParams(query): QueryParams<UserQuery>,
) -> ApiResult<Json<Page<UserView>>> {
    caller.authorize(Policy::AdminOnly, &method)?;
    let mut select = users::Entity::find().order_by_asc(users::Column::Username);
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        select = select.filter(icontains(users::Column::Username, search));
    }
    let params = PageParams { page: query.page };
    let page = paginate(&state.db, select, params, state.page_size()).await?;
    Ok(Json(page.map(UserView::from)))
}

pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    body: JsonBody<UserPayload>,
) -> ApiResult<(StatusCode, Json<UserView>)> {
    caller.authorize(Policy::AdminOnly, &method)?;
    let body = body.parse()?;
    let username = validate::username(&validate::required("username", body.username.clone())?)?;
    let email = validate::email(&validate::required("email", body.email.clone())?)?;

    let taken = users::Entity::find()
        .filter(
            users::Column::Username
                .eq(username.as_str())
                .or(users::Column::Email.eq(email.as_str())),
        )
        .one(&state.db)
        .await
        .map_err(db_error)?;
    if taken.is_some() {
        return Err(ApiError::validation(DUPLICATE_USER));
    }

    let active = apply(new_user(&username, &email), body, true)?;
    let user = active
        .insert(&state.db)
        .await
        .map_err(write_error(DUPLICATE_USER))?;
    info!(user_id = user.id, role = ?user.role, "user created by admin");
    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn retrieve(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    PathParams(username): PathParams<String>,
) -> ApiResult<Json<UserView>> {
    caller.authorize(Policy::AdminOnly, &method)?;
    let user = find_by_username(&state, &username).await?;
    Ok(Json(user.into()))
}

pub async fn update(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    PathParams(username): PathParams<String>,
    body: JsonBody<UserPayload>,
) -> ApiResult<Json<UserView>> {
    caller.authorize(Policy::AdminOnly, &method)?;
    let user = find_by_username(&state, &username).await?;
    let user = save(&state, user, body.parse()?, true).await?;
    Ok(Json(user.into()))
}

pub async fn destroy(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    PathParams(username): PathParams<String>,
) -> ApiResult<StatusCode> {
    caller.authorize(Policy::AdminOnly, &method)?;
    let user = find_by_username(&state, &username).await?;
    let user_id = user.id;
    user.delete(&state.db).await.map_err(db_error)?;
    info!(user_id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(caller: Caller) -> ApiResult<Json<UserView>> {
    let user = caller.require_user()?;
    Ok(Json(user.clone().into()))
}

/// Self-service edit; a submitted `role` is ignored.
pub async fn update_me(
    State(state): State<AppState>,
    caller: Caller,
    body: JsonBody<UserPayload>,
) -> ApiResult<Json<UserView>> {
    let user = caller.require_user()?.clone();
    let user = save(&state, user, body.parse()?, false).await?;
    Ok(Json(user.into()))
}

async fn find_by_username(state: &AppState, username: &str) -> ApiResult<users::Model> {
    users::Entity::find()
        .filter(users::Column::Username.eq(username))
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or(ApiError::NotFound("user"))
}

async fn save(
    state: &AppState,
    user: users::Model,
    body: UserPayload,
    allow_role: bool,
) -> ApiResult<users::Model> {
    let active = apply(user.clone().into_active_model(), body, allow_role)?;
    if !active.is_changed() {
        return Ok(user);
    }
    active
        .update(&state.db)
        .await
        .map_err(write_error(DUPLICATE_USER))
}

fn apply(
    mut active: users::ActiveModel,
    body: UserPayload,
    allow_role: bool,
) -> ApiResult<users::ActiveModel> {
    if let Some(username) = body.username {
        active.username = Set(validate::username(&username)?);
    }
    if let Some(email) = body.email {
        active.email = Set(validate::email(&email)?);
    }
    if let Some(first_name) = body.first_name {
        validate::max_len("first_name", &first_name, PERSON_NAME_MAX)?;
        active.first_name = Set(first_name);
    }
    if let Some(last_name) = body.last_name {
        validate::max_len("last_name", &last_name, PERSON_NAME_MAX)?;
        active.last_name = Set(last_name);
    }
    if let Some(bio) = body.bio {
        active.bio = Set(bio);
    }
    if let Some(role) = body.role.filter(|_| allow_role) {
        active.role = Set(role);
    }
    Ok(active)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored() -> users::Model {
        users::Model {
            id: 7,
            username: "ada".into(),
            email: "ada@example.test".into(),
            first_name: String::new(),
            last_name: String::new(),
            bio: String::new(),
            role: users::Role::User,
            is_staff: false,
            is_superuser: false,
            is_active: true,
            date_joined: chrono::Utc::now().fixed_offset(),
        }
    }

    #[test]
    fn self_edit_drops_role() {
        let body = UserPayload {
            bio: Some("new".into()),
            role: Some(users::Role::Admin),
            ..Default::default()
        };
        let active = apply(stored().into_active_model(), body, false).unwrap();
        assert_eq!(active.bio, Set("new".to_string()));
        assert!(!active.role.is_set());
    }

    #[test]
    fn admin_edit_sets_role() {
        let body = UserPayload {
            role: Some(users::Role::Moderator),
            ..Default::default()
        };
        let active = apply(stored().into_active_model(), body, true).unwrap();
        assert_eq!(active.role, Set(users::Role::Moderator));
    }

    #[test]
    fn invalid_username_is_rejected() {
        let body = UserPayload {
            username: Some("me".into()),
            ..Default::default()
        };
        assert!(apply(stored().into_active_model(), body, true).is_err());
    }
}
