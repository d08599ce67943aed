use axum::{
    Json,
    extract::State,
    http::{Method, StatusCode},
};
use chrono::Utc;
use entity::comments;
use platform_api::{ApiError, ApiResult, Page, PageParams};
use platform_authz::{Resource, assign_author_on_create};
use platform_db::DbPool;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{
    db_error, paginate,
    reviews::{POLICY, author_name, find_review},
    usernames,
};
use crate::{
    extract::{Caller, JsonBody, PathParams, QueryParams},
    http::AppState,
    validate,
};

#[derive(Debug, Serialize)]
pub struct CommentView {
    id: i32,
    text: String,
    author: String,
    pub_date: chrono::DateTime<chrono::FixedOffset>,
    review: i32,
}

impl CommentView {
    fn new(comment: comments::Model, author: String) -> Self {
        Self {
            id: comment.id,
            text: comment.text,
            author,
            pub_date: comment.pub_date,
            review: comment.review_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CommentPayload {
    text: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    PathParams((title_id, review_id)): PathParams<(i32, i32)>,
    QueryParams(params): QueryParams<PageParams>,
) -> ApiResult<Json<Page<CommentView>>> {
    let review = find_review(&state.db, title_id, review_id).await?;
    let select = comments::Entity::find()
        .filter(comments::Column::ReviewId.eq(review.id))
        .order_by_asc(comments::Column::PubDate)
        .order_by_asc(comments::Column::Id);
    let page = paginate(&state.db, select, params, state.page_size()).await?;
    let mut names = usernames(&state.db, page.results.iter().map(|c| c.author_id)).await?;
    Ok(Json(page.map(|comment| {
        let author = names.remove(&comment.author_id).unwrap_or_default();
        CommentView::new(comment, author)
    })))
}

pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    PathParams((title_id, review_id)): PathParams<(i32, i32)>,
    body: JsonBody<CommentPayload>,
) -> ApiResult<(StatusCode, Json<CommentView>)> {
    caller.authorize(POLICY, &method)?;
    let author_id = assign_author_on_create(&caller.principal)?;
    let author = caller.require_user()?;
    let review = find_review(&state.db, title_id, review_id).await?;
    let body = body.parse()?;
    let text = validate::text("text", &validate::required("text", body.text)?, None)?;

    let comment = comments::ActiveModel {
        review_id: Set(review.id),
        author_id: Set(author_id),
        text: Set(text),
        pub_date: Set(Utc::now().fixed_offset()),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(db_error)?;

    info!(comment_id = comment.id, review_id, author_id, "comment created");
    Ok((
        StatusCode::CREATED,
        Json(CommentView::new(comment, author.username.clone())),
    ))
}

pub async fn retrieve(
    State(state): State<AppState>,
    PathParams((title_id, review_id, comment_id)): PathParams<(i32, i32, i32)>,
) -> ApiResult<Json<CommentView>> {
    let comment = find_comment(&state.db, title_id, review_id, comment_id).await?;
    let author = author_name(&state.db, comment.author_id).await?;
    Ok(Json(CommentView::new(comment, author)))
}

pub async fn update(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    PathParams(ids): PathParams<(i32, i32, i32)>,
    body: JsonBody<CommentPayload>,
) -> ApiResult<Json<CommentView>> {
    modify(&state, &caller, &method, ids, body, false).await
}

pub async fn replace(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    PathParams(ids): PathParams<(i32, i32, i32)>,
    body: JsonBody<CommentPayload>,
) -> ApiResult<Json<CommentView>> {
    modify(&state, &caller, &method, ids, body, true).await
}

async fn modify(
    state: &AppState,
    caller: &Caller,
    method: &Method,
    (title_id, review_id, comment_id): (i32, i32, i32),
    body: JsonBody<CommentPayload>,
    full: bool,
) -> ApiResult<Json<CommentView>> {
    caller.authorize(POLICY, method)?;
    let comment = find_comment(&state.db, title_id, review_id, comment_id).await?;
    caller.authorize_object(POLICY, method, Resource::authored_by(comment.author_id))?;
    let body = body.parse()?;
    if full {
        validate::required("text", body.text.as_ref())?;
    }

    let comment = match body.text {
        Some(text) => {
            let mut active = comment.into_active_model();
            active.text = Set(validate::text("text", &text, None)?);
            active.update(&state.db).await.map_err(db_error)?
        }
        None => comment,
    };
    let author = author_name(&state.db, comment.author_id).await?;
    Ok(Json(CommentView::new(comment, author)))
}

pub async fn destroy(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    PathParams((title_id, review_id, comment_id)): PathParams<(i32, i32, i32)>,
) -> ApiResult<StatusCode> {
    caller.authorize(POLICY, &method)?;
    let comment = find_comment(&state.db, title_id, review_id, comment_id).await?;
    caller.authorize_object(POLICY, &method, Resource::authored_by(comment.author_id))?;
    comment.delete(&state.db).await.map_err(db_error)?;
    info!(comment_id, review_id, "comment deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn find_comment(
    db: &DbPool,
    title_id: i32,
    review_id: i32,
    comment_id: i32,
) -> ApiResult<comments::Model> {
    let review = find_review(db, title_id, review_id).await?;
    comments::Entity::find_by_id(comment_id)
        .filter(comments::Column::ReviewId.eq(review.id))
        .one(db)
        .await
        .map_err(db_error)?
        .ok_or(ApiError::NotFound("comment"))
}
