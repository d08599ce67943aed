use axum::{
    Json,
    extract::State,
    http::{Method, StatusCode},
};
use chrono::Utc;
use entity::reviews;
use platform_api::{ApiError, ApiResult, Page, PageParams};
use platform_authz::{Policy, Resource, validate_create};
use platform_db::DbPool;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, ModelTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{db_error, paginate, titles::find_title, usernames, write_error};
use crate::{
    extract::{Caller, JsonBody, PathParams, QueryParams},
    http::AppState,
    validate,
};

pub(crate) const POLICY: Policy = Policy::AuthorOrModeratorOrAdmin;
const DUPLICATE_REVIEW: &str = "you can only leave one review per title";

#[derive(Debug, Serialize)]
pub struct ReviewView {
    id: i32,
    text: String,
    author: String,
    score: i32,
    pub_date: chrono::DateTime<chrono::FixedOffset>,
}

impl ReviewView {
    fn new(review: reviews::Model, author: String) -> Self {
        Self {
            id: review.id,
            text: review.text,
            author,
            score: review.score,
            pub_date: review.pub_date,
        }
    }
}

/// `author` and `title` are never taken from the body.
#[derive(Debug, Deserialize)]
pub struct ReviewPayload {
    text: Option<String>,
    score: Option<i32>,
}

pub async fn list(
    State(state): State<AppState>,
    PathParams(title_id): PathParams<i32>,
    QueryParams(params): QueryParams<PageParams>,
) -> ApiResult<Json<Page<ReviewView>>> {
    find_title(&state.db, title_id).await?;
    let select = reviews::Entity::find()
        .filter(reviews::Column::TitleId.eq(title_id))
        .order_by_desc(reviews::Column::PubDate)
        .order_by_desc(reviews::Column::Id);
    let page = paginate(&state.db, select, params, state.page_size()).await?;
    let mut names = usernames(&state.db, page.results.iter().map(|r| r.author_id)).await?;
    Ok(Json(page.map(|review| {
        let author = names.remove(&review.author_id).unwrap_or_default();
        ReviewView::new(review, author)
    })))
}

pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    PathParams(title_id): PathParams<i32>,
    body: JsonBody<ReviewPayload>,
) -> ApiResult<(StatusCode, Json<ReviewView>)> {
    caller.authorize(POLICY, &method)?;
    let author = caller.require_user()?;
    let title = find_title(&state.db, title_id).await?;
    let body = body.parse()?;

    let existing: Vec<i32> = reviews::Entity::find()
        .select_only()
        .column(reviews::Column::AuthorId)
        .filter(reviews::Column::TitleId.eq(title.id))
        .into_tuple()
        .all(&state.db)
        .await
        .map_err(db_error)?;
    validate_create(&caller.principal, existing)?;

    let text = validate::text("text", &validate::required("text", body.text)?, None)?;
    let score = validate::score(validate::required("score", body.score)?)?;
    let review = reviews::ActiveModel {
        title_id: Set(title.id),
        author_id: Set(author.id),
        text: Set(text),
        score: Set(score),
        pub_date: Set(Utc::now().fixed_offset()),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(write_error(DUPLICATE_REVIEW))?;

    info!(review_id = review.id, title_id, author_id = author.id, "review created");
    Ok((
        StatusCode::CREATED,
        Json(ReviewView::new(review, author.username.clone())),
    ))
}

pub async fn retrieve(
    State(state): State<AppState>,
    PathParams((title_id, review_id)): PathParams<(i32, i32)>,
) -> ApiResult<Json<ReviewView>> {
    let review = find_review(&state.db, title_id, review_id).await?;
    let author = author_name(&state.db, review.author_id).await?;
    Ok(Json(ReviewView::new(review, author)))
}

pub async fn update(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    PathParams((title_id, review_id)): PathParams<(i32, i32)>,
    body: JsonBody<ReviewPayload>,
) -> ApiResult<Json<ReviewView>> {
    modify(&state, &caller, &method, (title_id, review_id), body, false).await
}

pub async fn replace(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    PathParams(ids): PathParams<(i32, i32)>,
    body: JsonBody<ReviewPayload>,
) -> ApiResult<Json<ReviewView>> {
    modify(&state, &caller, &method, ids, body, true).await
}

async fn modify(
    state: &AppState,
    caller: &Caller,
    method: &Method,
    (title_id, review_id): (i32, i32),
    body: JsonBody<ReviewPayload>,
    full: bool,
) -> ApiResult<Json<ReviewView>> {
    caller.authorize(POLICY, method)?;
    let review = find_review(&state.db, title_id, review_id).await?;
    caller.authorize_object(POLICY, method, Resource::authored_by(review.author_id))?;
    let body = body.parse()?;
    if full {
        validate::required("text", body.text.as_ref())?;
        validate::required("score", body.score)?;
    }

    let mut active = review.clone().into_active_model();
    if let Some(text) = body.text {
        active.text = Set(validate::text("text", &text, None)?);
    }
    if let Some(score) = body.score {
        active.score = Set(validate::score(score)?);
    }
    let review = if active.is_changed() {
        active.update(&state.db).await.map_err(db_error)?
    } else {
        review
    };
    let author = author_name(&state.db, review.author_id).await?;
    Ok(Json(ReviewView::new(review, author)))
}

pub async fn destroy(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    PathParams((title_id, review_id)): PathParams<(i32, i32)>,
) -> ApiResult<StatusCode> {
    caller.authorize(POLICY, &method)?;
    let review = find_review(&state.db, title_id, review_id).await?;
    caller.authorize_object(POLICY, &method, Resource::authored_by(review.author_id))?;
    review.delete(&state.db).await.map_err(db_error)?;
    info!(review_id, title_id, "review deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// A review addressed through a title it does not belong to is a 404.
pub(crate) async fn find_review(
    db: &DbPool,
    title_id: i32,
    review_id: i32,
) -> ApiResult<reviews::Model> {
    reviews::Entity::find_by_id(review_id)
        .filter(reviews::Column::TitleId.eq(title_id))
        .one(db)
        .await
        .map_err(db_error)?
        .ok_or(ApiError::NotFound("review"))
}

pub(crate) async fn author_name(db: &DbPool, author_id: i32) -> ApiResult<String> {
    Ok(usernames(db, [author_id])
        .await?
        .remove(&author_id)
        .unwrap_or_default())
}
