use std::collections::{HashMap, HashSet};

use axum::{
    Router,
    routing::{delete, get, post},
};
use entity::users;
use platform_api::{ApiError, ApiResult, Page, PageParams};
use platform_db::{DbPool, is_unique_violation};
use sea_orm::{
    ColumnTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, Select,
    sea_query::{Expr, Func, LikeExpr, SimpleExpr},
};

use crate::http::AppState;

mod auth;
mod catalog;
mod comments;
mod reviews;
mod titles;
mod users_api;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/signup/", post(auth::signup))
        .route("/auth/token/", post(auth::token))
        .route("/users/", get(users_api::list).post(users_api::create))
        .route(
            "/users/me/",
            get(users_api::me)
                .patch(users_api::update_me)
                .put(method_not_allowed),
        )
        .route(
            "/users/{username}/",
            get(users_api::retrieve)
                .patch(users_api::update)
                .delete(users_api::destroy)
                .put(method_not_allowed),
        )
        .route(
            "/categories/",
            get(catalog::list_categories).post(catalog::create_category),
        )
        .route("/categories/{slug}/", delete(catalog::delete_category))
        .route(
            "/genres/",
            get(catalog::list_genres).post(catalog::create_genre),
        )
        .route("/genres/{slug}/", delete(catalog::delete_genre))
        .route("/titles/", get(titles::list).post(titles::create))
        .route(
            "/titles/{title_id}/",
            get(titles::retrieve)
                .put(titles::replace)
                .patch(titles::update)
                .delete(titles::destroy),
        )
        .route(
            "/titles/{title_id}/reviews/",
            get(reviews::list).post(reviews::create),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/",
            get(reviews::retrieve)
                .put(reviews::replace)
                .patch(reviews::update)
                .delete(reviews::destroy),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments/",
            get(comments::list).post(comments::create),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments/{comment_id}/",
            get(comments::retrieve)
                .put(comments::replace)
                .patch(comments::update)
                .delete(comments::destroy),
        )
}

/// Full replacement is not offered where partial updates are the contract.
async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

pub(crate) fn db_error(err: DbErr) -> ApiError {
    ApiError::internal(err)
}

/// Maps a unique-index rejection to `Conflict`; everything else is internal.
pub(crate) fn write_error(conflict: &str) -> impl Fn(DbErr) -> ApiError + '_ {
    move |err| {
        if is_unique_violation(&err) {
            ApiError::Conflict(conflict.to_string())
        } else {
            db_error(err)
        }
    }
}

pub(crate) async fn paginate<E>(
    db: &DbPool,
    select: Select<E>,
    params: PageParams,
    page_size: u64,
) -> ApiResult<Page<E::Model>>
where
    E: EntityTrait,
    E::Model: Sync + 'static,
{
    params.index()?;
    let paginator = select.paginate(db, page_size);
    let count = paginator.num_items().await.map_err(db_error)?;
    let index = params.index_within(count, page_size)?;
    let results = paginator.fetch_page(index).await.map_err(db_error)?;
    Ok(Page::new(results, count, index, page_size))
}

/// Case-insensitive substring match with `%`, `_` and `\` in `needle`
/// taken literally. Behaves the same on PostgreSQL and SQLite.
pub(crate) fn icontains<C>(column: C, needle: &str) -> SimpleExpr
where
    C: ColumnTrait,
{
    let pattern = format!("%{}%", escape_like(&needle.to_lowercase()));
    Expr::expr(Func::lower(Expr::col(column))).like(LikeExpr::new(pattern).escape('\\'))
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Usernames for a batch of author ids.
pub(crate) async fn usernames<I>(db: &DbPool, ids: I) -> ApiResult<HashMap<i32, String>>
where
    I: IntoIterator<Item = i32>,
{
    let ids: HashSet<i32> = ids.into_iter().collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = users::Entity::find()
        .filter(users::Column::Id.is_in(ids))
        .all(db)
        .await
        .map_err(db_error)?;
    Ok(rows.into_iter().map(|user| (user.id, user.username)).collect())
}
