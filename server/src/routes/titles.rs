use std::collections::{HashMap, HashSet};

use axum::{
    Json,
    extract::State,
    http::{Method, StatusCode},
};
use chrono::{Datelike, Utc};
use entity::{categories, genres, reviews, title_genres, titles};
use platform_api::{ApiError, ApiResult, Page, PageParams};
use platform_authz::Policy;
use platform_db::DbPool;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult, IntoActiveModel,
    ModelTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, Query},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{catalog::SlugView, db_error, icontains, paginate};
use crate::{
    extract::{Caller, JsonBody, PathParams, QueryParams},
    http::AppState,
    validate::{self, NAME_MAX},
};

const POLICY: Policy = Policy::StaffOrAdminWrite;

#[derive(Debug, Serialize)]
pub struct TitleView {
    id: i32,
    name: String,
    year: i32,
    rating: Option<i32>,
    description: Option<String>,
    genre: Vec<SlugView>,
    category: Option<SlugView>,
}

#[derive(Debug, Deserialize)]
pub struct TitleQuery {
    genre: Option<String>,
    category: Option<String>,
    year: Option<i32>,
    name: Option<String>,
    page: Option<u64>,
}

/// Write form; `genre` and `category` are slugs.
#[derive(Debug, Deserialize)]
pub struct TitlePayload {
    name: Option<String>,
    year: Option<i32>,
    description: Option<String>,
    genre: Option<Vec<String>>,
    category: Option<String>,
}

impl TitlePayload {
    fn require_complete(&self) -> ApiResult<()> {
        validate::required("name", self.name.as_ref())?;
        validate::required("year", self.year)?;
        validate::required("category", self.category.as_ref())?;
        validate::required("genre", self.genre.as_ref())?;
        Ok(())
    }
}

#[derive(Debug, FromQueryResult)]
struct RatingRow {
    title_id: i32,
    rating: Option<f64>,
}

pub async fn list(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<TitleQuery>,
) -> ApiResult<Json<Page<TitleView>>> {
    let mut select = titles::Entity::find()
        .order_by_asc(titles::Column::Name)
        .order_by_asc(titles::Column::Id);
    if let Some(name) = non_blank(&query.name) {
        select = select.filter(icontains(titles::Column::Name, name));
    }
    if let Some(year) = query.year {
        select = select.filter(titles::Column::Year.eq(year));
    }
    if let Some(category) = non_blank(&query.category) {
        select = select.filter(
            titles::Column::CategoryId.in_subquery(
                Query::select()
                    .column(categories::Column::Id)
                    .from(categories::Entity)
                    .and_where(categories::Column::Slug.eq(category))
                    .to_owned(),
            ),
        );
    }
    if let Some(genre) = non_blank(&query.genre) {
        select = select.filter(
            titles::Column::Id.in_subquery(
                Query::select()
                    .column((title_genres::Entity, title_genres::Column::TitleId))
                    .from(title_genres::Entity)
                    .inner_join(
                        genres::Entity,
                        Expr::col((genres::Entity, genres::Column::Id))
                            .equals((title_genres::Entity, title_genres::Column::GenreId)),
                    )
                    .and_where(Expr::col((genres::Entity, genres::Column::Slug)).eq(genre))
                    .to_owned(),
            ),
        );
    }

    let params = PageParams { page: query.page };
    let Page {
        count,
        next,
        previous,
        results,
    } = paginate(&state.db, select, params, state.page_size()).await?;
    Ok(Json(Page {
        count,
        next,
        previous,
        results: hydrate(&state.db, results).await?,
    }))
}

pub async fn retrieve(
    State(state): State<AppState>,
    PathParams(title_id): PathParams<i32>,
) -> ApiResult<Json<TitleView>> {
    let title = find_title(&state.db, title_id).await?;
    Ok(Json(hydrate_one(&state.db, title).await?))
}

pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    body: JsonBody<TitlePayload>,
) -> ApiResult<(StatusCode, Json<TitleView>)> {
    caller.authorize(POLICY, &method)?;
    let body = body.parse()?;
    let name = validate::text("name", &validate::required("name", body.name)?, Some(NAME_MAX))?;
    let year = validate::year(validate::required("year", body.year)?, current_year())?;
    let category = validate::required("category", body.category)?;
    let category_id = resolve_category(&state.db, &category).await?;
    let genre_ids = resolve_genres(&state.db, &validate::required("genre", body.genre)?).await?;

    let txn = state.db.begin().await.map_err(db_error)?;
    let title = titles::ActiveModel {
        name: Set(name),
        year: Set(year),
        description: Set(body.description),
        category_id: Set(Some(category_id)),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(db_error)?;
    link_genres(&txn, title.id, &genre_ids).await?;
    txn.commit().await.map_err(db_error)?;

    info!(title_id = title.id, "title created");
    Ok((StatusCode::CREATED, Json(hydrate_one(&state.db, title).await?)))
}

pub async fn update(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    PathParams(title_id): PathParams<i32>,
    body: JsonBody<TitlePayload>,
) -> ApiResult<Json<TitleView>> {
    modify(&state, &caller, &method, title_id, body, false).await
}

/// Full update: every field required on create must be present.
pub async fn replace(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    PathParams(title_id): PathParams<i32>,
    body: JsonBody<TitlePayload>,
) -> ApiResult<Json<TitleView>> {
    modify(&state, &caller, &method, title_id, body, true).await
}

async fn modify(
    state: &AppState,
    caller: &Caller,
    method: &Method,
    title_id: i32,
    body: JsonBody<TitlePayload>,
    full: bool,
) -> ApiResult<Json<TitleView>> {
    caller.authorize(POLICY, method)?;
    let title = find_title(&state.db, title_id).await?;
    let body = body.parse()?;
    if full {
        body.require_complete()?;
    }

    let mut active = title.clone().into_active_model();
    if let Some(name) = body.name {
        active.name = Set(validate::text("name", &name, Some(NAME_MAX))?);
    }
    if let Some(year) = body.year {
        active.year = Set(validate::year(year, current_year())?);
    }
    if let Some(description) = body.description {
        active.description = Set(Some(description));
    }
    if let Some(category) = body.category {
        active.category_id = Set(Some(resolve_category(&state.db, &category).await?));
    }
    let genre_ids = match body.genre {
        Some(slugs) => Some(resolve_genres(&state.db, &slugs).await?),
        None => None,
    };

    let txn = state.db.begin().await.map_err(db_error)?;
    let title = if active.is_changed() {
        active.update(&txn).await.map_err(db_error)?
    } else {
        title
    };
    if let Some(genre_ids) = genre_ids {
        title_genres::Entity::delete_many()
            .filter(title_genres::Column::TitleId.eq(title.id))
            .exec(&txn)
            .await
            .map_err(db_error)?;
        link_genres(&txn, title.id, &genre_ids).await?;
    }
    txn.commit().await.map_err(db_error)?;

    Ok(Json(hydrate_one(&state.db, title).await?))
}

pub async fn destroy(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    PathParams(title_id): PathParams<i32>,
) -> ApiResult<StatusCode> {
    caller.authorize(POLICY, &method)?;
    let title = find_title(&state.db, title_id).await?;
    title.delete(&state.db).await.map_err(db_error)?;
    info!(title_id, "title deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn find_title(db: &DbPool, title_id: i32) -> ApiResult<titles::Model> {
    titles::Entity::find_by_id(title_id)
        .one(db)
        .await
        .map_err(db_error)?
        .ok_or(ApiError::NotFound("title"))
}

fn current_year() -> i32 {
    Utc::now().year()
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

async fn resolve_category(db: &DbPool, slug: &str) -> ApiResult<i32> {
    categories::Entity::find()
        .filter(categories::Column::Slug.eq(slug.trim()))
        .one(db)
        .await
        .map_err(db_error)?
        .map(|category| category.id)
        .ok_or_else(|| {
            ApiError::invalid_field("category", format!("no category with slug \"{slug}\""))
        })
}

async fn resolve_genres(db: &DbPool, slugs: &[String]) -> ApiResult<Vec<i32>> {
    if slugs.is_empty() {
        return Err(ApiError::invalid_field("genre", "at least one genre is required"));
    }
    let wanted: HashSet<&str> = slugs.iter().map(|slug| slug.trim()).collect();
    let found = genres::Entity::find()
        .filter(genres::Column::Slug.is_in(wanted.iter().copied()))
        .all(db)
        .await
        .map_err(db_error)?;
    if let Some(missing) = wanted
        .iter()
        .find(|slug| !found.iter().any(|genre| genre.slug == **slug))
    {
        return Err(ApiError::invalid_field(
            "genre",
            format!("no genre with slug \"{missing}\""),
        ));
    }
    Ok(found.into_iter().map(|genre| genre.id).collect())
}

async fn link_genres<C>(db: &C, title_id: i32, genre_ids: &[i32]) -> ApiResult<()>
where
    C: ConnectionTrait,
{
    if genre_ids.is_empty() {
        return Ok(());
    }
    let rows = genre_ids.iter().map(|&genre_id| title_genres::ActiveModel {
        title_id: Set(title_id),
        genre_id: Set(genre_id),
    });
    title_genres::Entity::insert_many(rows)
        .exec(db)
        .await
        .map_err(db_error)?;
    Ok(())
}

async fn hydrate_one(db: &DbPool, title: titles::Model) -> ApiResult<TitleView> {
    hydrate(db, vec![title])
        .await?
        .pop()
        .ok_or(ApiError::NotFound("title"))
}

/// Attaches category, genres and rating to a page of titles with one query
/// per relation.
async fn hydrate(db: &DbPool, titles: Vec<titles::Model>) -> ApiResult<Vec<TitleView>> {
    if titles.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i32> = titles.iter().map(|title| title.id).collect();

    let category_ids: HashSet<i32> = titles.iter().filter_map(|title| title.category_id).collect();
    let categories: HashMap<i32, categories::Model> = if category_ids.is_empty() {
        HashMap::new()
    } else {
        categories::Entity::find()
            .filter(categories::Column::Id.is_in(category_ids))
            .all(db)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(|category| (category.id, category))
            .collect()
    };

    let mut genres_by_title: HashMap<i32, Vec<SlugView>> = HashMap::new();
    let links = title_genres::Entity::find()
        .filter(title_genres::Column::TitleId.is_in(ids.clone()))
        .find_also_related(genres::Entity)
        .order_by_asc(genres::Column::Name)
        .all(db)
        .await
        .map_err(db_error)?;
    for (link, genre) in links {
        if let Some(genre) = genre {
            genres_by_title
                .entry(link.title_id)
                .or_default()
                .push(genre.into());
        }
    }

    let ratings: HashMap<i32, Option<f64>> = reviews::Entity::find()
        .select_only()
        .column(reviews::Column::TitleId)
        .column_as(Expr::cust("CAST(AVG(score) AS DOUBLE PRECISION)"), "rating")
        .filter(reviews::Column::TitleId.is_in(ids))
        .group_by(reviews::Column::TitleId)
        .into_model::<RatingRow>()
        .all(db)
        .await
        .map_err(db_error)?
        .into_iter()
        .map(|row| (row.title_id, row.rating))
        .collect();

    Ok(titles
        .into_iter()
        .map(|title| TitleView {
            rating: ratings.get(&title.id).copied().flatten().map(integer_rating),
            genre: genres_by_title.remove(&title.id).unwrap_or_default(),
            category: title
                .category_id
                .and_then(|id| categories.get(&id))
                .cloned()
                .map(SlugView::from),
            id: title.id,
            name: title.name,
            year: title.year,
            description: title.description,
        })
        .collect())
}

/// Integer part of the mean score.
fn integer_rating(mean: f64) -> i32 {
    mean.trunc() as i32
}
