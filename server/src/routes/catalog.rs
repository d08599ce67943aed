//! Categories and genres: flat `{name, slug}` vocabularies managed by admins.

use axum::{
    Json,
    extract::State,
    http::{Method, StatusCode},
};
use entity::{categories, genres};
use platform_api::{ApiError, ApiResult, Page, PageParams};
use platform_authz::Policy;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{db_error, icontains, paginate, write_error};
use crate::{
    extract::{Caller, JsonBody, PathParams, QueryParams},
    http::AppState,
    validate::{self, NAME_MAX},
};

const POLICY: Policy = Policy::AdminWrite;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SlugView {
    pub name: String,
    pub slug: String,
}

impl From<categories::Model> for SlugView {
    fn from(model: categories::Model) -> Self {
        Self {
            name: model.name,
            slug: model.slug,
        }
    }
}

impl From<genres::Model> for SlugView {
    fn from(model: genres::Model) -> Self {
        Self {
            name: model.name,
            slug: model.slug,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    search: Option<String>,
    page: Option<u64>,
}

impl CatalogQuery {
    fn search(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    fn page(&self) -> PageParams {
        PageParams { page: self.page }
    }
}

#[derive(Debug, Deserialize)]
pub struct CatalogPayload {
    name: Option<String>,
    slug: Option<String>,
}

impl CatalogPayload {
    fn validated(self) -> ApiResult<(String, String)> {
        let name = validate::required("name", self.name)?;
        let name = validate::text("name", &name, Some(NAME_MAX))?;
        let slug = validate::slug(&validate::required("slug", self.slug)?)?;
        Ok((name, slug))
    }
}

pub async fn list_categories(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<CatalogQuery>,
) -> ApiResult<Json<Page<SlugView>>> {
    let mut select = categories::Entity::find().order_by_asc(categories::Column::Name);
    if let Some(search) = query.search() {
        select = select.filter(icontains(categories::Column::Name, search));
    }
    let page = paginate(&state.db, select, query.page(), state.page_size()).await?;
    Ok(Json(page.map(SlugView::from)))
}

pub async fn create_category(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    body: JsonBody<CatalogPayload>,
) -> ApiResult<(StatusCode, Json<SlugView>)> {
    caller.authorize(POLICY, &method)?;
    let (name, slug) = body.parse()?.validated()?;
    let exists = categories::Entity::find()
        .filter(categories::Column::Slug.eq(slug.as_str()))
        .one(&state.db)
        .await
        .map_err(db_error)?
        .is_some();
    if exists {
        return Err(slug_taken());
    }
    let category = categories::ActiveModel {
        name: Set(name),
        slug: Set(slug),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(write_error(SLUG_TAKEN))?;
    info!(slug = %category.slug, "category created");
    Ok((StatusCode::CREATED, Json(category.into())))
}

pub async fn delete_category(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    PathParams(slug): PathParams<String>,
) -> ApiResult<StatusCode> {
    caller.authorize(POLICY, &method)?;
    let category = categories::Entity::find()
        .filter(categories::Column::Slug.eq(slug.as_str()))
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or(ApiError::NotFound("category"))?;
    category.delete(&state.db).await.map_err(db_error)?;
    info!(%slug, "category deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_genres(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<CatalogQuery>,
) -> ApiResult<Json<Page<SlugView>>> {
    let mut select = genres::Entity::find().order_by_asc(genres::Column::Name);
    if let Some(search) = query.search() {
        select = select.filter(icontains(genres::Column::Name, search));
    }
    let page = paginate(&state.db, select, query.page(), state.page_size()).await?;
    Ok(Json(page.map(SlugView::from)))
}

pub async fn create_genre(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    body: JsonBody<CatalogPayload>,
) -> ApiResult<(StatusCode, Json<SlugView>)> {
    caller.authorize(POLICY, &method)?;
    let (name, slug) = body.parse()?.validated()?;
    let exists = genres::Entity::find()
        .filter(genres::Column::Slug.eq(slug.as_str()))
        .one(&state.db)
        .await
        .map_err(db_error)?
        .is_some();
    if exists {
        return Err(slug_taken());
    }
    let genre = genres::ActiveModel {
        name: Set(name),
        slug: Set(slug),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(write_error(SLUG_TAKEN))?;
    info!(slug = %genre.slug, "genre created");
    Ok((StatusCode::CREATED, Json(genre.into())))
}

pub async fn delete_genre(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    PathParams(slug): PathParams<String>,
) -> ApiResult<StatusCode> {
    caller.authorize(POLICY, &method)?;
    let genre = genres::Entity::find()
        .filter(genres::Column::Slug.eq(slug.as_str()))
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or(ApiError::NotFound("genre"))?;
    genre.delete(&state.db).await.map_err(db_error)?;
    info!(%slug, "genre deleted");
    Ok(StatusCode::NO_CONTENT)
}

const SLUG_TAKEN: &str = "an entry with this slug already exists";

fn slug_taken() -> ApiError {
    ApiError::invalid_field("slug", SLUG_TAKEN)
}
