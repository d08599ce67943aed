#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use chrono::Utc;
use entity::{categories, genres, reviews, title_genres, titles, users};
use http_body_util::BodyExt;
use migration::{Migrator, MigratorTrait};
use platform_authn::{JwtIssuer, MemoryMailer, TokenIssuer, TokenSettings};
use platform_db::{DatabaseSettings, DbPool, connect};
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tower::ServiceExt;
use yamdb_server::{AppConfig, AppState, build_router};

pub struct TestApp {
    pub db: DbPool,
    pub mailer: MemoryMailer,
    pub state: AppState,
    router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = connect(&DatabaseSettings::new("sqlite::memory:"))
            .await
            .unwrap();
        Migrator::up(&db, None).await.unwrap();
        let mailer = MemoryMailer::new();
        let config = AppConfig {
            page_size: 2,
            ..AppConfig::default()
        };
        let state = AppState::new(db.clone(), config, Arc::new(mailer.clone()));
        let router = build_router(state.clone());
        Self {
            db,
            mailer,
            state,
            router,
        }
    }

    pub async fn user(&self, username: &str, role: users::Role) -> users::Model {
        users::ActiveModel {
            username: Set(username.to_string()),
            email: Set(format!("{username}@example.test")),
            first_name: Set(String::new()),
            last_name: Set(String::new()),
            bio: Set(String::new()),
            role: Set(role),
            is_staff: Set(false),
            is_superuser: Set(false),
            is_active: Set(true),
            date_joined: Set(Utc::now().fixed_offset()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .unwrap()
    }

    pub fn token(&self, user: &users::Model) -> String {
        self.state.tokens.issue(user.id).unwrap()
    }

    /// A correctly signed token that expired ten minutes ago.
    pub fn expired_token(&self, user: &users::Model) -> String {
        let settings = TokenSettings {
            access_ttl_minutes: -10,
            ..self.state.config.tokens.clone()
        };
        JwtIssuer::new(&settings).issue(user.id).unwrap()
    }

    pub async fn category(&self, name: &str, slug: &str) -> categories::Model {
        categories::ActiveModel {
            name: Set(name.to_string()),
            slug: Set(slug.to_string()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .unwrap()
    }

    pub async fn genre(&self, name: &str, slug: &str) -> genres::Model {
        genres::ActiveModel {
            name: Set(name.to_string()),
            slug: Set(slug.to_string()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .unwrap()
    }

    pub async fn title(
        &self,
        name: &str,
        year: i32,
        category: Option<&categories::Model>,
        genres: &[&genres::Model],
    ) -> titles::Model {
        let title = titles::ActiveModel {
            name: Set(name.to_string()),
            year: Set(year),
            description: Set(None),
            category_id: Set(category.map(|c| c.id)),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .unwrap();
        for genre in genres {
            title_genres::ActiveModel {
                title_id: Set(title.id),
                genre_id: Set(genre.id),
            }
            .insert(&self.db)
            .await
            .unwrap();
        }
        title
    }

    pub async fn review(
        &self,
        title: &titles::Model,
        author: &users::Model,
        score: i32,
    ) -> reviews::Model {
        reviews::ActiveModel {
            title_id: Set(title.id),
            author_id: Set(author.id),
            text: Set(format!("{} rates it {score}", author.username)),
            score: Set(score),
            pub_date: Set(Utc::now().fixed_offset()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .unwrap()
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn raw_get(&self, uri: &str) -> Response {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }
}
