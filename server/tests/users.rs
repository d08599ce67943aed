mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use entity::users::Role;
use serde_json::json;

#[tokio::test]
async fn self_edit_ignores_role() {
    let app = TestApp::new().await;
    let ada = app.user("ada", Role::User).await;
    let token = app.token(&ada);

    let (status, body) = app
        .request(
            Method::PATCH,
            "/api/v1/users/me/",
            Some(&token),
            Some(json!({"bio": "new", "role": "admin"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bio"], "new");
    assert_eq!(body["role"], "user");

    let (_, body) = app.get("/api/v1/users/me/", Some(&token)).await;
    assert_eq!(body["role"], "user");
}

#[tokio::test]
async fn put_on_profiles_is_not_allowed() {
    let app = TestApp::new().await;
    let admin = app.user("root", Role::Admin).await;
    let token = app.token(&admin);
    let (status, _) = app
        .request(
            Method::PUT,
            "/api/v1/users/me/",
            Some(&token),
            Some(json!({"bio": "x"})),
        )
        .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    let (status, _) = app
        .request(
            Method::PUT,
            "/api/v1/users/root/",
            Some(&token),
            Some(json!({"bio": "x"})),
        )
        .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn me_requires_authentication() {
    let app = TestApp::new().await;
    let (status, _) = app.get("/api/v1/users/me/", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn user_management_is_admin_only() {
    let app = TestApp::new().await;
    let moderator = app.user("mod", Role::Moderator).await;
    let admin = app.user("root", Role::Admin).await;

    let (status, _) = app.get("/api/v1/users/", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.get("/api/v1/users/", Some(&app.token(&moderator))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let token = app.token(&admin);
    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/users/",
            Some(&token),
            Some(json!({"username": "grace", "email": "grace@example.test", "role": "moderator"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "moderator");

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/users/",
            Some(&token),
            Some(json!({"username": "grace", "email": "g2@example.test"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .request(
            Method::PATCH,
            "/api/v1/users/grace/",
            Some(&token),
            Some(json!({"role": "admin", "first_name": "Grace"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "admin");
    assert_eq!(body["first_name"], "Grace");

    let (status, body) = app.get("/api/v1/users/?search=gra", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["username"], "grace");

    let (status, _) = app
        .request(Method::DELETE, "/api/v1/users/grace/", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get("/api/v1/users/grace/", Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn user_list_is_paginated() {
    let app = TestApp::new().await;
    let admin = app.user("root", Role::Admin).await;
    app.user("ada", Role::User).await;
    app.user("bob", Role::User).await;
    let token = app.token(&admin);

    let (status, body) = app.get("/api/v1/users/", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
    assert_eq!(body["next"], 2);
    assert!(body["previous"].is_null());
    assert_eq!(body["results"].as_array().unwrap().len(), 2);

    let (_, body) = app.get("/api/v1/users/?page=2", Some(&token)).await;
    assert_eq!(body["results"][0]["username"], "root");
    assert!(body["next"].is_null());
    assert_eq!(body["previous"], 1);

    let (status, _) = app.get("/api/v1/users/?page=0", Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
