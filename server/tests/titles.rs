mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use entity::users::Role;
use serde_json::json;

#[tokio::test]
async fn anonymous_detail_carries_integer_rating() {
    let app = TestApp::new().await;
    let films = app.category("Films", "films").await;
    let drama = app.genre("Drama", "drama").await;
    let title = app.title("Heat", 1995, Some(&films), &[&drama]).await;
    let ada = app.user("ada", Role::User).await;
    let bob = app.user("bob", Role::User).await;
    app.review(&title, &ada, 8).await;
    app.review(&title, &bob, 10).await;

    let (status, body) = app.get(&format!("/api/v1/titles/{}/", title.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rating"], 9);
    assert_eq!(body["name"], "Heat");
    assert_eq!(body["category"], json!({"name": "Films", "slug": "films"}));
    assert_eq!(body["genre"], json!([{"name": "Drama", "slug": "drama"}]));
}

#[tokio::test]
async fn rating_truncates_and_is_null_without_reviews() {
    let app = TestApp::new().await;
    let rated = app.title("Alien", 1979, None, &[]).await;
    let unrated = app.title("Brazil", 1985, None, &[]).await;
    for (name, score) in [("a", 7), ("b", 8), ("c", 8)] {
        let user = app.user(name, Role::User).await;
        app.review(&rated, &user, score).await;
    }

    let (_, body) = app.get("/api/v1/titles/", None).await;
    let results = body["results"].as_array().unwrap();
    assert_eq!(results[0]["id"], rated.id);
    assert_eq!(results[0]["rating"], 7);
    assert_eq!(results[1]["id"], unrated.id);
    assert!(results[1]["rating"].is_null());
    assert!(results[1]["category"].is_null());
}

#[tokio::test]
async fn list_filters() {
    let app = TestApp::new().await;
    let films = app.category("Films", "films").await;
    let books = app.category("Books", "books").await;
    let drama = app.genre("Drama", "drama").await;
    let comedy = app.genre("Comedy", "comedy").await;
    app.title("Heat", 1995, Some(&films), &[&drama]).await;
    app.title("Dune", 1965, Some(&books), &[&drama]).await;
    app.title("Airplane!", 1980, Some(&films), &[&comedy]).await;

    let names = |body: &serde_json::Value| -> Vec<String> {
        body["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap().to_string())
            .collect()
    };

    let (_, body) = app.get("/api/v1/titles/?genre=drama", None).await;
    assert_eq!(names(&body), ["Dune", "Heat"]);
    let (_, body) = app.get("/api/v1/titles/?category=films", None).await;
    assert_eq!(names(&body), ["Airplane!", "Heat"]);
    let (_, body) = app.get("/api/v1/titles/?year=1965", None).await;
    assert_eq!(names(&body), ["Dune"]);
    let (_, body) = app.get("/api/v1/titles/?name=ea", None).await;
    assert_eq!(names(&body), ["Heat"]);
    let (_, body) = app
        .get("/api/v1/titles/?genre=drama&category=films", None)
        .await;
    assert_eq!(names(&body), ["Heat"]);
}

#[tokio::test]
async fn staff_and_admins_write_titles() {
    let app = TestApp::new().await;
    app.category("Films", "films").await;
    app.genre("Drama", "drama").await;
    app.genre("Crime", "crime").await;
    let admin = app.user("root", Role::Admin).await;
    let user = app.user("ada", Role::User).await;
    let token = app.token(&admin);
    let payload = json!({
        "name": "Heat",
        "year": 1995,
        "description": "Cops and robbers",
        "genre": ["drama", "crime"],
        "category": "films"
    });

    let (status, _) = app
        .request(Method::POST, "/api/v1/titles/", Some(&app.token(&user)), Some(payload.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .request(Method::POST, "/api/v1/titles/", Some(&token), Some(payload))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["genre"].as_array().unwrap().len(), 2);
    assert_eq!(body["category"]["slug"], "films");
    assert!(body["rating"].is_null());
    let id = body["id"].as_i64().unwrap();

    let (status, body) = app
        .request(
            Method::PATCH,
            &format!("/api/v1/titles/{id}/"),
            Some(&token),
            Some(json!({"genre": ["crime"], "year": 1996})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["year"], 1996);
    assert_eq!(body["genre"], json!([{"name": "Crime", "slug": "crime"}]));
    assert_eq!(body["name"], "Heat");

    let (status, _) = app
        .request(Method::DELETE, &format!("/api/v1/titles/{id}/"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&format!("/api/v1/titles/{id}/"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn title_payload_is_validated() {
    let app = TestApp::new().await;
    app.category("Films", "films").await;
    app.genre("Drama", "drama").await;
    let admin = app.user("root", Role::Admin).await;
    let token = app.token(&admin);

    for (payload, field) in [
        (json!({"name": "X", "year": 1995, "genre": ["nope"], "category": "films"}), "genre"),
        (json!({"name": "X", "year": 1995, "genre": ["drama"], "category": "nope"}), "category"),
        (json!({"name": "X", "year": 9999, "genre": ["drama"], "category": "films"}), "year"),
        (json!({"year": 1995, "genre": ["drama"], "category": "films"}), "name"),
    ] {
        let (status, body) = app
            .request(Method::POST, "/api/v1/titles/", Some(&token), Some(payload))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], field);
    }
}

#[tokio::test]
async fn unknown_or_malformed_ids_are_not_found() {
    let app = TestApp::new().await;
    let (status, _) = app.get("/api/v1/titles/999/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get("/api/v1/titles/abc/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn put_replaces_a_title_and_requires_every_field() {
    let app = TestApp::new().await;
    let films = app.category("Films", "films").await;
    app.category("Series", "series").await;
    let drama = app.genre("Drama", "drama").await;
    app.genre("Crime", "crime").await;
    let title = app.title("Heat", 1995, Some(&films), &[&drama]).await;
    let admin = app.user("root", Role::Admin).await;
    let token = app.token(&admin);
    let uri = format!("/api/v1/titles/{}/", title.id);

    let (status, body) = app
        .request(Method::PUT, &uri, Some(&token), Some(json!({"name": "Heat 2"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "year");

    let (status, body) = app
        .request(
            Method::PUT,
            &uri,
            Some(&token),
            Some(json!({
                "name": "Heat 2",
                "year": 2001,
                "genre": ["crime"],
                "category": "series"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Heat 2");
    assert_eq!(body["year"], 2001);
    assert_eq!(body["category"]["slug"], "series");
    assert_eq!(body["genre"], json!([{"name": "Crime", "slug": "crime"}]));

    let (status, _) = app
        .request(Method::PUT, &uri, None, Some(json!({"name": "Heat 3"})))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn title_name_search_ignores_case() {
    let app = TestApp::new().await;
    app.title("Heat", 1995, None, &[]).await;
    app.title("Ronin", 1998, None, &[]).await;

    let (status, body) = app.get("/api/v1/titles/?name=hEa", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["name"], "Heat");
}
