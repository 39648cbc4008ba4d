//! Integration tests for user lookups, tags and pagination

mod common;

use axum::http::StatusCode;
use chatmentor_backend::db;

#[tokio::test]
#[ignore = "requires database"]
async fn test_user_lookup_and_pagination() {
    let app = common::TestApp::new().await;
    let (email, token) = app.register_and_login("SecurePassword123!").await;

    let (status, body) = app.get("/users?page=1&pageSize=1", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["meta"]["pageSize"], 1);
    assert!(body["meta"]["totalRecords"].as_u64().unwrap() >= 1);

    let (_, profile) = app.get("/profile", Some(&token)).await;
    let guid = profile["data"]["userId"].as_str().unwrap();
    let (status, body) = app.get(&format!("/users/guid/{guid}"), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], email);

    let (status, body) = app.get("/users?page=100000&pageSize=100", Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "No users found");
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_seeded_tags_are_listed() {
    let app = common::TestApp::new().await;
    db::seed(app.state.users.as_ref(), app.state.tags.as_ref(), false)
        .await
        .unwrap();
    let (_, token) = app.register_and_login("SecurePassword123!").await;

    let (status, body) = app.get("/tags", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t["name"].as_str())
        .collect();
    for expected in db::seed::DEFAULT_TAGS {
        assert!(names.contains(&expected));
    }
}
