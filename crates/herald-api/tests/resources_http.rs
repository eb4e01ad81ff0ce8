mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::json;

use common::spawn_app;

#[tokio::test]
async fn channel_bind_rotate_and_lookup() {
    let app = spawn_app().await;
    let token = app.signed_in("u@example.com").await;

    let resp = app.send("GET", "/api/v1/channels", Some(&token), None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["data"]["channels"], json!([]));

    assert_eq!(app.bind(&token, "LinkedIn").await.status, StatusCode::CREATED);
    let resp = app.bind(&token, "LinkedIn").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["data"]["channels"].as_array().unwrap().len(), 1);

    let resp = app
        .send(
            "PATCH",
            "/api/v1/channels/LinkedIn",
            Some(&token),
            Some(json!({ "accessToken": "rotated" })),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["data"]["channels"][0]["accessToken"], "rotated");

    let resp = app.send("GET", "/api/v1/channels/LinkedIn", Some(&token), None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["data"]["channelName"], "LinkedIn");

    let resp = app.send("GET", "/api/v1/channels/linkedin", Some(&token), None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let resp = app.bind(&token, "Orkut").await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn published_posts_crud() {
    let app = spawn_app().await;
    let token = app.signed_in("u@example.com").await;
    app.bind(&token, "LinkedIn").await;

    let resp = app
        .send(
            "POST",
            "/api/v1/posts",
            Some(&token),
            Some(json!({ "urn": "urn:li:share:1", "channelName": "LinkedIn" })),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED, "{:?}", resp.body);
    let id = resp.body["data"]["id"].as_str().unwrap().to_string();

    let resp = app
        .send(
            "PATCH",
            &format!("/api/v1/posts/{id}"),
            Some(&token),
            Some(json!({ "urn": "urn:li:share:2", "channelName": "LinkedIn" })),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let resp = app.send("GET", &format!("/api/v1/posts/{id}"), Some(&token), None).await;
    assert_eq!(resp.body["data"]["urn"], "urn:li:share:2");

    let resp = app.send("GET", "/api/v1/posts?channelName=YouTube", Some(&token), None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let resp = app.send("DELETE", &format!("/api/v1/posts/{id}"), Some(&token), None).await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    let resp = app.send("GET", "/api/v1/posts", Some(&token), None).await;
    assert_eq!(resp.body["data"], json!([]));
}

#[tokio::test]
async fn ideas_are_listed_newest_first() {
    let app = spawn_app().await;
    let token = app.signed_in("u@example.com").await;

    for (content, minutes) in [("older", 0), ("newer", 5)] {
        app.clock.advance(chrono::TimeDelta::minutes(minutes));
        let resp = app
            .send(
                "POST",
                "/api/v1/ideas",
                Some(&token),
                Some(json!({ "content": content, "imageUrl": "i.png" })),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED);
    }

    let resp = app.send("GET", "/api/v1/ideas", Some(&token), None).await;
    let contents: Vec<_> = resp.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["content"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(contents, ["newer", "older"]);

    let id = resp.body["data"][1]["id"].as_str().unwrap().to_string();
    let resp = app.send("DELETE", &format!("/api/v1/ideas/{id}"), Some(&token), None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["data"]["content"], "older");
}

#[tokio::test]
async fn media_upload_stores_locally_and_is_served() {
    let app = spawn_app().await;
    let token = app.signed_in("u@example.com").await;

    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/media")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header("X-File-Name", "cat.png")
        .body(Body::from(&b"not really a png"[..]))
        .unwrap();
    let resp = app.request(req).await;
    assert_eq!(resp.status, StatusCode::CREATED, "{:?}", resp.body);
    assert_eq!(resp.body["data"]["altText"], "cat.png");
    let url = resp.body["data"]["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/media/"));

    let req = Request::builder().uri(&url).body(Body::empty()).unwrap();
    let resp = app.request(req).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body, json!("not really a png"));
}

#[tokio::test]
async fn media_upload_validates_input() {
    let app = spawn_app().await;
    let token = app.signed_in("u@example.com").await;

    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/media")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header("X-File-Name", "empty.png")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.request(req).await.status, StatusCode::BAD_REQUEST);

    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/media")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from("data"))
        .unwrap();
    assert_eq!(app.request(req).await.status, StatusCode::BAD_REQUEST);
}
