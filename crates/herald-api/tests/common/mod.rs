#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::{TimeDelta, Utc};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use herald_api::auth::{AppState, AppStateInner, TokenConfig};
use herald_api::clock::FixedClock;
use herald_api::linkedin::LinkedInClient;
use herald_api::media::{LocalMedia, MediaStorage};
use herald_api::youtube::YouTubeClient;
use herald_db::Database;

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub clock: Arc<FixedClock>,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(None).await
}

pub async fn spawn_app_with(linkedin: Option<LinkedInClient>) -> TestApp {
    spawn_app_with_providers(linkedin, None).await
}

pub async fn spawn_app_with_providers(
    linkedin: Option<LinkedInClient>,
    youtube: Option<YouTubeClient>,
) -> TestApp {
    let media_dir = std::env::temp_dir().join(format!("herald-test-{}", Uuid::new_v4()));
    let media = MediaStorage::Local(LocalMedia::new(media_dir, "/media").await.unwrap());
    let clock = Arc::new(FixedClock::new(Utc::now()));

    let state: AppState = Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        clock: clock.clone(),
        tokens: TokenConfig {
            access_secret: "test-access-secret".into(),
            refresh_secret: "test-refresh-secret".into(),
            access_ttl: TimeDelta::minutes(30),
            refresh_ttl: TimeDelta::days(10),
        },
        media,
        linkedin,
        youtube,
    });

    TestApp { router: herald_api::router(state.clone()), state, clock }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub async fn request(&self, req: Request<Body>) -> TestResponse {
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        TestResponse { status, headers, body }
    }

    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.request(req).await
    }

    /// Register and log in, returning the access token.
    pub async fn signed_in(&self, email: &str) -> String {
        let creds = json!({ "email": email, "password": "correct horse" });
        let resp = self.send("POST", "/api/v1/users/register", None, Some(creds.clone())).await;
        assert_eq!(resp.status, StatusCode::CREATED, "{:?}", resp.body);

        let resp = self.send("POST", "/api/v1/users/login", None, Some(creds)).await;
        assert_eq!(resp.status, StatusCode::OK, "{:?}", resp.body);
        resp.body["data"]["accessToken"].as_str().unwrap().to_string()
    }

    pub async fn bind(&self, token: &str, channel: &str) -> TestResponse {
        let body = json!({ "channelName": channel, "accessToken": format!("{channel}-token") });
        self.send("POST", "/api/v1/channels", Some(token), Some(body)).await
    }
}

pub fn scheduled(content: &str, channel: &str, at: &str) -> Value {
    json!({
        "content": content,
        "channelName": channel,
        "scheduledAt": at,
        "media": [{ "url": "a.png", "altText": "a" }],
    })
}
