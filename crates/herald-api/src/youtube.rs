//! Proxy to YouTube: the OAuth consent URL, a channel analytics report and
//! video upload. Analytics and upload each take a one-time authorization
//! code, exchange it for an access token and spend that token on one call.

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::{HeaderMap, header},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use bytes::Bytes;
use chrono::NaiveDate;
use serde_json::{Value, json};
use tracing::info;

use herald_types::api::{
    ApiResponse, Claims, YouTubeAnalyticsRequest, YouTubeAuthorizeRequest,
    YouTubeAuthorizeResponse, YouTubeUploadParams,
};

use crate::auth::AppState;
use crate::error::{ApiError, JsonBody, Result, present};
use crate::upstream::{checked, read_json, unreadable};

const PROVIDER: &str = "YouTube";

pub const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const ANALYTICS_URL: &str = "https://youtubeanalytics.googleapis.com/v2/reports";
pub const UPLOAD_URL: &str = "https://www.googleapis.com/upload/youtube/v3/videos";

const REPORT_METRICS: &str = "views,comments,likes,dislikes,averageViewDuration,\
                              estimatedMinutesWatched,subscribersGained";

#[derive(Clone)]
pub struct YouTubeConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

#[derive(Clone)]
pub struct YouTubeEndpoints {
    pub authorize: String,
    pub token: String,
    pub analytics: String,
    pub upload: String,
}

impl Default for YouTubeEndpoints {
    fn default() -> Self {
        Self {
            authorize: AUTHORIZE_URL.to_string(),
            token: TOKEN_URL.to_string(),
            analytics: ANALYTICS_URL.to_string(),
            upload: UPLOAD_URL.to_string(),
        }
    }
}

pub struct YouTubeClient {
    http: reqwest::Client,
    config: YouTubeConfig,
    endpoints: YouTubeEndpoints,
}

impl YouTubeClient {
    pub fn new(http: reqwest::Client, config: YouTubeConfig) -> Self {
        Self::with_endpoints(http, config, YouTubeEndpoints::default())
    }

    pub fn with_endpoints(
        http: reqwest::Client,
        config: YouTubeConfig,
        endpoints: YouTubeEndpoints,
    ) -> Self {
        Self { http, config, endpoints }
    }

    /// Consent URL asking for offline access to `scopes`.
    pub fn authorize_url(&self, scopes: &[String], state: Option<&str>) -> Result<String> {
        let scope = scopes.join(" ");
        let mut params = vec![
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("response_type", "code"),
            ("access_type", "offline"),
            ("scope", scope.as_str()),
        ];
        if let Some(state) = state {
            params.push(("state", state));
        }

        let url = reqwest::Url::parse_with_params(&self.endpoints.authorize, &params)
            .map_err(|e| anyhow::anyhow!("invalid YouTube authorize endpoint: {e}"))?;
        Ok(url.into())
    }

    /// Trade an authorization code for an access token.
    pub async fn exchange_code(&self, code: &str) -> Result<String> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];

        let resp = self.http.post(&self.endpoints.token).form(&form).send().await;
        let body = read_json(resp, PROVIDER, "token exchange").await?;
        body.get("access_token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| unreadable(PROVIDER, "token exchange", "no access_token"))
    }

    pub async fn channel_report(
        &self,
        access_token: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Value> {
        let (start, end) = (start.to_string(), end.to_string());
        let query = [
            ("ids", "channel==MINE"),
            ("startDate", start.as_str()),
            ("endDate", end.as_str()),
            ("metrics", REPORT_METRICS),
        ];

        let resp = self
            .http
            .get(&self.endpoints.analytics)
            .bearer_auth(access_token)
            .query(&query)
            .send()
            .await;
        read_json(resp, PROVIDER, "analytics report").await
    }

    /// Resumable upload in two requests: the metadata opens a session and
    /// the whole video is then sent to the session URL.
    pub async fn upload_video(
        &self,
        access_token: &str,
        title: &str,
        description: &str,
        content_type: &str,
        video: Bytes,
    ) -> Result<Value> {
        let metadata = json!({
            "snippet": { "title": title, "description": description },
            "status": { "privacyStatus": "public" },
        });

        let resp = self
            .http
            .post(&self.endpoints.upload)
            .query(&[("uploadType", "resumable"), ("part", "snippet,status")])
            .bearer_auth(access_token)
            .header("x-upload-content-type", content_type)
            .header("x-upload-content-length", video.len())
            .json(&metadata)
            .send()
            .await;
        let resp = checked(resp, PROVIDER, "upload session")?;
        let session = resp
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| unreadable(PROVIDER, "upload session", "no Location header"))?
            .to_string();

        let resp = self
            .http
            .put(session)
            .bearer_auth(access_token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(video)
            .send()
            .await;
        read_json(resp, PROVIDER, "video upload").await
    }
}

fn client(state: &AppState) -> Result<&YouTubeClient> {
    state.youtube.as_ref().ok_or(ApiError::Unavailable("YouTube integration"))
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ApiError::Validation(format!("{field} must be a date in YYYY-MM-DD form")))
}

pub async fn authorize_url(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    WithRejection(Json(req), _): JsonBody<YouTubeAuthorizeRequest>,
) -> Result<impl IntoResponse> {
    let scopes: Vec<String> = req.scope.into_iter().filter(|s| !s.trim().is_empty()).collect();
    if scopes.is_empty() {
        return Err(ApiError::missing(&["scope"]));
    }

    let authorize_url = client(&state)?.authorize_url(&scopes, present(req.state.as_deref()))?;
    Ok(Json(ApiResponse::ok(
        200,
        "Use this url to authorize the application with YouTube",
        YouTubeAuthorizeResponse { authorize_url },
    )))
}

pub async fn analytics(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): JsonBody<YouTubeAnalyticsRequest>,
) -> Result<impl IntoResponse> {
    let start = present(req.start_date.as_deref());
    let end = present(req.end_date.as_deref());
    let code = present(req.code.as_deref());
    let (Some(start), Some(end), Some(code)) = (start, end, code) else {
        let missing: Vec<_> = [("startDate", start), ("endDate", end), ("code", code)]
            .into_iter()
            .filter_map(|(field, value)| value.is_none().then_some(field))
            .collect();
        return Err(ApiError::missing(&missing));
    };

    let start = parse_date("startDate", start)?;
    let end = parse_date("endDate", end)?;
    if start > end {
        return Err(ApiError::Validation("startDate must not be after endDate".into()));
    }

    let client = client(&state)?;
    let token = client.exchange_code(code).await?;
    let report = client.channel_report(&token, start, end).await?;

    info!("Fetched YouTube analytics {}..{} for user {}", start, end, claims.sub);
    Ok(Json(ApiResponse::ok(200, "Analytics fetched successfully", report)))
}

/// The video is the raw request body; title, description and code travel
/// in the query string.
pub async fn upload_video(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<YouTubeUploadParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse> {
    if body.is_empty() {
        return Err(ApiError::Validation("Please provide a video file".into()));
    }
    let title = present(params.title.as_deref());
    let code = present(params.code.as_deref());
    let (Some(title), Some(code)) = (title, code) else {
        let missing: Vec<_> = [("title", title), ("code", code)]
            .into_iter()
            .filter_map(|(field, value)| value.is_none().then_some(field))
            .collect();
        return Err(ApiError::missing(&missing));
    };
    let description = params.description.as_deref().unwrap_or_default();
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|v| v.starts_with("video/"))
        .unwrap_or("video/*");

    let client = client(&state)?;
    let token = client.exchange_code(code).await?;
    let size = body.len();
    let video = client.upload_video(&token, title, description, content_type, body).await?;

    info!("User {} uploaded a {} byte video to YouTube", claims.sub, size);
    Ok(Json(ApiResponse::ok(200, "Video uploaded successfully", video)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> YouTubeClient {
        YouTubeClient::new(
            reqwest::Client::new(),
            YouTubeConfig {
                client_id: "client".into(),
                client_secret: "secret".into(),
                redirect_uri: "http://localhost/yt".into(),
            },
        )
    }

    #[test]
    fn authorize_url_asks_for_offline_access() {
        let scopes = vec![
            "https://www.googleapis.com/auth/youtube.upload".to_string(),
            "https://www.googleapis.com/auth/yt-analytics.readonly".to_string(),
        ];
        let url = client().authorize_url(&scopes, Some("xyz")).unwrap();
        assert!(url.starts_with(AUTHORIZE_URL));

        let parsed = reqwest::Url::parse(&url).unwrap();
        let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
        let get = |key: &str| pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str());
        assert_eq!(get("client_id"), Some("client"));
        assert_eq!(get("redirect_uri"), Some("http://localhost/yt"));
        assert_eq!(get("response_type"), Some("code"));
        assert_eq!(get("access_type"), Some("offline"));
        assert_eq!(get("scope"), Some(scopes.join(" ").as_str()));
        assert_eq!(get("state"), Some("xyz"));
    }

    #[test]
    fn state_is_omitted_when_not_given() {
        let url = client().authorize_url(&["openid".to_string()], None).unwrap();
        assert!(!url.contains("state="));
    }

    #[test]
    fn dates_must_be_calendar_days() {
        assert_eq!(
            parse_date("startDate", "2024-02-29").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert!(matches!(parse_date("startDate", "2023-02-29"), Err(ApiError::Validation(_))));
        assert!(matches!(parse_date("endDate", "yesterday"), Err(ApiError::Validation(_))));
    }
}
