//! Thin proxy to LinkedIn's OAuth token exchange and userinfo endpoints.
//! Provider responses are passed through as JSON.

use axum::{Extension, Json, extract::State, response::IntoResponse};
use axum_extra::extract::WithRejection;
use serde_json::Value;
use tracing::info;

use herald_types::api::{
    ApiResponse, Claims, LinkedInAccessTokenRequest, LinkedInUserInfoRequest,
};

use crate::auth::AppState;
use crate::error::{ApiError, JsonBody, Result, present};
use crate::upstream::read_json;

const PROVIDER: &str = "LinkedIn";

pub const TOKEN_URL: &str = "https://www.linkedin.com/oauth/v2/accessToken";
pub const USERINFO_URL: &str = "https://api.linkedin.com/v2/userinfo";

#[derive(Clone)]
pub struct LinkedInConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

pub struct LinkedInClient {
    http: reqwest::Client,
    config: LinkedInConfig,
    token_url: String,
    userinfo_url: String,
}

impl LinkedInClient {
    pub fn new(http: reqwest::Client, config: LinkedInConfig) -> Self {
        Self::with_endpoints(http, config, TOKEN_URL, USERINFO_URL)
    }

    pub fn with_endpoints(
        http: reqwest::Client,
        config: LinkedInConfig,
        token_url: &str,
        userinfo_url: &str,
    ) -> Self {
        Self {
            http,
            config,
            token_url: token_url.to_string(),
            userinfo_url: userinfo_url.to_string(),
        }
    }

    pub async fn exchange_code(&self, code: &str) -> Result<Value> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];

        let resp = self.http.post(&self.token_url).form(&form).send().await;
        read_json(resp, PROVIDER, "token exchange").await
    }

    pub async fn user_info(&self, access_token: &str) -> Result<Value> {
        let resp = self.http.get(&self.userinfo_url).bearer_auth(access_token).send().await;
        read_json(resp, PROVIDER, "userinfo").await
    }
}

fn client(state: &AppState) -> Result<&LinkedInClient> {
    state.linkedin.as_ref().ok_or(ApiError::Unavailable("LinkedIn integration"))
}

pub async fn access_token(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): JsonBody<LinkedInAccessTokenRequest>,
) -> Result<impl IntoResponse> {
    let code = present(req.authorization_code.as_deref())
        .ok_or_else(|| ApiError::missing(&["authorizationCode"]))?;
    let body = client(&state)?.exchange_code(code).await?;

    info!("Exchanged LinkedIn authorization code for user {}", claims.sub);
    Ok(Json(ApiResponse::ok(200, "Access token generated successfully", body)))
}

pub async fn user_info(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    WithRejection(Json(req), _): JsonBody<LinkedInUserInfoRequest>,
) -> Result<impl IntoResponse> {
    let token = present(req.access_token.as_deref())
        .ok_or_else(|| ApiError::missing(&["accessToken"]))?;
    let body = client(&state)?.user_info(token).await?;
    Ok(Json(ApiResponse::ok(200, "User info fetched successfully", body)))
}
