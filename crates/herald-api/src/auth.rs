use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use herald_db::Database;
use herald_types::api::{
    ApiResponse, ChangePasswordRequest, Claims, LoginRequest, LoginResponse, RefreshClaims,
    RefreshRequest, RegisterRequest, TokenPair,
};
use herald_types::models::User;

use crate::channels::ChannelBinding;
use crate::clock::Clock;
use crate::error::{ApiError, JsonBody, Result};
use crate::ideas::IdeaStore;
use crate::linkedin::LinkedInClient;
use crate::media::MediaStorage;
use crate::posts::PostStore;
use crate::scheduled_posts::ScheduledPostStore;
use crate::youtube::YouTubeClient;

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub clock: Arc<dyn Clock>,
    pub tokens: TokenConfig,
    pub media: MediaStorage,
    /// `None` when the LinkedIn app credentials are not configured.
    pub linkedin: Option<LinkedInClient>,
    pub youtube: Option<YouTubeClient>,
}

impl AppStateInner {
    pub fn channels(&self) -> ChannelBinding<'_> {
        ChannelBinding::new(&self.db, self.clock.as_ref())
    }

    pub fn scheduled_posts(&self) -> ScheduledPostStore<'_> {
        ScheduledPostStore::new(&self.db, self.clock.as_ref())
    }

    pub fn posts(&self) -> PostStore<'_> {
        PostStore::new(&self.db, self.clock.as_ref())
    }

    pub fn ideas(&self) -> IdeaStore<'_> {
        IdeaStore::new(&self.db, self.clock.as_ref())
    }
}

/// Signing secrets and lifetimes for the two token kinds.
#[derive(Clone)]
pub struct TokenConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl: TimeDelta,
    pub refresh_ttl: TimeDelta,
}

impl TokenConfig {
    fn issue(&self, user_id: Uuid, email: &str, now: DateTime<Utc>) -> anyhow::Result<TokenPair> {
        let access = Claims {
            sub: user_id,
            email: email.to_string(),
            exp: (now + self.access_ttl).timestamp() as usize,
        };
        let refresh = RefreshClaims {
            sub: user_id,
            jti: Uuid::new_v4(),
            exp: (now + self.refresh_ttl).timestamp() as usize,
        };

        Ok(TokenPair {
            access_token: encode(
                &Header::default(),
                &access,
                &EncodingKey::from_secret(self.access_secret.as_bytes()),
            )?,
            refresh_token: encode(
                &Header::default(),
                &refresh,
                &EncodingKey::from_secret(self.refresh_secret.as_bytes()),
            )?,
        })
    }

    pub fn decode_access(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.access_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| ApiError::Unauthorized("Invalid access token"))
    }

    fn decode_refresh(&self, token: &str) -> Result<RefreshClaims> {
        decode::<RefreshClaims>(
            token,
            &DecodingKey::from_secret(self.refresh_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| ApiError::Unauthorized("Invalid refresh token"))
    }
}

fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))
}

fn verify_password(password: &str, phc: &str) -> anyhow::Result<bool> {
    let parsed =
        PasswordHash::new(phc).map_err(|e| anyhow::anyhow!("stored hash unreadable: {}", e))?;
    Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}

fn auth_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value)).http_only(true).secure(true).path("/").build()
}

fn with_token_cookies(jar: CookieJar, tokens: &TokenPair) -> CookieJar {
    jar.add(auth_cookie(ACCESS_COOKIE, tokens.access_token.clone()))
        .add(auth_cookie(REFRESH_COOKIE, tokens.refresh_token.clone()))
}

pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(req), _): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let email = req.email.trim().to_lowercase();
    let mut missing = Vec::new();
    if email.is_empty() {
        missing.push("email");
    }
    if req.password.is_empty() {
        missing.push("password");
    }
    if !missing.is_empty() {
        return Err(ApiError::missing(&missing));
    }

    if state.db.get_user_by_email(&email)?.is_some() {
        return Err(ApiError::Conflict("User with this email already exists".into()));
    }

    let password_hash = hash_password(&req.password)?;
    let user_id = Uuid::new_v4();
    state.db.create_user(user_id, &email, &password_hash, state.clock.now())?;

    let user = state
        .db
        .get_user_by_id(user_id)?
        .ok_or_else(|| anyhow::anyhow!("user {} missing right after insert", user_id))?
        .to_user();

    info!("Registered user {}", user.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(201, "User registered successfully", user)),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(req), _): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse> {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || req.password.is_empty() {
        return Err(ApiError::missing(&["email", "password"]));
    }

    let row = state.db.get_user_by_email(&email)?.ok_or(ApiError::NotFound("User"))?;
    if !verify_password(&req.password, &row.password)? {
        warn!("Failed login for user {}", row.id);
        return Err(ApiError::Unauthorized("Invalid user credentials"));
    }

    let now = state.clock.now();
    let tokens = state.tokens.issue(row.id, &row.email, now)?;
    state.db.set_refresh_token(row.id, Some(tokens.refresh_token.as_str()), now)?;

    let jar = with_token_cookies(jar, &tokens);
    let body = LoginResponse {
        user: row.to_user(),
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    };

    info!("User {} logged in", row.id);
    Ok((jar, Json(ApiResponse::ok(200, "User logged in successfully", body))))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    jar: CookieJar,
) -> Result<impl IntoResponse> {
    state.db.set_refresh_token(claims.sub, None, state.clock.now())?;

    let jar = jar
        .remove(Cookie::build(ACCESS_COOKIE).path("/"))
        .remove(Cookie::build(REFRESH_COOKIE).path("/"));

    info!("User {} logged out", claims.sub);
    Ok((jar, Json(ApiResponse::ok(200, "User logged out", json!({})))))
}

/// Rotate both tokens. The presented refresh token must be the one stored
/// on the user; anything else has been used already or was never issued.
pub async fn refresh_token(
    State(state): State<AppState>,
    jar: CookieJar,
    body: std::result::Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    // The body is optional; only a body that claims to be JSON is parsed.
    let from_body = match body {
        Ok(Json(b)) => b.refresh_token,
        Err(JsonRejection::MissingJsonContentType(_)) => None,
        Err(rejection) => return Err(rejection.into()),
    };
    let presented = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .or(from_body)
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::Unauthorized("Refresh token is required"))?;

    let claims = state.tokens.decode_refresh(&presented)?;
    let row = state
        .db
        .get_user_by_id(claims.sub)?
        .ok_or(ApiError::Unauthorized("Invalid refresh token"))?;

    if row.refresh_token.as_deref() != Some(presented.as_str()) {
        warn!("Stale refresh token presented for user {}", row.id);
        return Err(ApiError::Unauthorized("Refresh token is expired or used"));
    }

    let now = state.clock.now();
    let tokens = state.tokens.issue(row.id, &row.email, now)?;
    state.db.set_refresh_token(row.id, Some(tokens.refresh_token.as_str()), now)?;

    let jar = with_token_cookies(jar, &tokens);
    Ok((jar, Json(ApiResponse::ok(200, "Access token refreshed", tokens))))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): JsonBody<ChangePasswordRequest>,
) -> Result<impl IntoResponse> {
    let mut missing = Vec::new();
    if req.old_password.is_empty() {
        missing.push("oldPassword");
    }
    if req.new_password.is_empty() {
        missing.push("newPassword");
    }
    if !missing.is_empty() {
        return Err(ApiError::missing(&missing));
    }

    let row = state.db.get_user_by_id(claims.sub)?.ok_or(ApiError::NotFound("User"))?;
    if !verify_password(&req.old_password, &row.password)? {
        return Err(ApiError::Unauthorized("Invalid old password"));
    }

    let password_hash = hash_password(&req.new_password)?;
    state.db.set_password(row.id, &password_hash, state.clock.now())?;

    info!("User {} changed password", row.id);
    Ok(Json(ApiResponse::ok(200, "Password changed successfully", json!({}))))
}

pub async fn current_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let user: User = state
        .db
        .get_user_by_id(claims.sub)?
        .ok_or(ApiError::NotFound("User"))?
        .to_user();
    Ok(Json(ApiResponse::ok(200, "Current user fetched successfully", user)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TokenConfig {
        TokenConfig {
            access_secret: "access-secret".into(),
            refresh_secret: "refresh-secret".into(),
            access_ttl: TimeDelta::minutes(15),
            refresh_ttl: TimeDelta::days(10),
        }
    }

    #[test]
    fn issued_access_token_decodes() {
        let cfg = config();
        let user = Uuid::new_v4();
        let pair = cfg.issue(user, "a@b.c", Utc::now()).unwrap();

        let claims = cfg.decode_access(&pair.access_token).unwrap();
        assert_eq!(claims.sub, user);
        assert_eq!(claims.email, "a@b.c");
    }

    #[test]
    fn tokens_are_not_interchangeable() {
        let cfg = config();
        let pair = cfg.issue(Uuid::new_v4(), "a@b.c", Utc::now()).unwrap();

        assert!(cfg.decode_access(&pair.refresh_token).is_err());
        assert!(cfg.decode_refresh(&pair.access_token).is_err());
        assert!(cfg.decode_refresh(&pair.refresh_token).is_ok());
    }

    #[test]
    fn refresh_tokens_are_unique_per_issue() {
        let cfg = config();
        let user = Uuid::new_v4();
        let now = Utc::now();
        let a = cfg.issue(user, "a@b.c", now).unwrap();
        let b = cfg.issue(user, "a@b.c", now).unwrap();
        assert_ne!(a.refresh_token, b.refresh_token);
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let cfg = config();
        let long_ago = Utc::now() - TimeDelta::days(1);
        let pair = cfg.issue(Uuid::new_v4(), "a@b.c", long_ago).unwrap();
        assert!(matches!(cfg.decode_access(&pair.access_token), Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn password_hash_round_trip() {
        let phc = hash_password("hunter2").unwrap();
        assert!(verify_password("hunter2", &phc).unwrap());
        assert!(!verify_password("hunter3", &phc).unwrap());
    }
}
