use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{MediaItem, User};

// -- JWT Claims --

/// Access-token claims, shared by the auth handlers and the middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: usize,
}

/// Refresh-token claims. `jti` makes every issued token unique so a
/// rotated token never equals the one it replaced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: Uuid,
    pub jti: Uuid,
    pub exp: usize,
}

// -- Envelope --

/// Uniform JSON envelope for every response, success or failure.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub message: String,
    pub data: Option<T>,
    pub success: bool,
    /// Machine-readable failure kind, absent on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(status_code: u16, message: impl Into<String>, data: T) -> Self {
        Self {
            status_code,
            message: message.into(),
            data: Some(data),
            success: status_code < 400,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn failure(status_code: u16, kind: &str, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
            data: None,
            success: false,
            error: Some(kind.to_string()),
        }
    }
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub old_password: String,
    #[serde(default)]
    pub new_password: String,
}

// -- Channels --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BindChannelRequest {
    #[serde(default)]
    pub channel_name: String,
    #[serde(default)]
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub sub: Option<String>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub profile_picture: Option<String>,
}

/// Partial credential/metadata update. Absent or empty fields are left alone.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RotateCredentialsRequest {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub sub: Option<String>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub profile_picture: Option<String>,
}

// -- Scheduled posts --

/// Every field is optional at the wire level so that missing fields are
/// reported together as one validation failure.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateScheduledPostRequest {
    pub content: Option<String>,
    pub channel_name: Option<String>,
    /// Time-of-day token such as "9am" or "12pm".
    pub scheduled_at: Option<String>,
    pub media: Option<Vec<MediaItem>>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateScheduledPostRequest {
    pub content: Option<String>,
    pub channel_name: Option<String>,
    pub scheduled_at: Option<String>,
    pub media: Option<Vec<MediaItem>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelFilter {
    pub channel_name: Option<String>,
}

// -- Published posts --

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PostRequest {
    pub urn: Option<String>,
    pub channel_name: Option<String>,
}

// -- Ideas --

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct IdeaRequest {
    pub content: Option<String>,
    pub image_url: Option<String>,
}

// -- LinkedIn --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedInAccessTokenRequest {
    pub authorization_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedInUserInfoRequest {
    pub access_token: Option<String>,
}

// -- YouTube --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct YouTubeAuthorizeRequest {
    #[serde(default)]
    pub scope: Vec<String>,
    /// Opaque value echoed back to the redirect URI.
    pub state: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YouTubeAuthorizeResponse {
    pub authorize_url: String,
}

/// Dates are `YYYY-MM-DD`, as the analytics API expects them.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct YouTubeAnalyticsRequest {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub code: Option<String>,
}

/// Query string of a video upload; the video itself is the request body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YouTubeUploadParams {
    pub title: Option<String>,
    pub description: Option<String>,
    pub code: Option<String>,
}

// -- Health --

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
