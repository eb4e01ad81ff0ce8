use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use crate::auth::{ACCESS_COOKIE, AppState};
use crate::error::{ApiError, Result};

/// Validate the access token from the Authorization header, falling back to
/// the access cookie, and hand the claims to the handler.
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    let bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);

    let token = bearer
        .or_else(|| jar.get(ACCESS_COOKIE).map(|c| c.value().to_string()))
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::Unauthorized("Unauthorized request"))?;

    let claims = state.tokens.decode_access(&token)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
