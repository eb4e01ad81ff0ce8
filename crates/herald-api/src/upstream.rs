//! Response handling shared by the provider proxies.

use axum::http::StatusCode;
use serde_json::Value;
use tracing::error;

use crate::error::{ApiError, Result};

/// Unwrap a provider response. Transport failures are a 502; a provider
/// error status is passed through unchanged.
pub(crate) fn checked(
    resp: reqwest::Result<reqwest::Response>,
    provider: &str,
    what: &str,
) -> Result<reqwest::Response> {
    let resp = resp.map_err(|e| {
        error!("{} {} request failed: {}", provider, what, e);
        ApiError::Upstream {
            status: StatusCode::BAD_GATEWAY,
            message: format!("{provider} {what} request failed"),
        }
    })?;

    let status = StatusCode::from_u16(resp.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    if !status.is_success() {
        let reason = status.canonical_reason().unwrap_or("unknown error");
        error!("{} {} returned {}", provider, what, status);
        return Err(ApiError::Upstream { status, message: reason.to_string() });
    }
    Ok(resp)
}

pub(crate) async fn read_json(
    resp: reqwest::Result<reqwest::Response>,
    provider: &str,
    what: &str,
) -> Result<Value> {
    let resp = checked(resp, provider, what)?;
    resp.json::<Value>().await.map_err(|e| unreadable(provider, what, e))
}

pub(crate) fn unreadable(provider: &str, what: &str, detail: impl std::fmt::Display) -> ApiError {
    ApiError::Upstream {
        status: StatusCode::BAD_GATEWAY,
        message: format!("{provider} {what} returned an unreadable body: {detail}"),
    }
}
