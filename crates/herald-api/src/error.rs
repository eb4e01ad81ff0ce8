//! Error taxonomy shared by every handler.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::WithRejection;
use herald_db::RevisionConflict;
use herald_types::api::ApiResponse;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, ApiError>;

/// JSON request body whose rejection goes through the error envelope.
pub type JsonBody<T> = WithRejection<Json<T>, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// A required field was missing or empty, or a value was out of range.
    #[error("{0}")]
    Validation(String),

    #[error("Channel '{0}' not found")]
    ChannelNotFound(String),

    #[error("Invalid time '{0}', expected a value containing 'am' or 'pm'")]
    InvalidTimeToken(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("Upstream provider returned {status}: {message}")]
    Upstream { status: StatusCode, message: String },

    #[error("{0} is not configured")]
    Unavailable(&'static str),

    #[error("Internal error: {0:#}")]
    Internal(anyhow::Error),
}

impl ApiError {
    /// Validation failure naming every missing field.
    pub fn missing(fields: &[&str]) -> Self {
        Self::Validation(format!("Missing required field(s): {}", fields.join(", ")))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidTimeToken(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::ChannelNotFound(_) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Upstream { status, .. }
                if status.is_client_error() || status.is_server_error() =>
            {
                *status
            }
            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable, machine-readable name of the failure.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::ChannelNotFound(_) => "channel_not_found",
            Self::InvalidTimeToken(_) => "invalid_time_token",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Unauthorized(_) => "unauthorized",
            Self::Upstream { .. } => "upstream_error",
            Self::Unavailable(_) => "unavailable",
            Self::Internal(_) => "internal_error",
        }
    }
}

/// Persistence errors become `Internal`, except a lost optimistic-concurrency
/// race which is reported to the caller as `Conflict`.
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<RevisionConflict>() {
            Some(conflict) => Self::Conflict(format!(
                "Concurrent modification detected ({conflict}), retry the request"
            )),
            None => Self::Internal(err),
        }
    }
}

/// A body that is not valid JSON for the target type is a client mistake.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Internal(err) => {
                error!("request failed: {:#}", err);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = ApiResponse::failure(status.as_u16(), self.kind(), message);
        (status, Json(body)).into_response()
    }
}

/// Parse an id taken from the URL. An id that cannot exist is reported the
/// same way as one that does not exist.
pub fn parse_id(raw: &str, what: &'static str) -> Result<Uuid> {
    raw.parse().map_err(|_| ApiError::NotFound(what))
}

/// The value as given, if present and not blank. Callers store and match
/// the untrimmed text.
pub(crate) fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_follows_the_taxonomy() {
        assert_eq!(ApiError::missing(&["content"]).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::InvalidTimeToken("noon".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::ChannelNotFound("Twitter".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::NotFound("scheduled post").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::Unauthorized("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Unavailable("LinkedIn").status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("disk on fire")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn upstream_keeps_provider_error_status() {
        let err = ApiError::Upstream {
            status: StatusCode::TOO_MANY_REQUESTS,
            message: "slow down".into(),
        };
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);

        let odd = ApiError::Upstream { status: StatusCode::FOUND, message: "redirect".into() };
        assert_eq!(odd.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn revision_conflict_maps_to_conflict() {
        let err: ApiError =
            anyhow::Error::from(RevisionConflict { expected: 1, actual: Some(2) }).into();
        assert!(matches!(err, ApiError::Conflict(_)));

        let other: ApiError = anyhow::anyhow!("boom").into();
        assert!(matches!(other, ApiError::Internal(_)));
    }

    #[test]
    fn missing_names_every_field() {
        let err = ApiError::missing(&["content", "media"]);
        assert_eq!(err.to_string(), "Missing required field(s): content, media");
    }

    #[test]
    fn malformed_ids_are_not_found() {
        assert!(matches!(parse_id("nope", "idea"), Err(ApiError::NotFound("idea"))));
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string(), "idea").unwrap(), id);
    }

    #[test]
    fn present_drops_blanks_but_keeps_text_as_given() {
        assert_eq!(present(Some("  hi ")), Some("  hi "));
        assert_eq!(present(Some("   ")), None);
        assert_eq!(present(None), None);
    }
}
