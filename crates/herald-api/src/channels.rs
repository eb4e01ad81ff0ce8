use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, Utc};
use herald_db::{Database, channels};
use herald_types::{
    api::{ApiResponse, BindChannelRequest, Claims, RotateCredentialsRequest},
    models::{ChannelEntry, ChannelName, ChannelSet},
};
use tracing::info;
use uuid::Uuid;

use crate::auth::AppState;
use crate::clock::Clock;
use crate::error::{ApiError, JsonBody, Result, present};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    Created,
    Rotated,
}

/// Per-user channel credentials, and the gate every post operation passes
/// through to turn a channel name into a [`ChannelEntry`].
pub struct ChannelBinding<'a> {
    db: &'a Database,
    clock: &'a dyn Clock,
}

impl<'a> ChannelBinding<'a> {
    pub fn new(db: &'a Database, clock: &'a dyn Clock) -> Self {
        Self { db, clock }
    }

    /// Exact, case-sensitive lookup. Unknown names and unbound names are
    /// both `ChannelNotFound`.
    pub fn resolve(&self, user_id: Uuid, channel_name: &str) -> Result<ChannelEntry> {
        let not_found = || ApiError::ChannelNotFound(channel_name.to_string());
        let name: ChannelName = channel_name.parse().map_err(|_| not_found())?;

        self.db
            .with_conn(|conn| channels::find(conn, user_id, name))?
            .ok_or_else(not_found)
    }

    pub fn get(&self, user_id: Uuid, channel_name: &str) -> Result<ChannelEntry> {
        self.resolve(user_id, channel_name)
    }

    pub fn list(&self, user_id: Uuid) -> Result<ChannelSet> {
        let channels = self.db.with_conn(|conn| channels::list(conn, user_id))?;
        Ok(ChannelSet { user_id, channels })
    }

    /// Create the entry, or overwrite the credentials of the existing entry
    /// with the same name.
    pub fn bind(
        &self,
        user_id: Uuid,
        req: BindChannelRequest,
    ) -> Result<(ChannelSet, BindOutcome)> {
        let mut missing = Vec::new();
        if present(Some(req.channel_name.as_str())).is_none() {
            missing.push("channelName");
        }
        if present(Some(req.access_token.as_str())).is_none() {
            missing.push("accessToken");
        }
        if !missing.is_empty() {
            return Err(ApiError::missing(&missing));
        }

        let name: ChannelName = req
            .channel_name
            .parse()
            .map_err(|_| {
                ApiError::Validation(format!("Invalid channel name '{}'", req.channel_name))
            })?;

        let now = self.clock.now();
        let patch = RotateCredentialsRequest {
            access_token: Some(req.access_token),
            refresh_token: req.refresh_token,
            sub: req.sub,
            user_name: req.user_name,
            user_email: req.user_email,
            profile_picture: req.profile_picture,
        };

        let (set, outcome) = self.db.with_conn_mut(|conn| {
            let outcome = match channels::find(conn, user_id, name)? {
                Some(mut entry) => {
                    apply_patch(&mut entry, &patch, now);
                    channels::update(conn, user_id, &entry)?;
                    BindOutcome::Rotated
                }
                None => {
                    let entry = new_entry(name, &patch, now);
                    channels::insert(conn, user_id, &entry)?;
                    BindOutcome::Created
                }
            };
            let channels = channels::list(conn, user_id)?;
            Ok((ChannelSet { user_id, channels }, outcome))
        })?;

        info!("Channel {} {:?} for user {}", name, outcome, user_id);
        Ok((set, outcome))
    }

    /// In-place credential/metadata update of an already bound channel.
    pub fn rotate_credentials(
        &self,
        user_id: Uuid,
        channel_name: &str,
        patch: RotateCredentialsRequest,
    ) -> Result<ChannelSet> {
        if !has_any_field(&patch) {
            return Err(ApiError::Validation(
                "At least one credential or profile field is required".into(),
            ));
        }

        let mut entry = self.resolve(user_id, channel_name)?;
        apply_patch(&mut entry, &patch, self.clock.now());

        let channels = self.db.with_conn_mut(|conn| {
            if !channels::update(conn, user_id, &entry)? {
                anyhow::bail!("channel {} vanished during credential rotation", entry.id);
            }
            channels::list(conn, user_id)
        })?;

        info!("Rotated credentials for channel {} of user {}", entry.channel_name, user_id);
        Ok(ChannelSet { user_id, channels })
    }
}

fn new_entry(
    name: ChannelName,
    patch: &RotateCredentialsRequest,
    now: DateTime<Utc>,
) -> ChannelEntry {
    let mut entry = ChannelEntry {
        id: Uuid::new_v4(),
        channel_name: name,
        access_token: String::new(),
        refresh_token: None,
        sub: None,
        user_name: None,
        user_email: None,
        profile_picture: None,
        created_at: now,
        updated_at: now,
    };
    apply_patch(&mut entry, patch, now);
    entry
}

/// Write every provided, non-empty field. Returns whether anything changed.
fn apply_patch(
    entry: &mut ChannelEntry,
    patch: &RotateCredentialsRequest,
    now: DateTime<Utc>,
) -> bool {
    let mut changed = false;

    if let Some(token) = present(patch.access_token.as_deref()) {
        entry.access_token = token.to_string();
        changed = true;
    }

    for (slot, value) in [
        (&mut entry.refresh_token, &patch.refresh_token),
        (&mut entry.sub, &patch.sub),
        (&mut entry.user_name, &patch.user_name),
        (&mut entry.user_email, &patch.user_email),
        (&mut entry.profile_picture, &patch.profile_picture),
    ] {
        if let Some(value) = present(value.as_deref()) {
            *slot = Some(value.to_string());
            changed = true;
        }
    }

    if changed {
        entry.updated_at = now;
    }
    changed
}

fn has_any_field(patch: &RotateCredentialsRequest) -> bool {
    [
        &patch.access_token,
        &patch.refresh_token,
        &patch.sub,
        &patch.user_name,
        &patch.user_email,
        &patch.profile_picture,
    ]
    .into_iter()
    .any(|field| present(field.as_deref()).is_some())
}

// -- Handlers --

pub async fn bind_channel(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): JsonBody<BindChannelRequest>,
) -> Result<impl IntoResponse> {
    let (set, outcome) = state.channels().bind(claims.sub, req)?;

    let (status, message) = match outcome {
        BindOutcome::Created => (StatusCode::CREATED, "Channel bound successfully"),
        BindOutcome::Rotated => (StatusCode::OK, "Channel credentials updated successfully"),
    };
    Ok((status, Json(ApiResponse::ok(status.as_u16(), message, set))))
}

pub async fn list_channels(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let set = state.channels().list(claims.sub)?;
    Ok(Json(ApiResponse::ok(200, "Channels fetched successfully", set)))
}

pub async fn get_channel(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(channel_name): Path<String>,
) -> Result<impl IntoResponse> {
    let entry = state.channels().get(claims.sub, &channel_name)?;
    Ok(Json(ApiResponse::ok(200, "Channel fetched successfully", entry)))
}

pub async fn rotate_channel(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(channel_name): Path<String>,
    WithRejection(Json(patch), _): JsonBody<RotateCredentialsRequest>,
) -> Result<impl IntoResponse> {
    let set = state.channels().rotate_credentials(claims.sub, &channel_name, patch)?;
    Ok(Json(ApiResponse::ok(200, "Channel credentials updated successfully", set)))
}
