//! Scheduled posts: one aggregate per user holding the ordered entries.
//!
//! Every mutation is load, mutate in memory, save. The save checks the
//! revision that was loaded, so a concurrent writer surfaces as `Conflict`
//! instead of one change silently overwriting the other. All validation
//! and resolution happens before the save, so a failed call writes nothing.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use herald_db::{Database, scheduled_posts};
use herald_types::{
    api::{
        ApiResponse, ChannelFilter, Claims, CreateScheduledPostRequest, UpdateScheduledPostRequest,
    },
    models::{MediaItem, ScheduledPost, ScheduledPostCollection},
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::AppState;
use crate::channels::ChannelBinding;
use crate::clock::Clock;
use crate::error::{ApiError, JsonBody, Result, parse_id, present};
use crate::time_of_day;

const ENTITY: &str = "Scheduled post";

pub struct ScheduledPostStore<'a> {
    db: &'a Database,
    clock: &'a dyn Clock,
}

impl<'a> ScheduledPostStore<'a> {
    pub fn new(db: &'a Database, clock: &'a dyn Clock) -> Self {
        Self { db, clock }
    }

    fn channels(&self) -> ChannelBinding<'a> {
        ChannelBinding::new(self.db, self.clock)
    }

    fn load(&self, user_id: Uuid) -> Result<Option<ScheduledPostCollection>> {
        Ok(self.db.with_conn(|conn| scheduled_posts::load(conn, user_id))?)
    }

    fn persist(&self, collection: &mut ScheduledPostCollection) -> Result<()> {
        let revision = self.db.with_conn_mut(|conn| scheduled_posts::save(conn, collection))?;
        collection.revision = revision;
        Ok(())
    }

    pub fn create(
        &self,
        user_id: Uuid,
        req: CreateScheduledPostRequest,
    ) -> Result<ScheduledPostCollection> {
        let content = present(req.content.as_deref());
        let channel_name = present(req.channel_name.as_deref());
        let token = present(req.scheduled_at.as_deref());
        let media = req.media.filter(|m| !m.is_empty());

        let mut missing = Vec::new();
        if content.is_none() {
            missing.push("content");
        }
        if channel_name.is_none() {
            missing.push("channelName");
        }
        if token.is_none() {
            missing.push("scheduledAt");
        }
        if media.is_none() {
            missing.push("media");
        }
        let (Some(content), Some(channel_name), Some(token), Some(media)) =
            (content, channel_name, token, media)
        else {
            return Err(ApiError::missing(&missing));
        };
        check_media(&media)?;

        let channel = self.channels().resolve(user_id, channel_name)?;
        let now = self.clock.now();
        let scheduled_at_utc = time_of_day::normalize(token, now)?;

        let mut collection = self
            .load(user_id)?
            .unwrap_or_else(|| ScheduledPostCollection::empty(user_id, now));

        let post = ScheduledPost {
            id: Uuid::new_v4(),
            channel: channel.channel_ref(),
            content: content.to_string(),
            media,
            scheduled_at_utc,
            created_at: now,
            updated_at: now,
        };
        let post_id = post.id;
        collection.posts.push(post);
        collection.updated_at = now;
        self.persist(&mut collection)?;

        info!(
            "Scheduled post {} on {} at {} for user {}",
            post_id, channel.channel_name, scheduled_at_utc, user_id
        );
        Ok(collection)
    }

    /// All entries in creation order. No aggregate is an empty list.
    pub fn list(&self, user_id: Uuid) -> Result<Vec<ScheduledPost>> {
        Ok(self.load(user_id)?.map(|c| c.posts).unwrap_or_default())
    }

    pub fn list_by_channel(&self, user_id: Uuid, channel_name: &str) -> Result<Vec<ScheduledPost>> {
        let channel = self.channels().resolve(user_id, channel_name)?;
        let mut posts = self.list(user_id)?;
        posts.retain(|post| post.channel.id == channel.id);
        Ok(posts)
    }

    pub fn get_by_id(&self, user_id: Uuid, id: Uuid) -> Result<ScheduledPost> {
        self.list(user_id)?
            .into_iter()
            .find(|post| post.id == id)
            .ok_or(ApiError::NotFound(ENTITY))
    }

    /// Replace each provided field in place. An empty patch returns the
    /// aggregate untouched.
    pub fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: UpdateScheduledPostRequest,
    ) -> Result<ScheduledPostCollection> {
        let mut collection = self.load(user_id)?.ok_or(ApiError::NotFound(ENTITY))?;
        let index = collection.position(id).ok_or(ApiError::NotFound(ENTITY))?;

        let mut empty = Vec::new();
        let content = patch.content.as_deref().map(|v| present(Some(v)));
        let channel_name = patch.channel_name.as_deref().map(|v| present(Some(v)));
        let token = patch.scheduled_at.as_deref().map(|v| present(Some(v)));
        if content == Some(None) {
            empty.push("content");
        }
        if channel_name == Some(None) {
            empty.push("channelName");
        }
        if token == Some(None) {
            empty.push("scheduledAt");
        }
        if patch.media.as_ref().is_some_and(|m| m.is_empty()) {
            empty.push("media");
        }
        if !empty.is_empty() {
            return Err(ApiError::missing(&empty));
        }
        if let Some(media) = &patch.media {
            check_media(media)?;
        }

        let is_noop = content.is_none()
            && channel_name.is_none()
            && token.is_none()
            && patch.media.is_none();
        if is_noop {
            debug!("Empty update for scheduled post {}", id);
            return Ok(collection);
        }

        let channel = channel_name
            .flatten()
            .map(|name| self.channels().resolve(user_id, name))
            .transpose()?;
        let now = self.clock.now();
        let scheduled_at_utc = token.flatten().map(|t| time_of_day::normalize(t, now)).transpose()?;

        let post = &mut collection.posts[index];
        if let Some(content) = content.flatten() {
            post.content = content.to_string();
        }
        if let Some(channel) = channel {
            post.channel = channel.channel_ref();
        }
        if let Some(at) = scheduled_at_utc {
            post.scheduled_at_utc = at;
        }
        if let Some(media) = patch.media {
            post.media = media;
        }
        post.updated_at = now;
        collection.updated_at = now;

        self.persist(&mut collection)?;
        info!("Updated scheduled post {} for user {}", id, user_id);
        Ok(collection)
    }

    /// Remove the entry, keeping the order of the rest. The aggregate
    /// itself stays even when it becomes empty.
    pub fn delete(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        let mut collection = self.load(user_id)?.ok_or(ApiError::NotFound(ENTITY))?;
        let index = collection.position(id).ok_or(ApiError::NotFound(ENTITY))?;

        collection.posts.remove(index);
        collection.updated_at = self.clock.now();
        self.persist(&mut collection)?;

        info!("Deleted scheduled post {} for user {}", id, user_id);
        Ok(())
    }
}

fn check_media(media: &[MediaItem]) -> Result<()> {
    match media.iter().position(|item| item.url.trim().is_empty()) {
        Some(i) => Err(ApiError::missing(&[format!("media[{i}].url").as_str()])),
        None => Ok(()),
    }
}

// -- Handlers --

pub async fn create_scheduled_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): JsonBody<CreateScheduledPostRequest>,
) -> Result<impl IntoResponse> {
    let collection = state.scheduled_posts().create(claims.sub, req)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(201, "Post scheduled successfully", collection)),
    ))
}

pub async fn list_scheduled_posts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(filter): Query<ChannelFilter>,
) -> Result<impl IntoResponse> {
    let store = state.scheduled_posts();
    let posts = match filter.channel_name.as_deref() {
        Some(name) => store.list_by_channel(claims.sub, name)?,
        None => store.list(claims.sub)?,
    };
    Ok(Json(ApiResponse::ok(200, "Scheduled posts fetched successfully", posts)))
}

pub async fn get_scheduled_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let id = parse_id(&id, ENTITY)?;
    let post = state.scheduled_posts().get_by_id(claims.sub, id)?;
    Ok(Json(ApiResponse::ok(200, "Scheduled post fetched successfully", post)))
}

pub async fn update_scheduled_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    WithRejection(Json(patch), _): JsonBody<UpdateScheduledPostRequest>,
) -> Result<impl IntoResponse> {
    let id = parse_id(&id, ENTITY)?;
    let collection = state.scheduled_posts().update(claims.sub, id, patch)?;
    Ok(Json(ApiResponse::ok(200, "Scheduled post updated successfully", collection)))
}

pub async fn delete_scheduled_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let id = parse_id(&id, ENTITY)?;
    state.scheduled_posts().delete(claims.sub, id)?;
    Ok(StatusCode::NO_CONTENT)
}
