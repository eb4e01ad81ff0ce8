//! Records of posts already published on a provider.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use herald_db::{Database, posts};
use herald_types::{
    api::{ApiResponse, ChannelFilter, Claims, PostRequest},
    models::{ChannelEntry, Post},
};
use tracing::info;
use uuid::Uuid;

use crate::auth::AppState;
use crate::channels::ChannelBinding;
use crate::clock::Clock;
use crate::error::{ApiError, JsonBody, Result, parse_id, present};

const ENTITY: &str = "Post";

pub struct PostStore<'a> {
    db: &'a Database,
    clock: &'a dyn Clock,
}

impl<'a> PostStore<'a> {
    pub fn new(db: &'a Database, clock: &'a dyn Clock) -> Self {
        Self { db, clock }
    }

    /// Both fields are required and the channel must be bound.
    fn validate(&self, user_id: Uuid, req: &PostRequest) -> Result<(String, ChannelEntry)> {
        let urn = present(req.urn.as_deref());
        let channel_name = present(req.channel_name.as_deref());
        let (Some(urn), Some(channel_name)) = (urn, channel_name) else {
            let missing: Vec<_> = [("urn", urn), ("channelName", channel_name)]
                .into_iter()
                .filter_map(|(field, value)| value.is_none().then_some(field))
                .collect();
            return Err(ApiError::missing(&missing));
        };

        let channel = ChannelBinding::new(self.db, self.clock).resolve(user_id, channel_name)?;
        Ok((urn.to_string(), channel))
    }

    pub fn create(&self, user_id: Uuid, req: PostRequest) -> Result<Post> {
        let (urn, channel) = self.validate(user_id, &req)?;
        let now = self.clock.now();
        let post = Post {
            id: Uuid::new_v4(),
            channel: channel.channel_ref(),
            urn,
            created_at: now,
            updated_at: now,
        };

        self.db.with_conn_mut(|conn| posts::insert(conn, user_id, &post))?;
        info!(
            "Recorded published post {} on {} for user {}",
            post.id, channel.channel_name, user_id
        );
        Ok(post)
    }

    pub fn list(&self, user_id: Uuid) -> Result<Vec<Post>> {
        Ok(self.db.with_conn(|conn| posts::list(conn, user_id))?)
    }

    pub fn list_by_channel(&self, user_id: Uuid, channel_name: &str) -> Result<Vec<Post>> {
        let channel = ChannelBinding::new(self.db, self.clock).resolve(user_id, channel_name)?;
        let mut posts = self.list(user_id)?;
        posts.retain(|post| post.channel.id == channel.id);
        Ok(posts)
    }

    pub fn get_by_id(&self, user_id: Uuid, id: Uuid) -> Result<Post> {
        self.db
            .with_conn(|conn| posts::find(conn, user_id, id))?
            .ok_or(ApiError::NotFound(ENTITY))
    }

    pub fn update(&self, user_id: Uuid, id: Uuid, req: PostRequest) -> Result<Post> {
        let mut post = self.get_by_id(user_id, id)?;
        let (urn, channel) = self.validate(user_id, &req)?;

        post.urn = urn;
        post.channel = channel.channel_ref();
        post.updated_at = self.clock.now();

        if !self.db.with_conn_mut(|conn| posts::update(conn, user_id, &post))? {
            return Err(ApiError::NotFound(ENTITY));
        }
        Ok(post)
    }

    pub fn delete(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        if !self.db.with_conn_mut(|conn| posts::delete(conn, user_id, id))? {
            return Err(ApiError::NotFound(ENTITY));
        }
        info!("Deleted post {} for user {}", id, user_id);
        Ok(())
    }
}

// -- Handlers --

pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): JsonBody<PostRequest>,
) -> Result<impl IntoResponse> {
    let post = state.posts().create(claims.sub, req)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(201, "Post created successfully", post))))
}

pub async fn list_posts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(filter): Query<ChannelFilter>,
) -> Result<impl IntoResponse> {
    let store = state.posts();
    let posts = match filter.channel_name.as_deref() {
        Some(name) => store.list_by_channel(claims.sub, name)?,
        None => store.list(claims.sub)?,
    };
    Ok(Json(ApiResponse::ok(200, "Posts fetched successfully", posts)))
}

pub async fn get_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let post = state.posts().get_by_id(claims.sub, parse_id(&id, ENTITY)?)?;
    Ok(Json(ApiResponse::ok(200, "Post fetched successfully", post)))
}

pub async fn update_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    WithRejection(Json(req), _): JsonBody<PostRequest>,
) -> Result<impl IntoResponse> {
    let post = state.posts().update(claims.sub, parse_id(&id, ENTITY)?, req)?;
    Ok(Json(ApiResponse::ok(200, "Post updated successfully", post)))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.posts().delete(claims.sub, parse_id(&id, ENTITY)?)?;
    Ok(StatusCode::NO_CONTENT)
}
