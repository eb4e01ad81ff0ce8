use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use herald_db::{Database, ideas};
use herald_types::{
    api::{ApiResponse, Claims, IdeaRequest},
    models::Idea,
};
use tracing::info;
use uuid::Uuid;

use crate::auth::AppState;
use crate::clock::Clock;
use crate::error::{ApiError, JsonBody, Result, parse_id, present};

const ENTITY: &str = "Idea";

/// Draft notes. Every lookup is scoped to the owner, so another user's
/// idea is simply not found.
pub struct IdeaStore<'a> {
    db: &'a Database,
    clock: &'a dyn Clock,
}

impl<'a> IdeaStore<'a> {
    pub fn new(db: &'a Database, clock: &'a dyn Clock) -> Self {
        Self { db, clock }
    }

    pub fn create(&self, user_id: Uuid, req: IdeaRequest) -> Result<Idea> {
        let content = present(req.content.as_deref());
        let image_url = present(req.image_url.as_deref());
        let (Some(content), Some(image_url)) = (content, image_url) else {
            let missing: Vec<_> = [("content", content), ("imageUrl", image_url)]
                .into_iter()
                .filter_map(|(field, value)| value.is_none().then_some(field))
                .collect();
            return Err(ApiError::missing(&missing));
        };

        let now = self.clock.now();
        let idea = Idea {
            id: Uuid::new_v4(),
            user_id,
            content: content.to_string(),
            image_url: image_url.to_string(),
            created_at: now,
            updated_at: now,
        };

        self.db.with_conn_mut(|conn| ideas::insert(conn, &idea))?;
        info!("Created idea {} for user {}", idea.id, user_id);
        Ok(idea)
    }

    /// Newest first.
    pub fn list(&self, user_id: Uuid) -> Result<Vec<Idea>> {
        Ok(self.db.with_conn(|conn| ideas::list(conn, user_id))?)
    }

    pub fn get(&self, user_id: Uuid, id: Uuid) -> Result<Idea> {
        self.db
            .with_conn(|conn| ideas::find(conn, user_id, id))?
            .ok_or(ApiError::NotFound(ENTITY))
    }

    pub fn update(&self, user_id: Uuid, id: Uuid, req: IdeaRequest) -> Result<Idea> {
        let content = present(req.content.as_deref());
        let image_url = present(req.image_url.as_deref());
        if content.is_none() && image_url.is_none() {
            return Err(ApiError::Validation("Either content or imageUrl is required".into()));
        }

        let mut idea = self.get(user_id, id)?;
        if let Some(content) = content {
            idea.content = content.to_string();
        }
        if let Some(image_url) = image_url {
            idea.image_url = image_url.to_string();
        }
        idea.updated_at = self.clock.now();

        if !self.db.with_conn_mut(|conn| ideas::update(conn, &idea))? {
            return Err(ApiError::NotFound(ENTITY));
        }
        Ok(idea)
    }

    /// Returns the idea that was removed.
    pub fn delete(&self, user_id: Uuid, id: Uuid) -> Result<Idea> {
        let idea = self.get(user_id, id)?;
        if !self.db.with_conn_mut(|conn| ideas::delete(conn, user_id, id))? {
            return Err(ApiError::NotFound(ENTITY));
        }
        info!("Deleted idea {} for user {}", id, user_id);
        Ok(idea)
    }
}

// -- Handlers --

pub async fn create_idea(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): JsonBody<IdeaRequest>,
) -> Result<impl IntoResponse> {
    let idea = state.ideas().create(claims.sub, req)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(201, "Idea created successfully", idea))))
}

pub async fn list_ideas(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let ideas = state.ideas().list(claims.sub)?;
    Ok(Json(ApiResponse::ok(200, "Ideas fetched successfully", ideas)))
}

pub async fn get_idea(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let idea = state.ideas().get(claims.sub, parse_id(&id, ENTITY)?)?;
    Ok(Json(ApiResponse::ok(200, "Idea fetched successfully", idea)))
}

pub async fn update_idea(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    WithRejection(Json(req), _): JsonBody<IdeaRequest>,
) -> Result<impl IntoResponse> {
    let idea = state.ideas().update(claims.sub, parse_id(&id, ENTITY)?, req)?;
    Ok(Json(ApiResponse::ok(200, "Idea updated successfully", idea)))
}

pub async fn delete_idea(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let idea = state.ideas().delete(claims.sub, parse_id(&id, ENTITY)?)?;
    Ok(Json(ApiResponse::ok(200, "Idea deleted successfully", idea)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{TimeDelta, Utc};

    fn setup() -> (Database, FixedClock, Uuid) {
        let db = Database::open_in_memory().unwrap();
        let user = Uuid::new_v4();
        db.create_user(user, "u@example.com", "hash", Utc::now()).unwrap();
        (db, FixedClock::new(Utc::now()), user)
    }

    fn req(content: Option<&str>, image: Option<&str>) -> IdeaRequest {
        IdeaRequest { content: content.map(Into::into), image_url: image.map(Into::into) }
    }

    #[test]
    fn list_is_newest_first() {
        let (db, clock, user) = setup();
        let store = IdeaStore::new(&db, &clock);

        let first = store.create(user, req(Some("one"), Some("1.png"))).unwrap();
        clock.advance(TimeDelta::minutes(1));
        let second = store.create(user, req(Some("two"), Some("2.png"))).unwrap();

        let ids: Vec<_> = store.list(user).unwrap().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn create_needs_content_and_image() {
        let (db, clock, user) = setup();
        let store = IdeaStore::new(&db, &clock);

        let err = store.create(user, req(None, Some(" "))).unwrap_err();
        assert_eq!(err.to_string(), "Missing required field(s): content, imageUrl");
    }

    #[test]
    fn update_needs_a_field_and_keeps_the_rest() {
        let (db, clock, user) = setup();
        let store = IdeaStore::new(&db, &clock);
        let idea = store.create(user, req(Some("draft"), Some("a.png"))).unwrap();

        assert!(matches!(
            store.update(user, idea.id, req(None, None)),
            Err(ApiError::Validation(_))
        ));

        let updated = store.update(user, idea.id, req(Some("final"), None)).unwrap();
        assert_eq!(updated.content, "final");
        assert_eq!(updated.image_url, "a.png");
        assert_eq!(store.get(user, idea.id).unwrap(), updated);
    }

    #[test]
    fn another_users_idea_is_not_found() {
        let (db, clock, user) = setup();
        let store = IdeaStore::new(&db, &clock);
        let idea = store.create(user, req(Some("secret"), Some("s.png"))).unwrap();
        let other = Uuid::new_v4();

        assert!(matches!(store.get(other, idea.id), Err(ApiError::NotFound(_))));
        assert!(matches!(store.delete(other, idea.id), Err(ApiError::NotFound(_))));
        assert!(matches!(
            store.update(other, idea.id, req(Some("x"), None)),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn delete_returns_the_removed_idea() {
        let (db, clock, user) = setup();
        let store = IdeaStore::new(&db, &clock);
        let idea = store.create(user, req(Some("gone"), Some("g.png"))).unwrap();

        assert_eq!(store.delete(user, idea.id).unwrap(), idea);
        assert!(store.list(user).unwrap().is_empty());
    }
}
