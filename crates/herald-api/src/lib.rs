pub mod auth;
pub mod channels;
pub mod clock;
pub mod error;
pub mod ideas;
pub mod linkedin;
pub mod media;
pub mod middleware;
pub mod posts;
pub mod scheduled_posts;
pub mod time_of_day;
mod upstream;
pub mod youtube;

use axum::{
    Json, Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use herald_types::api::HealthResponse;
use tower_http::services::ServeDir;

use auth::AppState;
use media::MediaStorage;

/// Every route of the service. Cross-cutting layers (CORS, tracing, body
/// limit) are added by the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/api/v1/users/register", post(auth::register))
        .route("/api/v1/users/login", post(auth::login))
        .route("/api/v1/users/refresh-token", post(auth::refresh_token))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/api/v1/users/logout", post(auth::logout))
        .route("/api/v1/users/change-password", post(auth::change_password))
        .route("/api/v1/users/current-user", get(auth::current_user))
        .route(
            "/api/v1/channels",
            get(channels::list_channels).post(channels::bind_channel),
        )
        .route(
            "/api/v1/channels/{channel_name}",
            get(channels::get_channel).patch(channels::rotate_channel),
        )
        .route(
            "/api/v1/scheduled-posts",
            get(scheduled_posts::list_scheduled_posts)
                .post(scheduled_posts::create_scheduled_post),
        )
        .route(
            "/api/v1/scheduled-posts/{id}",
            get(scheduled_posts::get_scheduled_post)
                .patch(scheduled_posts::update_scheduled_post)
                .delete(scheduled_posts::delete_scheduled_post),
        )
        .route("/api/v1/posts", get(posts::list_posts).post(posts::create_post))
        .route(
            "/api/v1/posts/{id}",
            get(posts::get_post).patch(posts::update_post).delete(posts::delete_post),
        )
        .route("/api/v1/ideas", get(ideas::list_ideas).post(ideas::create_idea))
        .route(
            "/api/v1/ideas/{id}",
            get(ideas::get_idea).patch(ideas::update_idea).delete(ideas::delete_idea),
        )
        .route("/api/v1/media", post(media::upload_media))
        .route("/api/v1/linkedin/access-token", post(linkedin::access_token))
        .route("/api/v1/linkedin/user-info", post(linkedin::user_info))
        .route("/api/v1/youtube", post(youtube::upload_video))
        .route("/api/v1/youtube/auth", post(youtube::authorize_url))
        .route("/api/v1/youtube/analytics", post(youtube::analytics))
        .route_layer(from_fn_with_state(state.clone(), middleware::require_auth))
        .with_state(state.clone());

    let mut app = Router::new().merge(public_routes).merge(protected_routes);

    if let MediaStorage::Local(local) = &state.media {
        if let Some(path) = local.serve_path() {
            app = app.nest_service(path, ServeDir::new(local.dir()));
        }
    }

    app
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
