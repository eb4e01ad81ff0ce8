mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{
    HeaderValue, Method,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use chrono::TimeDelta;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use herald_api::auth::{AppState, AppStateInner, TokenConfig};
use herald_api::clock::SystemClock;
use herald_api::linkedin::{LinkedInClient, LinkedInConfig};
use herald_api::media::{
    ALT_TEXT_HEADER, CloudinaryCredentials, CloudinaryMedia, FILE_NAME_HEADER, LocalMedia,
    MediaStorage,
};
use herald_api::youtube::{YouTubeClient, YouTubeConfig};
use herald_db::Database;

use crate::config::{Config, ConfigError};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "herald=debug,herald_api=debug,herald_db=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(ConfigError::InsecureSecret(var)) => {
            eprintln!("FATAL: {var} is unset or still a placeholder.");
            eprintln!("       Set it in your .env file and restart.");
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    let db = Database::open(&config.db_path)?;
    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;

    let media = match &config.cloudinary {
        Some(c) => {
            info!("Media uploads go to Cloudinary cloud {}", c.cloud_name);
            MediaStorage::Cloudinary(CloudinaryMedia::new(
                http.clone(),
                CloudinaryCredentials {
                    cloud_name: c.cloud_name.clone(),
                    api_key: c.api_key.clone(),
                    api_secret: c.api_secret.clone(),
                },
            ))
        }
        None => MediaStorage::Local(
            LocalMedia::new(config.media_dir.clone(), &config.media_base_url).await?,
        ),
    };

    let linkedin = config.linkedin.as_ref().map(|l| {
        LinkedInClient::new(
            http.clone(),
            LinkedInConfig {
                client_id: l.client_id.clone(),
                client_secret: l.client_secret.clone(),
                redirect_uri: l.redirect_uri.clone(),
            },
        )
    });
    if linkedin.is_none() {
        warn!("LinkedIn credentials not set, the LinkedIn proxy will answer 503");
    }

    let youtube = config.youtube.as_ref().map(|y| {
        YouTubeClient::new(
            http.clone(),
            YouTubeConfig {
                client_id: y.client_id.clone(),
                client_secret: y.client_secret.clone(),
                redirect_uri: y.redirect_uri.clone(),
            },
        )
    });
    if youtube.is_none() {
        warn!("YouTube credentials not set, the YouTube proxy will answer 503");
    }

    let state: AppState = Arc::new(AppStateInner {
        db,
        clock: Arc::new(SystemClock),
        tokens: TokenConfig {
            access_secret: config.access_token_secret.clone(),
            refresh_secret: config.refresh_token_secret.clone(),
            access_ttl: TimeDelta::minutes(config.access_token_ttl_minutes),
            refresh_ttl: TimeDelta::days(config.refresh_token_ttl_days),
        },
        media,
        linkedin,
        youtube,
    });

    let cors = match &config.cors_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(AllowOrigin::exact(HeaderValue::from_str(origin)?))
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([
                AUTHORIZATION,
                CONTENT_TYPE,
                FILE_NAME_HEADER.parse()?,
                ALT_TEXT_HEADER.parse()?,
            ])
            .allow_credentials(true),
        None => CorsLayer::permissive(),
    };

    let app = herald_api::router(state)
        .layer(DefaultBodyLimit::max(config.body_limit_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Herald listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("SIGTERM handler unavailable ({}), waiting for Ctrl+C", e);
                ctrl_c.await.ok();
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
