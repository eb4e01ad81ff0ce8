//! Blob storage for post media. Uploads happen before a post is created or
//! updated; the post only ever stores the returned URL.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use herald_types::api::{ApiResponse, Claims};
use herald_types::models::MediaItem;

use crate::auth::AppState;
use crate::clock::Clock;
use crate::error::ApiError;

pub const FILE_NAME_HEADER: &str = "x-file-name";
pub const ALT_TEXT_HEADER: &str = "x-alt-text";

const MAX_NAME_LEN: usize = 100;

pub enum MediaStorage {
    Local(LocalMedia),
    Cloudinary(CloudinaryMedia),
}

impl MediaStorage {
    pub async fn upload(
        &self,
        file_name: &str,
        alt_text: &str,
        data: Bytes,
        now: DateTime<Utc>,
    ) -> Result<MediaItem> {
        let url = match self {
            Self::Local(local) => local.store(file_name, &data).await?,
            Self::Cloudinary(cloudinary) => cloudinary.store(file_name, data, now).await?,
        };
        Ok(MediaItem { url, alt_text: alt_text.to_string() })
    }
}

/// Files on local disk, served back under `base_url`.
pub struct LocalMedia {
    dir: PathBuf,
    base_url: String,
}

impl LocalMedia {
    pub async fn new(dir: PathBuf, base_url: &str) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Media directory: {}", dir.display());
        Ok(Self { dir, base_url: base_url.trim_end_matches('/').to_string() })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Route prefix to serve the directory under, when the base URL is a
    /// path on this server rather than an external host.
    pub fn serve_path(&self) -> Option<&str> {
        self.base_url.starts_with('/').then_some(self.base_url.as_str()).filter(|p| p.len() > 1)
    }

    async fn store(&self, file_name: &str, data: &[u8]) -> Result<String> {
        let stored_name = format!("{}-{}", Uuid::new_v4(), sanitize_file_name(file_name));
        fs::write(self.dir.join(&stored_name), data).await?;
        debug!("Stored {} bytes as {}", data.len(), stored_name);
        Ok(format!("{}/{}", self.base_url, stored_name))
    }
}

/// Cloudinary credentials.
#[derive(Clone)]
pub struct CloudinaryCredentials {
    pub cloud_name: String,
    pub api_key: String,
    /// Never sent over the wire, only used to sign.
    pub api_secret: String,
}

pub struct CloudinaryMedia {
    http: reqwest::Client,
    credentials: CloudinaryCredentials,
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
}

impl CloudinaryMedia {
    pub fn new(http: reqwest::Client, credentials: CloudinaryCredentials) -> Self {
        Self { http, credentials }
    }

    /// Timestamp and signature for an upload of `public_id` at `now`.
    fn signed_fields(&self, public_id: &str, now: DateTime<Utc>) -> (String, String) {
        let timestamp = now.timestamp().to_string();
        let signature = sign(
            &[("public_id", public_id), ("timestamp", timestamp.as_str())],
            &self.credentials.api_secret,
        );
        (timestamp, signature)
    }

    async fn store(&self, file_name: &str, data: Bytes, now: DateTime<Utc>) -> Result<String> {
        let public_id = Uuid::new_v4().to_string();
        let (timestamp, signature) = self.signed_fields(&public_id, now);

        let file = reqwest::multipart::Part::bytes(data.to_vec())
            .file_name(sanitize_file_name(file_name));
        let form = reqwest::multipart::Form::new()
            .text("api_key", self.credentials.api_key.clone())
            .text("public_id", public_id)
            .text("timestamp", timestamp)
            .text("signature", signature)
            .part("file", file);

        let url = format!(
            "https://api.cloudinary.com/v1_1/{}/auto/upload",
            self.credentials.cloud_name
        );
        let resp = self.http.post(url).multipart(form).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("Cloudinary upload failed with {}: {}", status, body);
        }

        let uploaded: UploadResponse = resp.json().await?;
        Ok(uploaded.secure_url)
    }
}

/// Cloudinary request signature: parameters sorted by name, joined as
/// `k=v&k=v`, secret appended, SHA-1, lowercase hex.
fn sign(params: &[(&str, &str)], secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by_key(|(key, _)| *key);

    let joined = sorted
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(joined.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Keep a file name safe to use as a path component.
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .take(MAX_NAME_LEN)
        .collect();

    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() { "file".to_string() } else { trimmed.to_string() }
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

pub async fn upload_media(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let file_name = header_str(&headers, FILE_NAME_HEADER).ok_or_else(|| {
        ApiError::Validation("Missing required header: X-File-Name".into())
    })?;
    if body.is_empty() {
        return Err(ApiError::Validation("Uploaded file is empty".into()));
    }
    let alt_text = header_str(&headers, ALT_TEXT_HEADER).unwrap_or(file_name);

    let size = body.len();
    let item = state.media.upload(file_name, alt_text, body, state.clock.now()).await?;

    info!("User {} uploaded {} ({} bytes) to {}", claims.sub, file_name, size, item.url);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(201, "Media uploaded successfully", item)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_sorts_parameters_before_hashing() {
        let secret = "abcd";
        let a = sign(&[("timestamp", "1315060510"), ("public_id", "sample")], secret);
        let b = sign(&[("public_id", "sample"), ("timestamp", "1315060510")], secret);
        assert_eq!(a, b);

        let mut hasher = Sha1::new();
        hasher.update(b"public_id=sample&timestamp=1315060510abcd");
        assert_eq!(a, hex::encode(hasher.finalize()));
        assert_eq!(a.len(), 40);
    }

    #[test]
    fn cloudinary_signs_with_the_supplied_time() {
        let media = CloudinaryMedia::new(
            reqwest::Client::new(),
            CloudinaryCredentials {
                cloud_name: "demo".into(),
                api_key: "key".into(),
                api_secret: "abcd".into(),
            },
        );
        let at = DateTime::from_timestamp(1_315_060_510, 0).unwrap();

        let (timestamp, signature) = media.signed_fields("sample", at);
        assert_eq!(timestamp, "1315060510");
        assert_eq!(
            signature,
            sign(&[("public_id", "sample"), ("timestamp", "1315060510")], "abcd")
        );
    }

    #[test]
    fn file_names_are_flattened() {
        assert_eq!(sanitize_file_name("photo.png"), "photo.png");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\pics\\my cat.jpg"), "my_cat.jpg");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name("///"), "file");
        assert_eq!(sanitize_file_name(&"x".repeat(500)).len(), MAX_NAME_LEN);
    }

    #[tokio::test]
    async fn local_upload_writes_under_the_media_dir() {
        let dir = std::env::temp_dir().join(format!("herald-media-{}", Uuid::new_v4()));
        let storage = MediaStorage::Local(LocalMedia::new(dir.clone(), "/media/").await.unwrap());

        let item = storage
            .upload("cat pic.png", "a cat", Bytes::from_static(b"png"), Utc::now())
            .await
            .unwrap();
        assert!(item.url.starts_with("/media/"));
        assert!(item.url.ends_with("-cat_pic.png"));
        assert_eq!(item.alt_text, "a cat");

        let stored = item.url.trim_start_matches("/media/");
        assert_eq!(fs::read(dir.join(stored)).await.unwrap(), b"png");

        let _ = fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn serve_path_only_for_local_prefixes() {
        let dir = std::env::temp_dir().join(format!("herald-media-{}", Uuid::new_v4()));
        let local = LocalMedia::new(dir.clone(), "/media").await.unwrap();
        assert_eq!(local.serve_path(), Some("/media"));

        let remote = LocalMedia::new(dir.clone(), "https://cdn.example.com/m").await.unwrap();
        assert_eq!(remote.serve_path(), None);

        let _ = fs::remove_dir_all(&dir).await;
    }
}
