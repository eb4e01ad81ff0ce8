use std::path::PathBuf;

use thiserror::Error;

/// Placeholder secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "secret",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is unset or still a placeholder")]
    InsecureSecret(&'static str),

    #[error("{var} has an invalid value {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

/// Client credentials of an OAuth app registered with a provider.
#[derive(Debug, Clone)]
pub struct OAuthAppSettings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,
    pub cors_origin: Option<String>,
    pub body_limit_bytes: usize,
    pub media_dir: PathBuf,
    pub media_base_url: String,
    pub cloudinary: Option<CloudinaryConfig>,
    pub linkedin: Option<OAuthAppSettings>,
    pub youtube: Option<OAuthAppSettings>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let secret = |key: &'static str| match get(key) {
            Some(v) if !PLACEHOLDER_SECRETS.contains(&v.as_str()) => Ok(v),
            _ => Err(ConfigError::InsecureSecret(key)),
        };

        let cloudinary = match (
            get("CLOUDINARY_CLOUD_NAME"),
            get("CLOUDINARY_API_KEY"),
            get("CLOUDINARY_API_SECRET"),
        ) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryConfig {
                cloud_name,
                api_key,
                api_secret,
            }),
            _ => None,
        };

        let oauth_app = |prefix: &str| match (
            get(format!("{prefix}_CLIENT_ID").as_str()),
            get(format!("{prefix}_CLIENT_SECRET").as_str()),
            get(format!("{prefix}_REDIRECT_URI").as_str()),
        ) {
            (Some(client_id), Some(client_secret), Some(redirect_uri)) => Some(OAuthAppSettings {
                client_id,
                client_secret,
                redirect_uri,
            }),
            _ => None,
        };

        Ok(Self {
            host: or("HERALD_HOST", "0.0.0.0"),
            port: parse("HERALD_PORT", or("HERALD_PORT", "8000"))?,
            db_path: or("HERALD_DB_PATH", "herald.db").into(),
            access_token_secret: secret("HERALD_ACCESS_TOKEN_SECRET")?,
            refresh_token_secret: secret("HERALD_REFRESH_TOKEN_SECRET")?,
            access_token_ttl_minutes: parse(
                "HERALD_ACCESS_TOKEN_TTL_MINUTES",
                or("HERALD_ACCESS_TOKEN_TTL_MINUTES", "1440"),
            )?,
            refresh_token_ttl_days: parse(
                "HERALD_REFRESH_TOKEN_TTL_DAYS",
                or("HERALD_REFRESH_TOKEN_TTL_DAYS", "10"),
            )?,
            cors_origin: get("HERALD_CORS_ORIGIN"),
            body_limit_bytes: parse(
                "HERALD_BODY_LIMIT_BYTES",
                or("HERALD_BODY_LIMIT_BYTES", "16777216"),
            )?,
            media_dir: or("HERALD_MEDIA_DIR", "./media").into(),
            media_base_url: or("HERALD_MEDIA_BASE_URL", "/media"),
            cloudinary,
            linkedin: oauth_app("LINKEDIN"),
            youtube: oauth_app("YOUTUBE"),
        })
    }
}

fn parse<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid { var, value })
}
