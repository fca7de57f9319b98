use anyhow::Context;
use serde::Deserialize;

use crate::storage::UploadOptions;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

/// S3-compatible bucket that holds fund thumbnails and proofs of payment.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub folder: String,
    pub use_filename: bool,
    pub unique_filename: bool,
}

impl MediaConfig {
    pub fn upload_options(&self) -> UploadOptions {
        UploadOptions {
            folder: self.folder.clone(),
            use_filename: self.use_filename,
            unique_filename: self.unique_filename,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub media: MediaConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "fundraiser".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "fundraiser-users".into()),
        };
        let media = MediaConfig {
            endpoint: std::env::var("MEDIA_ENDPOINT").context("MEDIA_ENDPOINT must be set")?,
            bucket: std::env::var("MEDIA_BUCKET").context("MEDIA_BUCKET must be set")?,
            access_key: std::env::var("MEDIA_ACCESS_KEY").context("MEDIA_ACCESS_KEY must be set")?,
            secret_key: std::env::var("MEDIA_SECRET_KEY").context("MEDIA_SECRET_KEY must be set")?,
            region: std::env::var("MEDIA_REGION").unwrap_or_else(|_| "us-east-1".into()),
            folder: std::env::var("MEDIA_FOLDER").unwrap_or_else(|_| "fundraiser".into()),
            use_filename: parse_flag(std::env::var("MEDIA_USE_FILENAME").ok(), true),
            unique_filename: parse_flag(std::env::var("MEDIA_UNIQUE_FILENAME").ok(), false),
        };
        Ok(Self {
            database_url,
            jwt,
            media,
        })
    }
}

fn parse_flag(raw: Option<String>, default: bool) -> bool {
    match raw.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        _ => default,
    }
}
