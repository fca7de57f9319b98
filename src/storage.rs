use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use bytes::Bytes;
use uuid::Uuid;

use crate::config::MediaConfig;

/// A file received from the client, held in memory until it is uploaded.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: String,
    pub content_type: String,
    pub body: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    pub folder: String,
    pub use_filename: bool,
    pub unique_filename: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    pub public_id: String,
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(&self, file: UploadFile, opts: &UploadOptions) -> anyhow::Result<UploadedAsset>;
}

#[derive(Clone)]
pub struct S3MediaStore {
    client: Client,
    bucket: String,
}

impl S3MediaStore {
    pub async fn new(cfg: &MediaConfig) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(Credentials::new(
                &cfg.access_key,
                &cfg.secret_key,
                None,
                None,
                "static",
            ))
            .endpoint_url(&cfg.endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(&cfg.endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            bucket: cfg.bucket.clone(),
        })
    }
}

#[async_trait]
impl MediaStore for S3MediaStore {
    async fn upload(&self, file: UploadFile, opts: &UploadOptions) -> anyhow::Result<UploadedAsset> {
        let public_id = public_id_for(&file.filename, opts);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&public_id)
            .body(ByteStream::from(file.body))
            .content_type(&file.content_type)
            .send()
            .await
            .with_context(|| format!("s3 put_object {}", public_id))?;
        Ok(UploadedAsset { public_id })
    }
}

/// `folder/name`, where `name` is the sanitized file stem (optionally with a
/// random suffix) or a random id when the filename can't be used.
pub fn public_id_for(filename: &str, opts: &UploadOptions) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .map(sanitize)
        .filter(|s| !s.is_empty());

    let name = match stem {
        Some(stem) if opts.use_filename && opts.unique_filename => {
            let suffix = Uuid::new_v4().simple().to_string();
            format!("{}_{}", stem, &suffix[..6])
        }
        Some(stem) if opts.use_filename => stem,
        _ => Uuid::new_v4().simple().to_string(),
    };

    let folder = opts.folder.trim_matches('/');
    if folder.is_empty() {
        name
    } else {
        format!("{}/{}", folder, name)
    }
}

fn sanitize(stem: &str) -> String {
    stem.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .trim_matches('_')
        .to_string()
}
