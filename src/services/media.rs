//! Image ingestion: uploaded bytes are forwarded to an external image host.
//!
//! A failed upload never fails the surrounding request; the caller simply
//! proceeds without a new image.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::config::CloudinaryConfig;

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Bytes,
}

#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Store the image under `folder` and return its public URL.
    async fn upload(&self, folder: &str, image: &ImageUpload) -> anyhow::Result<String>;
}

/// Upload `image` if present, degrading to `None` when the host fails.
pub async fn ingest(host: &dyn ImageHost, folder: &str, image: Option<ImageUpload>) -> Option<String> {
    let image = image?;
    match host.upload(folder, &image).await {
        Ok(url) => {
            tracing::info!(folder, url = %url, "image uploaded");
            Some(url)
        }
        Err(err) => {
            tracing::warn!(
                folder,
                bytes = image.bytes.len(),
                error = %err,
                "image upload failed, continuing without image"
            );
            None
        }
    }
}

pub struct CloudinaryHost {
    client: reqwest::Client,
    config: CloudinaryConfig,
}

#[derive(Deserialize)]
struct CloudinaryUploadResponse {
    secure_url: String,
}

impl CloudinaryHost {
    pub fn new(config: CloudinaryConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn signature(&self, folder: &str, timestamp: i64) -> String {
        let payload = format!(
            "folder={folder}&timestamp={timestamp}{}",
            self.config.api_secret
        );
        hex::encode(Sha256::digest(payload.as_bytes()))
    }
}

#[async_trait]
impl ImageHost for CloudinaryHost {
    async fn upload(&self, folder: &str, image: &ImageUpload) -> anyhow::Result<String> {
        let timestamp = Utc::now().timestamp();
        let file_name = image
            .file_name
            .clone()
            .unwrap_or_else(|| "upload".to_string());
        let file = reqwest::multipart::Part::bytes(image.bytes.to_vec())
            .file_name(file_name)
            .mime_str(&image.content_type)?;

        let form = reqwest::multipart::Form::new()
            .part("file", file)
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp.to_string())
            .text("folder", folder.to_string())
            .text("signature_algorithm", "sha256")
            .text("signature", self.signature(folder, timestamp));

        let url = format!(
            "https://api.cloudinary.com/v1_1/{}/image/upload",
            self.config.cloud_name
        );
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .json::<CloudinaryUploadResponse>()
            .await?;

        Ok(response.secure_url)
    }
}

/// Used when no image host is configured; every upload fails.
pub struct DisabledImageHost;

#[async_trait]
impl ImageHost for DisabledImageHost {
    async fn upload(&self, _folder: &str, _image: &ImageUpload) -> anyhow::Result<String> {
        anyhow::bail!("image host is not configured")
    }
}
