//! Cloudinary upload API client.
//!
//! Requests are signed: the parameters (excluding `file`, `api_key` and
//! `signature`) are sorted by name, joined as `k=v&k=v`, the API secret is
//! appended and the whole string is hashed with SHA-256.

use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{debug, warn};

use super::{DetectedType, MediaFile, MediaFolder, MediaKind, UploadedAsset};
use crate::config::CloudinaryConfig;
use crate::error::{AppError, Result};

/// Signed client for one Cloudinary cloud
pub struct CloudinaryClient {
    http: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
    api_base: String,
    delivery_base: String,
    folder_root: String,
}

impl std::fmt::Debug for CloudinaryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryClient")
            .field("cloud_name", &self.cloud_name)
            .field("api_base", &self.api_base)
            .field("folder_root", &self.folder_root)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    secure_url: String,
    resource_type: String,
    #[serde(default)]
    duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

impl CloudinaryClient {
    pub fn new(config: &CloudinaryConfig, folder_root: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            delivery_base: config.delivery_base.trim_end_matches('/').to_string(),
            folder_root: folder_root.to_string(),
        })
    }

    fn endpoint(&self, resource: &str, action: &str) -> String {
        format!("{}/{}/{}/{}", self.api_base, self.cloud_name, resource, action)
    }

    fn signed_form(&self, params: &[(&str, String)]) -> Form {
        let signature = sign_params(params, &self.api_secret);
        let mut form = Form::new()
            .text("api_key", self.api_key.clone())
            .text("signature", signature);
        for (key, value) in params {
            form = form.text(key.to_string(), value.clone());
        }
        form
    }

    pub async fn upload(
        &self,
        file: &MediaFile,
        detected: &DetectedType,
        folder: MediaFolder,
    ) -> Result<UploadedAsset> {
        let params = [
            ("folder", format!("{}/{}", self.folder_root, folder.as_str())),
            ("timestamp", Utc::now().timestamp().to_string()),
        ];

        let file_name = file
            .file_name
            .clone()
            .unwrap_or_else(|| format!("upload.{}", detected.extension));
        let part = Part::bytes(file.data.to_vec())
            .file_name(file_name)
            .mime_str(&detected.mime)
            .map_err(|e| AppError::internal(format!("Invalid MIME type: {}", e)))?;
        let form = self.signed_form(&params).part("file", part);

        let response = self
            .http
            .post(self.endpoint("auto", "upload"))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Cloudinary upload rejected");
            return Err(AppError::media_host(format!(
                "Upload failed: HTTP {}",
                status
            )));
        }

        let body: UploadResponse = response.json().await?;
        let resource_type = if body.resource_type == "video" {
            MediaKind::Video
        } else {
            MediaKind::Image
        };

        Ok(UploadedAsset {
            url: body.secure_url,
            public_id: body.public_id,
            resource_type,
            duration: body.duration,
        })
    }

    pub async fn destroy(&self, public_id: &str, kind: MediaKind) -> Result<()> {
        let params = [
            ("public_id", public_id.to_string()),
            ("timestamp", Utc::now().timestamp().to_string()),
        ];

        let response = self
            .http
            .post(self.endpoint(kind.as_str(), "destroy"))
            .multipart(self.signed_form(&params))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::media_host(format!(
                "Destroy failed: HTTP {}",
                status
            )));
        }

        let body: DestroyResponse = response.json().await?;
        debug!(public_id = %public_id, result = %body.result, "Cloudinary destroy");
        Ok(())
    }

    /// First frame of an uploaded video, delivered as JPEG
    pub fn video_thumbnail(&self, public_id: &str) -> String {
        format!(
            "{}/{}/video/upload/so_0/{}.jpg",
            self.delivery_base, self.cloud_name, public_id
        )
    }
}

/// Signature over `params` for the given API secret
pub fn sign_params(params: &[(&str, String)], secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let joined = sorted
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");

    hex::encode(Sha256::digest(format!("{}{}", joined, secret).as_bytes()))
}

/// Public id from a delivery URL such as
/// `https://res.cloudinary.com/demo/image/upload/v1712/Videotube/Avatars/abc.png`
pub fn public_id_from_url(url: &str) -> Option<String> {
    let (_, rest) = url.split_once("/upload/")?;
    let mut segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();

    // Drop the version segment (`v` followed by digits)
    if segments
        .first()
        .is_some_and(|s| s.len() > 1 && s.starts_with('v') && s[1..].bytes().all(|b| b.is_ascii_digit()))
    {
        segments.remove(0);
    }

    let last = segments.pop()?;
    let stem = last.rsplit_once('.').map_or(last, |(stem, _)| stem);
    segments.push(stem);

    Some(segments.join("/"))
}
