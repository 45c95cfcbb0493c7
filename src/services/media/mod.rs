//! Media host integration.
//!
//! Binary media never touches the database: uploads are validated here and
//! handed to a host which returns a URL and a public id. The public id is
//! stored next to the URL so the asset can be deleted later.
//!
//! Two hosts exist:
//! - [`CloudinaryClient`] - signed uploads to Cloudinary
//! - [`LocalMediaStore`] - files under `data_dir/media`, served by this server

mod cloudinary;
mod local;

pub use cloudinary::{sign_params, CloudinaryClient};
pub use local::LocalMediaStore;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::config::{Config, MediaProvider, UploadConfig};
use crate::error::{AppError, Result};

/// Broad class of an uploaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

/// Folder an upload is filed under on the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFolder {
    Avatars,
    CoverImages,
    Videos,
    Thumbnails,
}

impl MediaFolder {
    pub const ALL: [MediaFolder; 4] = [
        Self::Avatars,
        Self::CoverImages,
        Self::Videos,
        Self::Thumbnails,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Avatars => "Avatars",
            Self::CoverImages => "CoverImages",
            Self::Videos => "Videos",
            Self::Thumbnails => "Thumbnails",
        }
    }

    /// Kind of file the folder accepts
    pub fn kind(&self) -> MediaKind {
        match self {
            Self::Videos => MediaKind::Video,
            _ => MediaKind::Image,
        }
    }
}

/// A file part received in a multipart form
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl MediaFile {
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Type of a file as detected before upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedType {
    pub mime: String,
    pub extension: String,
    pub kind: MediaKind,
}

/// Result of a successful upload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedAsset {
    pub url: String,
    pub public_id: String,
    pub resource_type: MediaKind,
    /// Seconds, reported by hosts that probe videos
    pub duration: Option<f64>,
}

fn kind_of(mime: &str) -> Option<MediaKind> {
    if mime.starts_with("image/") {
        Some(MediaKind::Image)
    } else if mime.starts_with("video/") {
        Some(MediaKind::Video)
    } else {
        None
    }
}

fn extension_of(file_name: Option<&str>) -> Option<String> {
    file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Detect the type of an upload.
///
/// Magic bytes win; the part's content type and then the file name
/// extension are only consulted when `infer` does not recognize the data.
pub fn detect_type(file: &MediaFile) -> Option<DetectedType> {
    if let Some(found) = infer::get(&file.data) {
        if let Some(kind) = kind_of(found.mime_type()) {
            return Some(DetectedType {
                mime: found.mime_type().to_string(),
                extension: found.extension().to_string(),
                kind,
            });
        }
        // Recognized as something that is neither image nor video
        return None;
    }

    let declared = file
        .content_type
        .as_deref()
        .filter(|ct| kind_of(ct).is_some())
        .map(str::to_string)
        .or_else(|| {
            file.file_name
                .as_deref()
                .and_then(|name| mime_guess::from_path(name).first())
                .map(|mime| mime.essence_str().to_string())
        })?;

    let kind = kind_of(&declared)?;
    let extension = extension_of(file.file_name.as_deref())
        .or_else(|| {
            mime_guess::get_mime_extensions_str(&declared)
                .and_then(|exts| exts.first())
                .map(|ext| ext.to_string())
        })
        .unwrap_or_else(|| "bin".to_string());

    Some(DetectedType {
        mime: declared,
        extension,
        kind,
    })
}

/// The configured host
#[derive(Debug)]
pub enum MediaHost {
    Cloudinary(CloudinaryClient),
    Local(LocalMediaStore),
}

/// Validates uploads and forwards them to the configured host
#[derive(Debug)]
pub struct MediaService {
    host: MediaHost,
    limits: UploadConfig,
}

impl MediaService {
    pub async fn new(config: &Config) -> Result<Self> {
        let host = match config.media.provider {
            MediaProvider::Cloudinary => MediaHost::Cloudinary(CloudinaryClient::new(
                &config.media.cloudinary,
                &config.media.folder_root,
            )?),
            MediaProvider::Local => MediaHost::Local(
                LocalMediaStore::new(config.storage.media_path(), &config.server.base_url).await?,
            ),
        };

        let service = Self::with_host(host, config.upload.clone());
        info!(provider = service.provider_name(), "Media host initialized");
        Ok(service)
    }

    pub fn with_host(host: MediaHost, limits: UploadConfig) -> Self {
        Self { host, limits }
    }

    pub fn provider_name(&self) -> &'static str {
        match &self.host {
            MediaHost::Cloudinary(_) => "cloudinary",
            MediaHost::Local(_) => "local",
        }
    }

    /// Check emptiness, type and size of a file destined for `folder`
    pub fn validate(&self, file: &MediaFile, folder: MediaFolder) -> Result<DetectedType> {
        if file.is_empty() {
            return Err(AppError::validation("Uploaded file is empty"));
        }

        let expected = folder.kind();
        let detected = detect_type(file).ok_or_else(|| {
            AppError::unsupported_media_type(format!(
                "Unsupported file type, expected an {} file",
                expected.as_str()
            ))
        })?;

        if detected.kind != expected {
            return Err(AppError::unsupported_media_type(format!(
                "Expected an {} file but got {}",
                expected.as_str(),
                detected.mime
            )));
        }

        let limit = match expected {
            MediaKind::Image => self.limits.max_image_size,
            MediaKind::Video => self.limits.max_video_size,
        };
        if file.len() > limit {
            return Err(AppError::payload_too_large(format!(
                "File size {} exceeds maximum allowed size {}",
                file.len(),
                limit
            )));
        }

        Ok(detected)
    }

    /// Validate and upload a file into `folder`
    pub async fn upload(&self, file: &MediaFile, folder: MediaFolder) -> Result<UploadedAsset> {
        let detected = self.validate(file, folder)?;

        let asset = match &self.host {
            MediaHost::Cloudinary(client) => client.upload(file, &detected, folder).await?,
            MediaHost::Local(store) => store.save(file, &detected, folder).await?,
        };

        info!(
            folder = folder.as_str(),
            public_id = %asset.public_id,
            size = file.len(),
            "Uploaded media"
        );
        Ok(asset)
    }

    /// Remove an asset from the host
    pub async fn delete(&self, public_id: &str, kind: MediaKind) -> Result<()> {
        match &self.host {
            MediaHost::Cloudinary(client) => client.destroy(public_id, kind).await,
            MediaHost::Local(store) => store.remove(public_id).await,
        }
    }

    /// Delete an asset that is no longer referenced. Failures are logged
    /// only: the record has already moved on.
    pub async fn discard(&self, public_id: Option<&str>, url: &str, kind: MediaKind) {
        let public_id = match public_id {
            Some(id) if !id.is_empty() => Some(id.to_string()),
            _ => self.public_id_from_url(url),
        };
        let Some(public_id) = public_id else {
            return;
        };

        if let Err(e) = self.delete(&public_id, kind).await {
            warn!(public_id = %public_id, error = %e, "Failed to delete media asset");
        }
    }

    /// Public id recovered from a delivery URL issued by this host
    pub fn public_id_from_url(&self, url: &str) -> Option<String> {
        match &self.host {
            MediaHost::Cloudinary(_) => cloudinary::public_id_from_url(url),
            MediaHost::Local(store) => store.public_id_from_url(url),
        }
    }

    /// Thumbnail URL derived from an uploaded video, where the host can
    pub fn video_thumbnail(&self, public_id: &str) -> Option<String> {
        match &self.host {
            MediaHost::Cloudinary(client) => Some(client.video_thumbnail(public_id)),
            MediaHost::Local(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Smallest valid-looking headers `infer` recognizes
    const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const MP4: &[u8] = &[
        0x00, 0x00, 0x00, 0x18, b'f', b't', b'y', b'p', b'i', b's', b'o', b'm', 0, 0, 0, 0,
    ];

    fn file(data: &[u8], name: Option<&str>, ct: Option<&str>) -> MediaFile {
        MediaFile {
            file_name: name.map(str::to_string),
            content_type: ct.map(str::to_string),
            data: Bytes::copy_from_slice(data),
        }
    }

    fn limits() -> UploadConfig {
        UploadConfig {
            max_image_size: 16,
            max_video_size: 64,
        }
    }

    async fn local_service(dir: &Path) -> MediaService {
        let store = LocalMediaStore::new(dir.to_path_buf(), "http://localhost:8000")
            .await
            .unwrap();
        MediaService::with_host(MediaHost::Local(store), limits())
    }

    #[test]
    fn test_detect_from_magic_bytes() {
        let detected = detect_type(&file(PNG, Some("avatar.jpg"), Some("image/jpeg"))).unwrap();
        assert_eq!(detected.mime, "image/png");
        assert_eq!(detected.extension, "png");
        assert_eq!(detected.kind, MediaKind::Image);

        let detected = detect_type(&file(MP4, None, None)).unwrap();
        assert_eq!(detected.kind, MediaKind::Video);
        assert_eq!(detected.extension, "mp4");
    }

    #[test]
    fn test_detect_falls_back_to_declared_type() {
        let unknown = b"not a real header";

        let detected = detect_type(&file(unknown, Some("clip.webm"), Some("video/webm"))).unwrap();
        assert_eq!(detected.kind, MediaKind::Video);
        assert_eq!(detected.extension, "webm");

        let detected = detect_type(&file(unknown, Some("photo.gif"), None)).unwrap();
        assert_eq!(detected.mime, "image/gif");

        assert!(detect_type(&file(unknown, Some("notes.txt"), Some("text/plain"))).is_none());
        assert!(detect_type(&file(unknown, None, None)).is_none());
    }

    #[test]
    fn test_detect_rejects_recognized_non_media() {
        let pdf = b"%PDF-1.7 rest";
        assert!(detect_type(&file(pdf, Some("x.png"), Some("image/png"))).is_none());
    }

    #[tokio::test]
    async fn test_validate_kind_and_size() {
        let temp = tempfile::TempDir::new().unwrap();
        let service = local_service(temp.path()).await;

        assert!(service
            .validate(&file(PNG, None, None), MediaFolder::Avatars)
            .is_ok());

        let err = service
            .validate(&file(MP4, None, None), MediaFolder::Avatars)
            .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedMediaType(_)));

        let err = service
            .validate(&file(b"", None, None), MediaFolder::Videos)
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let mut big = PNG.to_vec();
        big.resize(32, 0);
        let err = service
            .validate(&file(&big, None, None), MediaFolder::Thumbnails)
            .unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge(_)));

        assert!(service
            .validate(&file(&big, Some("v.mp4"), Some("video/mp4")), MediaFolder::Videos)
            .is_err());
    }

    #[tokio::test]
    async fn test_discard_uses_url_when_public_id_missing() {
        let temp = tempfile::TempDir::new().unwrap();
        let service = local_service(temp.path()).await;

        let asset = service
            .upload(&file(PNG, Some("a.png"), None), MediaFolder::CoverImages)
            .await
            .unwrap();
        let path = temp.path().join(&asset.public_id);
        assert!(path.exists());

        service.discard(None, &asset.url, MediaKind::Image).await;
        assert!(!path.exists());
    }

    #[test]
    fn test_folder_kinds() {
        assert_eq!(MediaFolder::Videos.kind(), MediaKind::Video);
        assert_eq!(MediaFolder::CoverImages.kind(), MediaKind::Image);
        assert_eq!(MediaFolder::CoverImages.as_str(), "CoverImages");
    }
}
