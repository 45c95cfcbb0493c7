//! Local media host.
//!
//! Stands in for Cloudinary in development and tests. Files are written
//! under the media directory and served by this server at `/media`.
//!
//! ```text
//! data/media/
//! ├── Avatars/
//! │   └── 550e8400-e29b-41d4-a716-446655440000.png
//! ├── CoverImages/
//! ├── Thumbnails/
//! └── Videos/
//!     └── 6fa459ea-ee8a-3ca4-894e-db77e160355e.mp4
//! ```
//!
//! The public id of a file is its path relative to the media directory.

use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use super::{DetectedType, MediaFile, MediaFolder, UploadedAsset};
use crate::error::{AppError, Result};

/// Files on disk below `root`
#[derive(Debug, Clone)]
pub struct LocalMediaStore {
    root: PathBuf,
    /// `{base_url}/media`
    url_prefix: String,
}

impl LocalMediaStore {
    /// Create the store and its folders
    pub async fn new(root: PathBuf, base_url: &str) -> Result<Self> {
        for folder in MediaFolder::ALL {
            let dir = root.join(folder.as_str());
            if !dir.exists() {
                fs::create_dir_all(&dir).await?;
                debug!(path = %dir.display(), "Created media directory");
            }
        }

        info!(root = %root.display(), "Local media store initialized");

        Ok(Self {
            root,
            url_prefix: format!("{}/media", base_url.trim_end_matches('/')),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn save(
        &self,
        file: &MediaFile,
        detected: &DetectedType,
        folder: MediaFolder,
    ) -> Result<UploadedAsset> {
        let public_id = format!("{}/{}.{}", folder.as_str(), Uuid::new_v4(), detected.extension);
        let path = self.root.join(&public_id);

        fs::write(&path, &file.data).await?;

        debug!(path = %path.display(), size = file.data.len(), "Saved media file");

        Ok(UploadedAsset {
            url: format!("{}/{}", self.url_prefix, public_id),
            public_id,
            resource_type: detected.kind,
            duration: None,
        })
    }

    pub async fn remove(&self, public_id: &str) -> Result<()> {
        let path = self.path_for(public_id)?;

        if path.exists() {
            fs::remove_file(&path).await?;
            debug!(path = %path.display(), "Deleted media file");
        }

        Ok(())
    }

    /// Resolve a public id to a file path, refusing anything that could
    /// leave the media directory
    fn path_for(&self, public_id: &str) -> Result<PathBuf> {
        let relative = Path::new(public_id);
        let safe = !public_id.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));

        if !safe {
            return Err(AppError::validation(format!(
                "Invalid media id: {}",
                public_id
            )));
        }

        Ok(self.root.join(relative))
    }

    pub fn public_id_from_url(&self, url: &str) -> Option<String> {
        url.strip_prefix(&self.url_prefix)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|rest| !rest.is_empty())
            .map(str::to_string)
    }
}
