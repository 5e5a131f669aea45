//! On-disk layout of consumer artifacts.

use std::path::{Path, PathBuf};

use reel_models::is_safe_filename;
use tokio::fs;
use tracing::info;

use crate::error::{MediaError, MediaResult};

pub const UPLOADS_DIR: &str = "uploads";
pub const COMPRESSED_DIR: &str = "compressed";
pub const PREVIEWS_DIR: &str = "previews";

/// Directories holding raw uploads, compressed artifacts and previews.
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    uploads: PathBuf,
    compressed: PathBuf,
    previews: PathBuf,
}

impl ArtifactLayout {
    /// Standard layout under `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            uploads: root.join(UPLOADS_DIR),
            compressed: root.join(COMPRESSED_DIR),
            previews: root.join(PREVIEWS_DIR),
        }
    }

    /// Create any missing directories.
    pub async fn ensure(&self) -> MediaResult<()> {
        for dir in [&self.uploads, &self.compressed, &self.previews] {
            if !fs::try_exists(dir).await? {
                fs::create_dir_all(dir).await?;
                info!("Created directory {}", dir.display());
            }
        }
        Ok(())
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads
    }

    pub fn compressed_dir(&self) -> &Path {
        &self.compressed
    }

    pub fn previews_dir(&self) -> &Path {
        &self.previews
    }

    pub fn upload_path(&self, filename: &str) -> MediaResult<PathBuf> {
        join_checked(&self.uploads, filename)
    }

    pub fn compressed_path(&self, filename: &str) -> MediaResult<PathBuf> {
        join_checked(&self.compressed, filename)
    }

    pub fn preview_path(&self, filename: &str) -> MediaResult<PathBuf> {
        join_checked(&self.previews, filename)
    }
}

fn join_checked(dir: &Path, filename: &str) -> MediaResult<PathBuf> {
    if !is_safe_filename(filename) {
        return Err(MediaError::InvalidFilename(filename.to_string()));
    }
    Ok(dir.join(filename))
}
