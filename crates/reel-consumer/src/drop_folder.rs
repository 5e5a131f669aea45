//! Dashboard uploads into producer drop folders.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use reel_models::is_safe_filename;
use serde::Serialize;
use tracing::info;

use crate::error::{ApiError, ApiResult};

/// Where a dashboard upload was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DropReceipt {
    pub folder: String,
    pub filename: String,
}

/// Spreads dashboard uploads across the producer drop folders round-robin.
///
/// Files are written under a hidden `.name.part` name and renamed into
/// place, so a watcher never sees a partially written file.
#[derive(Debug)]
pub struct DropRouter {
    folders: Vec<PathBuf>,
    next: AtomicUsize,
}

impl DropRouter {
    pub fn new(folders: Vec<PathBuf>) -> Self {
        Self {
            folders,
            next: AtomicUsize::new(0),
        }
    }

    pub fn folders(&self) -> &[PathBuf] {
        &self.folders
    }

    /// Create every drop folder that does not exist yet.
    pub async fn ensure(&self) -> std::io::Result<()> {
        for folder in &self.folders {
            tokio::fs::create_dir_all(folder).await?;
        }
        Ok(())
    }

    fn next_folder(&self) -> Option<&Path> {
        if self.folders.is_empty() {
            return None;
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.folders.len();
        Some(&self.folders[index])
    }

    /// Write `data` as `filename` into the next drop folder.
    pub async fn deposit(&self, filename: &str, data: Bytes) -> ApiResult<DropReceipt> {
        if !is_safe_filename(filename) || filename.starts_with('.') {
            return Err(ApiError::bad_request(format!("Invalid filename: {:?}", filename)));
        }
        let folder = self
            .next_folder()
            .ok_or_else(|| ApiError::internal("no producer folders configured"))?;

        let part = folder.join(format!(".{}.part", filename));
        let target = folder.join(filename);
        tokio::fs::write(&part, &data).await?;
        if let Err(e) = tokio::fs::rename(&part, &target).await {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(e.into());
        }

        let folder_name = folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!(
            folder = %folder_name,
            filename = %filename,
            bytes = data.len(),
            "Dashboard upload deposited"
        );

        Ok(DropReceipt {
            folder: folder_name,
            filename: filename.to_string(),
        })
    }
}
