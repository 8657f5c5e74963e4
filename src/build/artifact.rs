//! Storing build outputs

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::domain::RepoRef;
use crate::error::{DeliveryError, Result};
use crate::id::short_sha;

/// Identifies the application an artifact belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    pub name: String,
    pub version: String,
    pub repo: RepoRef,
}

impl AppInfo {
    /// Name from the repository, version from the short sha
    pub fn from_repo(repo: &RepoRef) -> Self {
        Self {
            name: repo.repo.clone(),
            version: short_sha(&repo.sha).to_string(),
            repo: repo.clone(),
        }
    }
}

/// Persists a produced file and returns a URL for it
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn store_file(&self, app: &AppInfo, file: &Path) -> Result<String>;
}

/// Copies artifacts into a directory tree: `{root}/{owner}/{repo}/{version}/{hash}-{file}`
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn store_file(&self, app: &AppInfo, file: &Path) -> Result<String> {
        let bytes = tokio::fs::read(file)
            .await
            .map_err(|e| DeliveryError::Artifact(format!("Failed to read {}: {}", file.display(), e)))?;
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| DeliveryError::Artifact(format!("{} has no file name", file.display())))?;

        let hash = hex::encode(Sha256::digest(&bytes));
        let dir = self.root.join(&app.repo.owner).join(&app.name).join(&app.version);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| DeliveryError::Artifact(format!("Failed to create {}: {}", dir.display(), e)))?;

        let target = dir.join(format!("{}-{}", &hash[..12], file_name));
        tokio::fs::write(&target, &bytes)
            .await
            .map_err(|e| DeliveryError::Artifact(format!("Failed to write {}: {}", target.display(), e)))?;

        log::info!("Stored artifact {} ({} bytes)", target.display(), bytes.len());
        Ok(format!("file://{}", target.display()))
    }
}
