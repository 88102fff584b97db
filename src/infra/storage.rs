//! Filesystem-backed storage for generated report artifacts.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::domain::artifact::ArtifactName;

/// Errors that can occur while interacting with the artifact store.
#[derive(Debug, Error)]
pub enum ArtifactStoreError {
    #[error("invalid artifact path")]
    InvalidPath,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Transient artifact files rooted in a single directory.
#[derive(Debug)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Initialise storage rooted at the provided directory, creating it if necessary.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Write a complete artifact.
    ///
    /// Bytes land in a staging file first and are renamed into place, so the
    /// final path holds either the whole document or nothing at all.
    pub async fn store(&self, name: &ArtifactName, bytes: &[u8]) -> Result<(), ArtifactStoreError> {
        let target = self.resolve(name.as_str())?;
        let staging = self.resolve(&format!("{name}.partial"))?;

        let outcome = write_all(&staging, bytes).await;
        if let Err(err) = outcome {
            let _ = fs::remove_file(&staging).await;
            return Err(ArtifactStoreError::Io(err));
        }

        if let Err(err) = fs::rename(&staging, &target).await {
            let _ = fs::remove_file(&staging).await;
            return Err(ArtifactStoreError::Io(err));
        }

        Ok(())
    }

    /// Read the artifact into memory.
    pub async fn read(&self, name: &ArtifactName) -> Result<Bytes, ArtifactStoreError> {
        let absolute = self.resolve(name.as_str())?;
        let data = fs::read(absolute).await?;
        Ok(Bytes::from(data))
    }

    /// Remove the artifact. Missing files are treated as success, so a
    /// concurrent or repeated removal is harmless.
    pub async fn remove(&self, name: &ArtifactName) -> Result<(), ArtifactStoreError> {
        let absolute = self.resolve(name.as_str())?;
        match fs::remove_file(&absolute).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(ArtifactStoreError::Io(err)),
        }
    }

    /// Resolve the absolute filesystem path for an artifact name.
    ///
    /// Generated names are safe by construction; this still refuses absolute
    /// paths and parent components in case a name arrives from elsewhere.
    fn resolve(&self, stored: &str) -> Result<PathBuf, ArtifactStoreError> {
        let relative = Path::new(stored);
        if relative.is_absolute()
            || relative
                .components()
                .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(ArtifactStoreError::InvalidPath);
        }

        Ok(self.root.join(relative))
    }
}

async fn write_all(path: &Path, bytes: &[u8]) -> Result<(), std::io::Error> {
    let mut file = fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    Ok(())
}
