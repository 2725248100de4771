//! Async access to the files of a gallery root.
//!
//! Every resource the gallery needs (manifest, images, story text) is addressed
//! by a `/`-separated path relative to the root. Reads never leave the root.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use tracing::trace;

use crate::error::FetchError;

#[derive(Debug, Clone)]
pub struct GallerySource {
    root: PathBuf,
}

impl GallerySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a relative resource path onto the filesystem.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, FetchError> {
        let relative_path = Path::new(relative);
        let confined = relative_path
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
        if relative.is_empty() || !confined {
            return Err(FetchError::OutsideRoot(relative.to_string()));
        }
        Ok(self.root.join(relative_path))
    }

    /// Reads a text resource.
    pub async fn fetch_text(&self, relative: &str) -> Result<String, FetchError> {
        let path = self.resolve(relative)?;
        trace!(?path, "Fetching text resource");
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(text),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(FetchError::NotFound(relative.to_string()))
            }
            Err(source) => Err(FetchError::Io {
                path: relative.to_string(),
                source,
            }),
        }
    }

    /// Checks that a resource exists without reading it.
    pub async fn probe(&self, relative: &str) -> bool {
        let Ok(path) = self.resolve(relative) else {
            return false;
        };
        tokio::fs::metadata(&path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }
}
