use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::{models::upload::UploadFolder, ports::FileStore};
use crate::error::AppError;

const PUBLIC_PREFIX: &str = "/uploads/";
const MAX_EXTENSION_LEN: usize = 16;

/// Stores uploads on the local disk below `root`, which is served at `/uploads`.
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for_url(&self, url: &str) -> Option<PathBuf> {
        let relative = url.strip_prefix(PUBLIC_PREFIX)?;
        let mut parts = relative.split('/');
        let (folder, name) = (parts.next()?, parts.next()?);
        if parts.next().is_some() || !is_safe_segment(folder) || !is_safe_segment(name) {
            return None;
        }
        Some(self.root.join(folder).join(name))
    }
}

fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty() && segment != "." && segment != ".." && !segment.contains('\\')
}

/// Lower-cased ASCII alphanumerics of the original extension, if any survive.
pub fn sanitized_extension(original_filename: &str) -> Option<String> {
    let (_, ext) = original_filename.rsplit_once('.')?;
    let ext: String = ext
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(MAX_EXTENSION_LEN)
        .collect::<String>()
        .to_ascii_lowercase();
    (!ext.is_empty()).then_some(ext)
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn store(&self, bytes: &[u8], original_filename: &str, folder: UploadFolder) -> Result<String, AppError> {
        let dir = self.root.join(folder.as_str());
        tokio::fs::create_dir_all(&dir).await?;

        let name = match sanitized_extension(original_filename) {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };
        tokio::fs::write(dir.join(&name), bytes).await?;

        debug!(folder = folder.as_str(), size = bytes.len(), "Stored upload {}", name);
        Ok(format!("{}{}/{}", PUBLIC_PREFIX, folder.as_str(), name))
    }

    async fn remove(&self, url: &str) -> Result<(), AppError> {
        let Some(path) = self.path_for_url(url) else {
            warn!("Refusing to remove '{}': not a stored upload URL", url);
            return Ok(());
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(e)),
        }
    }
}
