//! Directory-backed blob storage.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use roomchat_protocol::ResourceId;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::ResourceError;

/// Stores uploaded blobs as `<root>/<id>.<extension>`.
///
/// Ids come from an atomic counter, so concurrent [`create`](Self::create)
/// calls never collide and the store needs no lock of its own. Files are
/// opened with `create_new`, which means an id can never overwrite an
/// existing blob even if another process shares the directory.
#[derive(Debug)]
pub struct ResourceStore {
    root: PathBuf,
    extension: String,
    next_id: AtomicU64,
}

impl ResourceStore {
    /// Opens (creating if needed) a store rooted at `root`.
    ///
    /// Existing `<id>.<extension>` files are scanned so that ids keep
    /// increasing across restarts. Other files in the directory are ignored.
    pub async fn open(
        root: impl Into<PathBuf>,
        extension: &str,
    ) -> Result<Self, ResourceError> {
        let root = root.into();
        fs::create_dir_all(&root).await?;

        let mut next_id = 0;
        let mut entries = fs::read_dir(&root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if let Some(id) = parse_file_name(&entry.path(), extension) {
                next_id = next_id.max(id + 1);
            }
        }

        tracing::info!(root = %root.display(), next_id, "resource store opened");
        Ok(Self {
            root,
            extension: extension.to_string(),
            next_id: AtomicU64::new(next_id),
        })
    }

    /// Persists `data` under a fresh id and returns the id.
    pub async fn create(&self, data: &[u8]) -> Result<ResourceId, ResourceError> {
        let id = ResourceId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let path = self.path_for(id);

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        file.write_all(data).await?;
        file.flush().await?;

        tracing::debug!(resource_id = %id, len = data.len(), "resource stored");
        Ok(id)
    }

    /// Reads back the blob stored under `id`.
    ///
    /// # Errors
    /// [`ResourceError::NotFound`] if nothing was ever stored under `id`.
    pub async fn fetch(&self, id: ResourceId) -> Result<Vec<u8>, ResourceError> {
        match fs::read(self.path_for(id)).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(ResourceError::NotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    /// The file a blob with this id lives in.
    pub fn path_for(&self, id: ResourceId) -> PathBuf {
        self.root.join(format!("{}.{}", id.0, self.extension))
    }

    /// The directory this store writes into.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn parse_file_name(path: &Path, extension: &str) -> Option<u64> {
    if path.extension()?.to_str()? != extension {
        return None;
    }
    path.file_stem()?.to_str()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_name_accepts_numeric_stem() {
        assert_eq!(parse_file_name(Path::new("/r/12.bin"), "bin"), Some(12));
    }

    #[test]
    fn test_parse_file_name_rejects_other_files() {
        assert_eq!(parse_file_name(Path::new("/r/12.png"), "bin"), None);
        assert_eq!(parse_file_name(Path::new("/r/notes.bin"), "bin"), None);
        assert_eq!(parse_file_name(Path::new("/r/12"), "bin"), None);
    }
}
