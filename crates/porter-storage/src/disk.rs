//! Local filesystem storage backend
//!
//! The reference backend: operates directly on the local filesystem and
//! accepts both bare paths and `file://`-prefixed ones.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use porter_core::{Error, Result};
use tokio::fs;
use tracing::{debug, instrument};

use crate::StorageBackend;

/// Local filesystem storage backend
///
/// Single-file transfers are byte-for-byte copies; directory transfers are
/// recursive tree copies that preserve structure. Uploads create missing
/// parent directories first, emulating how flat object stores auto-create
/// prefixes.
#[derive(Debug, Clone, Default)]
pub struct DiskBackend;

impl DiskBackend {
    /// Protocol token this backend registers under
    pub const PROTOCOL: &'static str = "file://";

    pub fn new() -> Self {
        Self
    }

    /// Drop a leading `file://` if present, so callers may pass either a
    /// bare filesystem path or a protocol-prefixed one
    pub fn strip_protocol(path: &str) -> &str {
        path.strip_prefix(Self::PROTOCOL).unwrap_or(path)
    }

    /// Create `path` and any missing parents. Tolerates a concurrent create
    /// by another caller: a failed create is fatal only if the path is not
    /// a directory afterward.
    async fn ensure_dir(path: &Path) -> Result<()> {
        if let Err(e) = fs::create_dir_all(path).await {
            let is_dir = fs::metadata(path).await.map(|m| m.is_dir()).unwrap_or(false);
            if !is_dir {
                return Err(Error::Storage {
                    message: format!("Failed to create directory {:?}: {}", path, e),
                });
            }
        }
        Ok(())
    }

    /// Copy a single file, surfacing both paths on failure
    async fn copy_file(from: &Path, to: &Path) -> Result<()> {
        fs::copy(from, to).await.map_err(|e| Error::Storage {
            message: format!("Failed to copy {:?} to {:?}: {}", from, to, e),
        })?;
        Ok(())
    }

    /// Recursively copy a directory tree, creating destination directories
    /// as they are encountered. Iterative walk; no async recursion.
    async fn copy_tree(from: &Path, to: &Path) -> Result<()> {
        let mut stack = vec![(from.to_path_buf(), to.to_path_buf())];
        while let Some((src, dst)) = stack.pop() {
            Self::ensure_dir(&dst).await?;

            let mut entries = fs::read_dir(&src).await.map_err(|e| Error::Storage {
                message: format!("Failed to read directory {:?}: {}", src, e),
            })?;

            while let Some(entry) = entries.next_entry().await.map_err(|e| Error::Storage {
                message: format!("Failed to read directory entry in {:?}: {}", src, e),
            })? {
                let entry_path = entry.path();
                let target = dst.join(entry.file_name());
                let file_type = entry.file_type().await.map_err(|e| Error::Storage {
                    message: format!("Failed to stat {:?}: {}", entry_path, e),
                })?;

                if file_type.is_dir() {
                    stack.push((entry_path, target));
                } else {
                    Self::copy_file(&entry_path, &target).await?;
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for DiskBackend {
    fn name(&self) -> &str {
        "local"
    }

    #[instrument(skip(self), fields(backend = "local"))]
    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(fs::metadata(Self::strip_protocol(path)).await.is_ok())
    }

    #[instrument(skip(self), fields(backend = "local"))]
    async fn download(&self, remote_path: &str, local_path: &str) -> Result<()> {
        let from = Path::new(Self::strip_protocol(remote_path));
        let to = Path::new(Self::strip_protocol(local_path));
        debug!(?from, ?to, "Copying file");
        Self::copy_file(from, to).await
    }

    #[instrument(skip(self), fields(backend = "local"))]
    async fn download_directory(&self, remote_path: &str, local_path: &str) -> Result<()> {
        let from = Self::strip_protocol(remote_path);
        let to = Self::strip_protocol(local_path);
        if from == to {
            // Source and destination designate the same tree
            return Ok(());
        }
        debug!(from, to, "Copying directory tree");
        Self::copy_tree(Path::new(from), Path::new(to)).await
    }

    #[instrument(skip(self), fields(backend = "local"))]
    async fn upload(&self, local_path: &str, remote_path: &str) -> Result<()> {
        let from = Path::new(Self::strip_protocol(local_path));
        let to = Path::new(Self::strip_protocol(remote_path));

        // Emulate an object store's flat namespace by creating the
        // destination prefix on demand
        if let Some(parent) = to.parent() {
            if !parent.as_os_str().is_empty() {
                Self::ensure_dir(parent).await?;
            }
        }
        debug!(?from, ?to, "Copying file");
        Self::copy_file(from, to).await
    }

    #[instrument(skip(self), fields(backend = "local"))]
    async fn upload_directory(&self, local_path: &str, remote_path: &str) -> Result<()> {
        self.download_directory(local_path, remote_path).await
    }

    fn construct_path(&self, add_protocol: bool, segments: &[&str]) -> String {
        let mut joined = PathBuf::new();
        for segment in segments {
            joined.push(segment);
        }
        let joined = joined.to_string_lossy();
        if add_protocol {
            format!("{}{}", Self::PROTOCOL, joined)
        } else {
            joined.into_owned()
        }
    }

    #[instrument(skip(self), fields(backend = "local"))]
    async fn list_dir(&self, path: &str, recursive: bool) -> Result<Vec<String>> {
        let root = PathBuf::from(Self::strip_protocol(path));
        let mut results = Vec::new();

        if !recursive {
            let mut entries = fs::read_dir(&root).await.map_err(|e| Error::Storage {
                message: format!("Failed to read directory {:?}: {}", root, e),
            })?;
            while let Some(entry) = entries.next_entry().await.map_err(|e| Error::Storage {
                message: format!("Failed to read directory entry in {:?}: {}", root, e),
            })? {
                results.push(entry.file_name().to_string_lossy().to_string());
            }
            results.sort();
            return Ok(results);
        }

        let mut stack = vec![root.clone()];
        while let Some(dir) = stack.pop() {
            let mut entries = fs::read_dir(&dir).await.map_err(|e| Error::Storage {
                message: format!("Failed to read directory {:?}: {}", dir, e),
            })?;
            while let Some(entry) = entries.next_entry().await.map_err(|e| Error::Storage {
                message: format!("Failed to read directory entry in {:?}: {}", dir, e),
            })? {
                let entry_path = entry.path();
                let file_type = entry.file_type().await.map_err(|e| Error::Storage {
                    message: format!("Failed to stat {:?}: {}", entry_path, e),
                })?;
                if file_type.is_dir() {
                    stack.push(entry_path);
                } else if let Ok(relative) = entry_path.strip_prefix(&root) {
                    results.push(relative.to_string_lossy().to_string());
                }
            }
        }

        results.sort();
        debug!(count = results.len(), "Listed files");
        Ok(results)
    }
}
