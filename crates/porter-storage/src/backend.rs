//! Storage backend trait definition
//!
//! Defines the async interface that all storage backends must implement.

use async_trait::async_trait;
use porter_core::{Error, Result};

/// Async trait for storage backends
///
/// Implementors move files and directory trees between their storage medium
/// and the local filesystem, addressed by plain path strings. A backend owns
/// every path whose protocol prefix is registered to it in the
/// [`BackendRegistry`](crate::BackendRegistry).
///
/// Operations a backend cannot provide must fail with
/// [`Error::UnsupportedOperation`] naming the backend and the operation, so
/// callers can detect capability gaps without inspecting backend internals.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Human-readable backend name, used in registry listings and errors
    fn name(&self) -> &str;

    /// Check whether `path` exists under this backend's semantics
    async fn exists(&self, path: &str) -> Result<bool>;

    /// Copy exactly one file from the backend to the local filesystem
    async fn download(&self, remote_path: &str, local_path: &str) -> Result<()>;

    /// Recursively copy a directory tree from the backend to the local
    /// filesystem, creating `local_path` and any missing parents
    async fn download_directory(&self, remote_path: &str, local_path: &str) -> Result<()>;

    /// Copy a single local file into the backend, creating whatever
    /// intermediate "directory" structure the backend requires
    async fn upload(&self, local_path: &str, remote_path: &str) -> Result<()>;

    /// Recursively copy a local directory tree into the backend
    async fn upload_directory(&self, local_path: &str, remote_path: &str) -> Result<()>;

    /// Join `segments` with the backend's path delimiter; when
    /// `add_protocol` is true, prefix the backend's protocol token
    fn construct_path(&self, add_protocol: bool, segments: &[&str]) -> String;

    /// List a directory: entry names when `recursive` is false, or each
    /// file's path relative to `path` when true. Every call re-scans; the
    /// returned sequence holds no cursor into backend state.
    async fn list_dir(&self, path: &str, recursive: bool) -> Result<Vec<String>> {
        let _ = (path, recursive);
        Err(Error::UnsupportedOperation {
            backend: self.name().to_string(),
            operation: "list_dir".to_string(),
        })
    }
}

impl std::fmt::Debug for dyn StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageBackend")
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}
