//! Storage client orchestrating data movement for the task runtime
//!
//! Wraps a local staging sandbox and a configured default remote backend,
//! and routes arbitrary paths to their owning backend through the registry.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use porter_core::{DataConfig, Error, Result};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{BackendRegistry, DiskBackend, StorageBackend};

/// Name of the staging directory created under the configured sandbox root
const SANDBOX_SUBDIR: &str = "local_porter";

/// Orchestrating storage client
///
/// Holds no caches or queues: every operation is a direct pass-through to
/// exactly one backend call, with [`get_data`](StorageClient::get_data) and
/// [`put_data`](StorageClient::put_data) adding timing and uniform error
/// wrapping on top.
pub struct StorageClient {
    registry: Arc<BackendRegistry>,
    local_sandbox_dir: PathBuf,
    local: Arc<DiskBackend>,
    default_remote: Arc<dyn StorageBackend>,
    raw_output_prefix: String,
}

impl StorageClient {
    /// Create a client staging under `<sandbox_root>/local_porter` and
    /// allocating remote outputs under `raw_output_prefix`.
    ///
    /// The sandbox directory is created eagerly (parents included, tolerant
    /// of pre-existence) and the raw output prefix is resolved to its
    /// backend once, up front.
    pub async fn new(
        registry: Arc<BackendRegistry>,
        sandbox_root: &str,
        raw_output_prefix: &str,
    ) -> Result<Self> {
        if sandbox_root.is_empty() {
            return Err(Error::InvalidConfig {
                message: "sandbox root must be a non-empty local path".to_string(),
            });
        }

        let local_sandbox_dir = Path::new(sandbox_root).join(SANDBOX_SUBDIR);
        fs::create_dir_all(&local_sandbox_dir)
            .await
            .map_err(|e| Error::InvalidConfig {
                message: format!(
                    "Failed to create sandbox directory {:?}: {}",
                    local_sandbox_dir, e
                ),
            })?;

        let default_remote = registry.resolve(raw_output_prefix)?;
        debug!(
            sandbox = ?local_sandbox_dir,
            raw_output_prefix,
            default_remote = default_remote.name(),
            "Storage client ready"
        );

        Ok(Self {
            registry,
            local_sandbox_dir,
            local: Arc::new(DiskBackend::new()),
            default_remote,
            raw_output_prefix: raw_output_prefix.to_string(),
        })
    }

    /// Create a client from a [`DataConfig`]
    pub async fn from_config(registry: Arc<BackendRegistry>, config: &DataConfig) -> Result<Self> {
        Self::new(registry, &config.sandbox_root, &config.raw_output_prefix).await
    }

    /// The staging directory owned by this client
    pub fn local_sandbox_dir(&self) -> &Path {
        &self.local_sandbox_dir
    }

    /// The disk backend used for local staging operations
    pub fn local_backend(&self) -> &Arc<DiskBackend> {
        &self.local
    }

    /// The configured base URI for randomized remote output paths
    pub fn raw_output_prefix(&self) -> &str {
        &self.raw_output_prefix
    }

    /// True if `path` does not refer to the local filesystem
    pub fn is_remote(path: &str) -> bool {
        !(path.starts_with('/') || path.starts_with(DiskBackend::PROTOCOL))
    }

    /// Build `<base>/<32-hex-random>[/<leaf>]`, preserving the hint's final
    /// path segment as the leaf when it has one.
    fn random_path(&self, backend: &dyn StorageBackend, base: &str, hint: Option<&str>) -> String {
        let key = Uuid::new_v4().simple().to_string();
        if let Some(hint) = hint {
            let leaf = hint.rsplit('/').next().unwrap_or("");
            if !leaf.is_empty() {
                return backend.construct_path(false, &[base, &key, leaf]);
            }
            warn!(hint, "No filename detected in hint, generating bare random path");
        }
        backend.construct_path(false, &[base, &key])
    }

    /// Randomized path under the raw output prefix on the default remote
    pub fn random_remote_path(&self, hint: Option<&str>) -> String {
        self.random_path(self.default_remote.as_ref(), &self.raw_output_prefix, hint)
    }

    /// Randomized directory path under the raw output prefix
    pub fn random_remote_directory(&self) -> String {
        self.random_remote_path(None)
    }

    /// Randomized path under the local sandbox
    pub fn random_local_path(&self, hint: Option<&str>) -> String {
        let base = self.local_sandbox_dir.to_string_lossy();
        self.random_path(self.local.as_ref(), &base, hint)
    }

    /// Randomized directory under the local sandbox, created before return
    pub async fn random_local_directory(&self) -> Result<String> {
        let dir = self.random_local_path(None);
        fs::create_dir_all(&dir).await.map_err(|e| Error::Storage {
            message: format!("Failed to create directory {}: {}", dir, e),
        })?;
        Ok(dir)
    }

    /// Check existence of `path` on whichever backend owns it
    pub async fn exists(&self, path: &str) -> Result<bool> {
        self.registry.resolve(path)?.exists(path).await
    }

    /// Download a single file from whichever backend owns `remote_path`
    pub async fn download(&self, remote_path: &str, local_path: &str) -> Result<()> {
        self.registry
            .resolve(remote_path)?
            .download(remote_path, local_path)
            .await
    }

    /// Download a directory tree from whichever backend owns `remote_path`
    pub async fn download_directory(&self, remote_path: &str, local_path: &str) -> Result<()> {
        self.registry
            .resolve(remote_path)?
            .download_directory(remote_path, local_path)
            .await
    }

    /// Upload a single file to whichever backend owns `to_path`
    pub async fn upload(&self, local_path: &str, to_path: &str) -> Result<()> {
        self.registry
            .resolve(to_path)?
            .upload(local_path, to_path)
            .await
    }

    /// Upload a directory tree to whichever backend owns `remote_path`
    pub async fn upload_directory(&self, local_path: &str, remote_path: &str) -> Result<()> {
        self.registry
            .resolve(remote_path)?
            .upload_directory(local_path, remote_path)
            .await
    }

    /// Timed download with uniform error wrapping.
    ///
    /// Any underlying failure is rewrapped as [`Error::TransferFailed`]
    /// carrying both paths, the directory flag, and the original message.
    pub async fn get_data(
        &self,
        remote_path: &str,
        local_path: &str,
        recursive: bool,
    ) -> Result<()> {
        let started = Instant::now();
        let result = if recursive {
            self.download_directory(remote_path, local_path).await
        } else {
            self.download(remote_path, local_path).await
        };

        match result {
            Ok(()) => {
                debug!(
                    remote_path,
                    local_path,
                    recursive,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Copied data"
                );
                Ok(())
            }
            Err(e) => Err(Error::TransferFailed {
                remote_path: remote_path.to_string(),
                local_path: local_path.to_string(),
                recursive,
                message: e.to_string(),
            }),
        }
    }

    /// Timed upload with uniform error wrapping.
    ///
    /// Always writes through the configured default remote backend, never
    /// re-resolving `remote_path`: "put" targets the configured remote even
    /// when the destination happens to look like a local path.
    pub async fn put_data(
        &self,
        local_path: &str,
        remote_path: &str,
        recursive: bool,
    ) -> Result<()> {
        let started = Instant::now();
        let result = if recursive {
            self.default_remote
                .upload_directory(local_path, remote_path)
                .await
        } else {
            self.default_remote.upload(local_path, remote_path).await
        };

        match result {
            Ok(()) => {
                debug!(
                    local_path,
                    remote_path,
                    recursive,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Wrote data"
                );
                Ok(())
            }
            Err(e) => Err(Error::TransferFailed {
                remote_path: remote_path.to_string(),
                local_path: local_path.to_string(),
                recursive,
                message: e.to_string(),
            }),
        }
    }
}

impl std::fmt::Debug for StorageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageClient")
            .field("local_sandbox_dir", &self.local_sandbox_dir)
            .field("raw_output_prefix", &self.raw_output_prefix)
            .field("default_remote", &self.default_remote.name())
            .finish()
    }
}
