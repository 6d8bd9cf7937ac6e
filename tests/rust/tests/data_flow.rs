//! End-to-end flows through the registry, disk backend, and storage client.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use porter_core::Error;
use porter_storage::{BackendRegistry, StorageBackend, StorageClient};
use tempfile::TempDir;
use tokio::fs;

/// In-memory object store keyed by full path, registered under `mem://`.
///
/// Directory semantics follow a flat namespace: a "directory" is any key
/// prefix, and uploads never need to create one.
#[derive(Default)]
struct MemBackend {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl StorageBackend for MemBackend {
    fn name(&self) -> &str {
        "mem"
    }

    async fn exists(&self, path: &str) -> porter_core::Result<bool> {
        let dir_prefix = format!("{}/", path.trim_end_matches('/'));
        Ok(self
            .objects
            .lock()
            .keys()
            .any(|k| k == path || k.starts_with(&dir_prefix)))
    }

    async fn download(&self, remote_path: &str, local_path: &str) -> porter_core::Result<()> {
        let bytes = self
            .objects
            .lock()
            .get(remote_path)
            .cloned()
            .ok_or_else(|| Error::Storage {
                message: format!("No such object: {}", remote_path),
            })?;
        fs::write(local_path, bytes).await?;
        Ok(())
    }

    async fn download_directory(
        &self,
        remote_path: &str,
        local_path: &str,
    ) -> porter_core::Result<()> {
        let prefix = format!("{}/", remote_path.trim_end_matches('/'));
        let entries: Vec<(String, Vec<u8>)> = self
            .objects
            .lock()
            .iter()
            .filter(|(k, _)| k.starts_with(&prefix))
            .map(|(k, v)| (k[prefix.len()..].to_string(), v.clone()))
            .collect();

        for (relative, bytes) in entries {
            let destination = Path::new(local_path).join(&relative);
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::write(&destination, bytes).await?;
        }
        Ok(())
    }

    async fn upload(&self, local_path: &str, remote_path: &str) -> porter_core::Result<()> {
        let bytes = fs::read(local_path).await?;
        self.objects.lock().insert(remote_path.to_string(), bytes);
        Ok(())
    }

    async fn upload_directory(
        &self,
        local_path: &str,
        remote_path: &str,
    ) -> porter_core::Result<()> {
        let root = Path::new(local_path).to_path_buf();
        let mut stack = vec![root.clone()];
        while let Some(dir) = stack.pop() {
            for entry in std::fs::read_dir(&dir)? {
                let entry = entry?;
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else {
                    let relative = path.strip_prefix(&root).expect("walked under root");
                    let key = self.construct_path(
                        false,
                        &[remote_path, &relative.to_string_lossy()],
                    );
                    self.upload(&path.to_string_lossy(), &key).await?;
                }
            }
        }
        Ok(())
    }

    fn construct_path(&self, add_protocol: bool, segments: &[&str]) -> String {
        let joined = segments.join("/");
        if add_protocol {
            format!("mem://{}", joined)
        } else {
            joined
        }
    }
}

struct Fixture {
    _temp_dir: TempDir,
    scratch: std::path::PathBuf,
    registry: Arc<BackendRegistry>,
    client: StorageClient,
}

async fn fixture(raw_output_prefix: Option<&str>) -> Result<Fixture> {
    porter_core::init_tracing();

    let temp_dir = TempDir::new()?;
    let sandbox = temp_dir.path().join("sandbox");
    let raw = temp_dir.path().join("raw");
    fs::create_dir_all(&raw).await?;
    let scratch = temp_dir.path().join("scratch");
    fs::create_dir_all(&scratch).await?;

    let registry = Arc::new(BackendRegistry::with_defaults());
    registry.register("mem://", Arc::new(MemBackend::default()), false)?;

    let raw = raw_output_prefix
        .map(str::to_string)
        .unwrap_or_else(|| raw.to_string_lossy().to_string());
    let client = StorageClient::new(
        Arc::clone(&registry),
        &sandbox.to_string_lossy(),
        &raw,
    )
    .await?;

    Ok(Fixture {
        _temp_dir: temp_dir,
        scratch,
        registry,
        client,
    })
}

#[tokio::test]
async fn test_file_round_trip_through_client() -> Result<()> {
    let f = fixture(None).await?;

    let source = f.scratch.join("input.txt");
    fs::write(&source, b"task input payload").await?;

    let remote = f.client.random_remote_path(Some("input.txt"));
    assert!(remote.ends_with("input.txt"));

    f.client
        .put_data(&source.to_string_lossy(), &remote, false)
        .await?;
    assert!(f.client.exists(&remote).await?);

    let fetched = f.scratch.join("fetched.txt");
    f.client
        .get_data(&remote, &fetched.to_string_lossy(), false)
        .await?;

    assert_eq!(fs::read(&fetched).await?, fs::read(&source).await?);
    Ok(())
}

#[tokio::test]
async fn test_directory_round_trip_and_listing() -> Result<()> {
    let f = fixture(None).await?;

    let staging = f.client.random_local_directory().await?;
    let staging_path = Path::new(&staging);
    fs::create_dir_all(staging_path.join("sub")).await?;
    fs::write(staging_path.join("a.txt"), b"a").await?;
    fs::write(staging_path.join("sub/b.txt"), b"b").await?;

    let remote = f.client.random_remote_directory();
    f.client.put_data(&staging, &remote, true).await?;

    let fetched = f.scratch.join("fetched");
    f.client
        .get_data(&remote, &fetched.to_string_lossy(), true)
        .await?;

    assert_eq!(fs::read(fetched.join("a.txt")).await?, b"a");
    assert_eq!(fs::read(fetched.join("sub/b.txt")).await?, b"b");

    let listed = f
        .client
        .local_backend()
        .list_dir(&fetched.to_string_lossy(), true)
        .await?;
    let nested = Path::new("sub").join("b.txt").to_string_lossy().to_string();
    assert_eq!(listed, vec!["a.txt".to_string(), nested]);
    Ok(())
}

#[tokio::test]
async fn test_mem_backend_routing_and_transfer() -> Result<()> {
    let f = fixture(Some("mem://outputs")).await?;

    let source = f.scratch.join("object.bin");
    fs::write(&source, b"stored in memory").await?;

    // put_data goes to the configured default remote (the mem backend)
    let remote = f.client.random_remote_path(Some("object.bin"));
    assert!(remote.starts_with("mem://outputs/"));
    f.client
        .put_data(&source.to_string_lossy(), &remote, false)
        .await?;
    assert!(f.client.exists(&remote).await?);

    // Prefix routing: mem:// to the mem backend, bare paths to disk
    assert_eq!(f.registry.resolve(&remote)?.name(), "mem");
    assert_eq!(f.registry.resolve("/tmp/x")?.name(), "local");

    let fetched = f.scratch.join("from_mem.bin");
    f.client
        .get_data(&remote, &fetched.to_string_lossy(), false)
        .await?;
    assert_eq!(fs::read(&fetched).await?, b"stored in memory");
    Ok(())
}

#[tokio::test]
async fn test_mem_directory_transfer() -> Result<()> {
    let f = fixture(Some("mem://outputs")).await?;

    let tree = f.scratch.join("tree");
    fs::create_dir_all(tree.join("sub")).await?;
    fs::write(tree.join("a.txt"), b"a").await?;
    fs::write(tree.join("sub/b.txt"), b"b").await?;

    let remote = f.client.random_remote_directory();
    f.client
        .put_data(&tree.to_string_lossy(), &remote, true)
        .await?;

    let fetched = f.scratch.join("back");
    f.client
        .get_data(&remote, &fetched.to_string_lossy(), true)
        .await?;
    assert_eq!(fs::read(fetched.join("a.txt")).await?, b"a");
    assert_eq!(fs::read(fetched.join("sub/b.txt")).await?, b"b");
    Ok(())
}

#[tokio::test]
async fn test_mem_backend_lacks_listing() -> Result<()> {
    let f = fixture(None).await?;

    let backend = f.registry.resolve("mem://outputs")?;
    let err = backend.list_dir("mem://outputs", false).await.unwrap_err();
    match err {
        Error::UnsupportedOperation { backend, operation } => {
            assert_eq!(backend, "mem");
            assert_eq!(operation, "list_dir");
        }
        other => anyhow::bail!("expected UnsupportedOperation, got {other}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_transfer_failure_is_uniformly_wrapped() -> Result<()> {
    let f = fixture(None).await?;

    // Object missing from the mem backend: the wrap must keep the cause
    let err = f
        .client
        .get_data("mem://missing/key", "/tmp/never-written", false)
        .await
        .unwrap_err();
    match err {
        Error::TransferFailed { ref message, .. } => {
            assert!(message.contains("No such object"));
        }
        other => anyhow::bail!("expected TransferFailed, got {other}"),
    }
    Ok(())
}
