//! Porter Storage - Pluggable storage backends for the task-execution runtime
//!
//! Moves files and directory trees between heterogeneous storage backends
//! addressed uniformly by path. Paths are routed to their owning backend by
//! protocol prefix through a registry; a storage client layers a staging
//! sandbox and randomized output-path allocation on top.
//!
//! # Example
//!
//! ```no_run
//! use porter_storage::{BackendRegistry, StorageClient};
//! use std::sync::Arc;
//!
//! # async fn example() -> porter_core::Result<()> {
//! let registry = Arc::new(BackendRegistry::with_defaults());
//! let client = StorageClient::new(registry, "/tmp/scratch", "/tmp/outputs").await?;
//!
//! let staging = client.random_local_directory().await?;
//! client
//!     .get_data("file:///data/inputs/db.sqlite", &format!("{staging}/db.sqlite"), false)
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod backend;
mod client;
mod disk;
mod registry;

pub use backend::StorageBackend;
pub use client::StorageClient;
pub use disk::DiskBackend;
pub use registry::BackendRegistry;
