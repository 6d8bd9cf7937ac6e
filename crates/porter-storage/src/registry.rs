//! Protocol-prefix backend registry
//!
//! Maps protocol prefixes (`file://`, `/`, `s3://`, ...) to the backend
//! instance that owns paths carrying them. The registry is an explicit value
//! owned by the composition root and shared by reference; reference backends
//! are bound by [`BackendRegistry::with_defaults`] rather than by any
//! load-time side effect.

use std::sync::Arc;

use parking_lot::RwLock;
use porter_core::{Error, Result};
use tracing::debug;

use crate::{DiskBackend, StorageBackend};

/// Registry of storage backends keyed by protocol prefix
///
/// Intended to be populated at process start; registration after startup is
/// permitted and guarded by a read-write lock (readers: [`resolve`],
/// [`is_supported`], [`registered`]; writer: [`register`]).
///
/// [`resolve`]: BackendRegistry::resolve
/// [`is_supported`]: BackendRegistry::is_supported
/// [`registered`]: BackendRegistry::registered
/// [`register`]: BackendRegistry::register
#[derive(Default)]
pub struct BackendRegistry {
    // Registration order is preserved for enumeration; resolution itself is
    // order-independent (longest prefix wins)
    entries: RwLock<Vec<(String, Arc<dyn StorageBackend>)>>,
}

impl BackendRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the reference disk backend bound to both
    /// `file://` and `/`
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        let disk: Arc<dyn StorageBackend> = Arc::new(DiskBackend::new());
        // Fresh registry, conflicts impossible
        registry
            .register(DiskBackend::PROTOCOL, Arc::clone(&disk), false)
            .and_then(|_| registry.register("/", disk, false))
            .expect("registering defaults into an empty registry");
        registry
    }

    /// Register `backend` for `protocol`.
    ///
    /// Re-registering the same instance (same `Arc`) is a no-op. Registering
    /// a different backend for an already-bound protocol fails with
    /// [`Error::ProtocolConflict`] unless `force` is true, in which case the
    /// existing backend is replaced.
    pub fn register(
        &self,
        protocol: &str,
        backend: Arc<dyn StorageBackend>,
        force: bool,
    ) -> Result<()> {
        let mut entries = self.entries.write();
        if let Some(existing) = entries.iter_mut().find(|(p, _)| p == protocol) {
            if Arc::ptr_eq(&existing.1, &backend) {
                return Ok(());
            }
            if !force {
                return Err(Error::ProtocolConflict {
                    protocol: protocol.to_string(),
                    existing: existing.1.name().to_string(),
                    requested: backend.name().to_string(),
                });
            }
            debug!(
                protocol,
                old = existing.1.name(),
                new = backend.name(),
                "Replacing registered backend"
            );
            existing.1 = backend;
            return Ok(());
        }

        debug!(protocol, backend = backend.name(), "Registered backend");
        entries.push((protocol.to_string(), backend));
        Ok(())
    }

    /// Resolve `path` to the backend owning it.
    ///
    /// The longest registered prefix that is a literal prefix of `path`
    /// wins, so overlapping registrations (`/` vs a more specific local
    /// prefix) resolve the same way regardless of registration order.
    pub fn resolve(&self, path: &str) -> Result<Arc<dyn StorageBackend>> {
        let entries = self.entries.read();
        entries
            .iter()
            .filter(|(protocol, _)| path.starts_with(protocol.as_str()))
            .max_by_key(|(protocol, _)| protocol.len())
            .map(|(_, backend)| Arc::clone(backend))
            .ok_or_else(|| Error::NoBackendForPath {
                path: path.to_string(),
            })
    }

    /// Exact-key membership test (not prefix matching)
    pub fn is_supported(&self, protocol: &str) -> bool {
        self.entries.read().iter().any(|(p, _)| p == protocol)
    }

    /// All (protocol, backend-name) pairs in registration order
    pub fn registered(&self) -> Vec<(String, String)> {
        self.entries
            .read()
            .iter()
            .map(|(protocol, backend)| (protocol.clone(), backend.name().to_string()))
            .collect()
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("entries", &self.registered())
            .finish()
    }
}
