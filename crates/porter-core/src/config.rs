//! Configuration types for the data-persistence layer

use serde::{Deserialize, Serialize};

/// Data-access configuration
///
/// Both paths are plain strings: the sandbox root must be a local filesystem
/// path, while the raw output prefix may carry any registered protocol
/// (`file://`, `s3://`, ...) and is resolved through the backend registry at
/// client construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Local directory the storage client uses as its staging sandbox
    pub sandbox_root: String,

    /// Base URI under which randomized remote output paths are allocated
    pub raw_output_prefix: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            sandbox_root: "/tmp/porter/sandbox".to_string(),
            raw_output_prefix: "/tmp/porter/raw".to_string(),
        }
    }
}
