//! # Result Store
//!
//! Where drained result sets get persisted, addressed as bucket/key pairs.
//! [`FsStore`] is the filesystem binding; a remote object store would plug
//! in behind the same trait.

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;

/// Destination for persisted result documents.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> io::Result<()>;
}

/// Filesystem store: writes `{root}/{bucket}/{key}`.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ObjectStore for FsStore {
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> io::Result<()> {
        let path = self.root.join(bucket).join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = body.len();
        tokio::fs::write(&path, body).await?;
        tracing::info!("wrote {} bytes to {}", bytes, path.display());
        Ok(())
    }
}
