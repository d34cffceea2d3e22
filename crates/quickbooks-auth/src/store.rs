//! Refresh token persistence
//!
//! The store holds exactly one refresh token, the current one. A tokio Mutex
//! serializes reads and writes so a read never overlaps a write, and writes
//! go through a temp file + rename so a crash or a concurrent reader never
//! sees a partially written token.

use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Boxed future returned by store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Durable slot for the current refresh token.
///
/// Uses `Pin<Box<dyn Future>>` return types so the store can be shared as
/// `Arc<dyn RefreshTokenStore>`.
pub trait RefreshTokenStore: Send + Sync {
    /// Read the current refresh token. Fails with `NotFound` if the slot is
    /// absent or blank.
    fn get(&self) -> StoreFuture<'_, String>;

    /// Replace the current refresh token. No history is kept.
    fn put<'a>(&'a self, token: &'a str) -> StoreFuture<'a, ()>;
}

/// Refresh token kept as trimmed plain text in a single file.
pub struct FileTokenStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<String> {
        let _guard = self.lock.lock().await;
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::NotFound(format!(
                    "refresh token file {} does not exist",
                    self.path.display()
                )));
            }
            Err(e) => {
                return Err(Error::Io(format!(
                    "reading refresh token file {}: {e}",
                    self.path.display()
                )));
            }
        };

        let token = contents.trim();
        if token.is_empty() {
            return Err(Error::NotFound(format!(
                "refresh token not found in: {}",
                self.path.display()
            )));
        }
        Ok(token.to_string())
    }

    async fn write(&self, token: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        write_atomic(&self.path, token.trim()).await
    }
}

impl RefreshTokenStore for FileTokenStore {
    fn get(&self) -> StoreFuture<'_, String> {
        Box::pin(self.read())
    }

    fn put<'a>(&'a self, token: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(self.write(token))
    }
}

/// Write the bootstrap refresh token if the store holds none.
///
/// A token already in the store wins: it may be a rotation newer than the
/// bootstrap value, which the provider has invalidated since. Returns whether
/// the bootstrap value was written.
pub async fn seed_if_empty(store: &dyn RefreshTokenStore, bootstrap: &str) -> Result<bool> {
    match store.get().await {
        Ok(_) => Ok(false),
        Err(Error::NotFound(_)) => {
            if bootstrap.trim().is_empty() {
                return Err(Error::NotFound(
                    "no stored refresh token and bootstrap value is empty".into(),
                ));
            }
            store.put(bootstrap).await?;
            info!("seeded token store with bootstrap refresh token");
            Ok(true)
        }
        Err(e) => Err(e),
    }
}

/// Write the token to a sibling temp file, then rename it over the target.
///
/// The file is 0600 on unix since it holds a long-lived credential.
async fn write_atomic(path: &Path, token: &str) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("token path has no parent directory".into()))?;
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::Io("token path has no file name".into()))?
        .to_string_lossy();

    let tmp_path = dir.join(format!(".{file_name}.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, token.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp token file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting token file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp token file: {e}")))?;

    debug!(path = %path.display(), "persisted refresh token");
    Ok(())
}
