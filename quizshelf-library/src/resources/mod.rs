//! Resource file store
//!
//! Resources are flat files under one root directory, addressed by name.
//! Names are assigned once (content-addressed at creation) and are unique
//! across the library.

pub mod reconcile;

pub use reconcile::{required_resources, resources_of, ResourceRequest, ResourceSet};

use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ResourceStore {
    root: PathBuf,
}

impl ResourceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a resource; rejects anything but a plain file name
    pub fn resolve(&self, name: &str) -> io::Result<PathBuf> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) if !name.contains(['/', '\\']) => {
                Ok(self.root.join(name))
            }
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid resource name '{}'", name),
            )),
        }
    }

    pub async fn exists(&self, name: &str) -> io::Result<bool> {
        let path = self.resolve(name)?;
        tokio::fs::try_exists(path).await
    }

    pub async fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        tokio::fs::read(self.resolve(name)?).await
    }

    /// Write a resource, creating the root directory if needed
    pub async fn write(&self, name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let path = self.resolve(name)?;
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(&path, bytes).await?;
        debug!(resource = %name, size = bytes.len(), "Wrote resource");
        Ok(path)
    }

    /// Delete a resource; returns false if it was already gone
    pub async fn delete(&self, name: &str) -> io::Result<bool> {
        match tokio::fs::remove_file(self.resolve(name)?).await {
            Ok(()) => {
                debug!(resource = %name, "Deleted resource");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_rejects_paths() {
        let store = ResourceStore::new("/data/resources");
        assert!(store.resolve("img1.png").is_ok());
        for bad in ["", "..", ".", "../secret", "a/b.png", "/etc/passwd", "a\\b.png"] {
            assert!(store.resolve(bad).is_err(), "'{}' should be rejected", bad);
        }
    }

    #[tokio::test]
    async fn test_write_read_delete() {
        let temp_dir = TempDir::new().unwrap();
        let store = ResourceStore::new(temp_dir.path().join("resources"));

        store.write("img1.png", b"pixels").await.unwrap();
        assert!(store.exists("img1.png").await.unwrap());
        assert_eq!(store.read("img1.png").await.unwrap(), b"pixels");

        assert!(store.delete("img1.png").await.unwrap());
        assert!(!store.delete("img1.png").await.unwrap());
        assert!(!store.exists("img1.png").await.unwrap());
    }
}
