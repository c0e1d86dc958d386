//! Disk cache backend.
//!
//! Layout: `{root}/{appId}/config-cache/{appId}+{cluster}+{namespace}.json`.
//! Writes go to a sibling temp file first and are renamed into place, so a
//! reader sees either the old file or the new one.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::cache::backend::{CacheBackend, CacheEntry, CacheError};
use crate::model::{ConfigSnapshot, Namespace};

#[derive(Debug, Clone)]
pub struct FileCacheBackend {
    root: PathBuf,
}

impl FileCacheBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, namespace: &Namespace) -> PathBuf {
        self.root
            .join(namespace.app_id())
            .join("config-cache")
            .join(format!("{}.json", namespace))
    }
}

#[async_trait]
impl CacheBackend for FileCacheBackend {
    async fn read(&self, namespace: &Namespace) -> Result<Option<ConfigSnapshot>, CacheError> {
        let path = self.path_for(namespace);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let entry: CacheEntry = serde_json::from_slice(&bytes)?;
        tracing::debug!(namespace = %namespace, path = %path.display(), keys = entry.configurations.len(), "Loaded cache file");
        Ok(Some(entry.into()))
    }

    async fn write(&self, namespace: &Namespace, snapshot: &ConfigSnapshot) -> Result<(), CacheError> {
        let path = self.path_for(namespace);
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }

        let json = serde_json::to_vec_pretty(&CacheEntry::from(snapshot))?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        tracing::debug!(namespace = %namespace, path = %path.display(), "Wrote cache file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Properties;
    use tempfile::TempDir;

    fn snapshot(release_key: &str, pairs: &[(&str, &str)]) -> ConfigSnapshot {
        let props: Properties = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ConfigSnapshot::new(release_key, props)
    }

    #[test]
    fn test_path_layout() {
        let backend = FileCacheBackend::new("/opt/data");
        let ns = Namespace::new("app", "default", "application");
        assert_eq!(
            backend.path_for(&ns),
            PathBuf::from("/opt/data/app/config-cache/app+default+application.json")
        );
    }

    #[tokio::test]
    async fn test_missing_file_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let backend = FileCacheBackend::new(dir.path());
        let ns = Namespace::new("app", "default", "application");
        assert!(backend.read(&ns).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let backend = FileCacheBackend::new(dir.path());
        let ns = Namespace::new("app", "default", "application");

        backend.write(&ns, &snapshot("rk1", &[("k1", "v1")])).await.unwrap();
        backend.write(&ns, &snapshot("rk2", &[("k1", "v2")])).await.unwrap();

        let loaded = backend.read(&ns).await.unwrap().unwrap();
        assert_eq!(loaded.release_key, "rk2");
        assert_eq!(loaded.configurations["k1"], "v2");
        assert!(!backend.path_for(&ns).with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let backend = FileCacheBackend::new(dir.path());
        let ns = Namespace::new("app", "default", "application");
        let path = backend.path_for(&ns);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(backend.read(&ns).await, Err(CacheError::Serialization(_))));
    }
}
