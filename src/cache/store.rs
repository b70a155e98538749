//! Snapshot and metadata file access
//!
//! Files live directly under the cache directory:
//! - `<kind>.json` - one JSON array per resource kind
//! - `meta.json` - shared refresh metadata
//!
//! Every write goes to a temporary file in the same directory which is then
//! renamed over the target, so readers never observe a half-written file.

use super::meta::CacheMetadata;
use super::{CacheError, CacheResult};
use crate::models::ResourceKind;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const META_FILE: &str = "meta";

/// File-backed snapshot store rooted at one cache directory
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a resource kind's snapshot file
    pub fn snapshot_path(&self, kind: ResourceKind) -> PathBuf {
        self.file_path(kind.as_str())
    }

    /// Path of the shared metadata document
    pub fn meta_path(&self) -> PathBuf {
        self.file_path(META_FILE)
    }

    fn file_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    /// Ensure the cache directory exists, creating it if necessary
    pub fn ensure_dir(&self) -> CacheResult<()> {
        std::fs::create_dir_all(&self.dir).map_err(|source| CacheError::Io {
            path: self.dir.clone(),
            source,
        })
    }

    /// Read and parse a JSON document
    pub fn read_json<T: DeserializeOwned>(&self, path: &Path) -> CacheResult<T> {
        let contents = std::fs::read(path).map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&contents).map_err(|source| CacheError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Atomically write a JSON document (temp file + rename)
    pub fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> CacheResult<()> {
        self.ensure_dir()?;
        let io_err = |source: std::io::Error| CacheError::Io {
            path: path.to_path_buf(),
            source,
        };

        let tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, value)
                .map_err(|e| io_err(std::io::Error::from(e)))?;
            writer.flush().map_err(io_err)?;
        }
        tmp.persist(path).map_err(|e| io_err(e.error))?;
        Ok(())
    }

    /// Load a kind's snapshot
    ///
    /// Returns `None` on a cache miss. A missing file is a miss; so is a file
    /// that cannot be read or parsed, which is logged and otherwise ignored so
    /// a corrupt cache never blocks a command.
    pub fn load<T: DeserializeOwned>(&self, kind: ResourceKind) -> Option<Vec<T>> {
        let path = self.snapshot_path(kind);
        match self.read_json::<Vec<T>>(&path) {
            Ok(records) => Some(records),
            Err(CacheError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
                None
            }
            Err(e) => {
                tracing::warn!("Treating unreadable {} cache as a miss: {}", kind, e);
                None
            }
        }
    }

    /// Replace a kind's snapshot wholesale
    pub fn save<T: Serialize>(&self, kind: ResourceKind, records: &[T]) -> CacheResult<()> {
        self.write_json(&self.snapshot_path(kind), records)
    }

    /// Read the metadata document
    ///
    /// Unlike snapshots, errors are returned: callers distinguish an
    /// uninitialised cache from an initialised one.
    pub fn read_meta(&self) -> CacheResult<CacheMetadata> {
        self.read_json(&self.meta_path())
    }

    /// Read the metadata document, starting from empty metadata if it is
    /// missing or unreadable
    pub fn read_meta_or_default(&self) -> CacheMetadata {
        match self.read_meta() {
            Ok(meta) => meta,
            Err(e) => {
                tracing::debug!("Starting from empty cache metadata: {}", e);
                CacheMetadata::default()
            }
        }
    }

    pub fn write_meta(&self, meta: &CacheMetadata) -> CacheResult<()> {
        self.write_json(&self.meta_path(), meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Ec2Instance;

    fn instance(id: &str) -> Ec2Instance {
        Ec2Instance {
            instance_id: id.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_paths() {
        let store = CacheStore::new("/tmp/cloudpath-cache");
        assert_eq!(
            store.snapshot_path(ResourceKind::Route53Records),
            PathBuf::from("/tmp/cloudpath-cache/route53-records.json")
        );
        assert_eq!(
            store.meta_path(),
            PathBuf::from("/tmp/cloudpath-cache/meta.json")
        );
    }

    #[test]
    fn test_missing_snapshot_is_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        assert!(store.load::<Ec2Instance>(ResourceKind::Ec2).is_none());
    }

    #[test]
    fn test_save_then_load_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("nested"));
        let records = vec![instance("i-b"), instance("i-a"), instance("i-c")];

        store.save(ResourceKind::Ec2, &records).unwrap();
        let loaded: Vec<Ec2Instance> = store.load(ResourceKind::Ec2).unwrap();

        assert_eq!(loaded, records);
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        store.save(ResourceKind::Ec2, &[instance("i-1")]).unwrap();
        store.save(ResourceKind::Ec2, &[instance("i-2")]).unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["ec2.json".to_string()]);
    }

    #[test]
    fn test_read_meta_missing_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        assert!(matches!(store.read_meta(), Err(CacheError::Io { .. })));
        assert!(store.read_meta_or_default().services.is_empty());
    }

    #[test]
    fn test_read_meta_corrupt_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        std::fs::write(store.meta_path(), "{ not json").unwrap();
        assert!(matches!(store.read_meta(), Err(CacheError::Corrupt { .. })));
    }
}
