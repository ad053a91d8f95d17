//! JSON document store on the local filesystem
//!
//! Each dataset lives in `<data_dir>/<id>.json`. Writes go to a temporary
//! file that is renamed into place, so readers see either the old state or
//! the complete new document.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{is_valid_id, sort_newest_first, Dataset, DatasetStore, DatasetSummary, StorageError};

const EXTENSION: &str = "json";

pub struct FileStore {
    data_dir: PathBuf,
    /// Datasets already read from disk
    cache: DashMap<String, Arc<Dataset>>,
    /// Serializes writers; readers never take it
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self, StorageError> {
        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;

        Ok(Self {
            data_dir,
            cache: DashMap::new(),
            write_lock: Mutex::new(()),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn key_path(&self, id: &str) -> PathBuf {
        self.data_dir.join(format!("{}.{}", id, EXTENSION))
    }

    fn check_id(id: &str) -> Result<(), StorageError> {
        if is_valid_id(id) {
            Ok(())
        } else {
            Err(StorageError::InvalidId(id.to_string()))
        }
    }

    /// Ids of every document in the data directory
    fn list_keys(&self) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();

        for entry in std::fs::read_dir(&self.data_dir)? {
            let path = entry?.path();
            if path.extension().map_or(true, |ext| ext != EXTENSION) {
                continue;
            }
            if let Some(name) = path.file_stem().and_then(|s| s.to_str()) {
                if is_valid_id(name) {
                    keys.push(name.to_string());
                }
            }
        }

        Ok(keys)
    }
}

impl DatasetStore for FileStore {
    fn insert(&self, dataset: Dataset) -> Result<Arc<Dataset>, StorageError> {
        Self::check_id(&dataset.id)?;
        let _guard = self.write_lock.lock();

        let path = self.key_path(&dataset.id);
        if path.exists() {
            return Err(StorageError::DatasetExists(dataset.id));
        }

        let data = serde_json::to_vec_pretty(&dataset)?;
        let tmp_path = path.with_extension("json.tmp");
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&tmp_path)?;
            file.write_all(&data)?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp_path, &path)?;

        tracing::debug!("Wrote dataset {} ({} bytes)", dataset.id, data.len());

        let dataset = Arc::new(dataset);
        self.cache.insert(dataset.id.clone(), Arc::clone(&dataset));
        Ok(dataset)
    }

    fn get(&self, id: &str) -> Result<Option<Arc<Dataset>>, StorageError> {
        Self::check_id(id)?;

        if let Some(dataset) = self.cache.get(id) {
            return Ok(Some(Arc::clone(&dataset)));
        }

        let path = self.key_path(id);
        if !path.exists() {
            return Ok(None);
        }

        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let dataset: Arc<Dataset> = Arc::new(serde_json::from_slice(&data)?);

        // A delete may have landed since the read; only cache what is still on disk
        let _guard = self.write_lock.lock();
        if !path.exists() {
            return Ok(None);
        }
        self.cache.insert(id.to_string(), Arc::clone(&dataset));
        Ok(Some(dataset))
    }

    fn list(&self) -> Result<Vec<DatasetSummary>, StorageError> {
        let mut summaries = Vec::new();
        for id in self.list_keys()? {
            match self.get(&id) {
                Ok(Some(dataset)) => summaries.push(dataset.summary()),
                Ok(None) => {}
                Err(e) => tracing::warn!("Skipping unreadable dataset {}: {}", id, e),
            }
        }
        sort_newest_first(&mut summaries);
        Ok(summaries)
    }

    fn delete(&self, id: &str) -> Result<bool, StorageError> {
        Self::check_id(id)?;
        let _guard = self.write_lock.lock();

        self.cache.remove(id);

        let path = self.key_path(id);
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(path)?;
        Ok(true)
    }
}
