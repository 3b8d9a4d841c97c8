use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::{debug, info};

use super::error::{DataError, Result};
use super::loader::load_file;
use super::model::Dataset;
use super::schema::Schema;

/// Load-once memoization of datasets, keyed by resource identity.
///
/// The identity is the canonical path of the source together with the
/// schema it was validated against. A cache hit hands out the same shared
/// dataset; sessions clone the `Arc`, never the records.
#[derive(Debug, Default)]
pub struct DatasetCache {
    entries: Mutex<HashMap<(PathBuf, Schema), Arc<Dataset>>>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached dataset for `path`, loading it on first use.
    ///
    /// Load failures are not cached; the next call retries.
    pub fn get_or_load(&self, path: &Path, schema: &Schema) -> Result<Arc<Dataset>> {
        let canonical = path
            .canonicalize()
            .map_err(|e| DataError::unavailable(path, e))?;
        let key = (canonical, schema.clone());

        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(ds) = entries.get(&key) {
            debug!("Cache hit for {}", key.0.display());
            return Ok(Arc::clone(ds));
        }

        let dataset = Arc::new(load_file(&key.0, schema)?);
        info!("Cached {} ({} records)", key.0.display(), dataset.len());
        entries.insert(key, Arc::clone(&dataset));
        Ok(dataset)
    }

    /// Number of cached datasets.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .map(|e| e.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::data::schema::{ColumnDef, ColumnType};

    fn schema() -> Schema {
        Schema::new(vec![
            ColumnDef::new("State", ColumnType::Text),
            ColumnDef::new("Value", ColumnType::Float),
        ])
        .unwrap()
    }

    #[test]
    fn test_second_load_is_served_from_cache() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "State,Value\nOhio,1.5\nUtah,2.0").unwrap();

        let cache = DatasetCache::new();
        let first = cache.get_or_load(file.path(), &schema()).unwrap();
        let second = cache.get_or_load(file.path(), &schema()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
        assert_eq!(*first, load_file(file.path(), &schema()).unwrap());
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let cache = DatasetCache::new();
        let err = cache
            .get_or_load(Path::new("/nonexistent/co2.csv"), &schema())
            .unwrap_err();
        assert!(matches!(err, DataError::DataUnavailable { .. }));
        assert!(cache.is_empty());
    }
}
