use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use super::error::Result;
use super::loader::load_datasets;
use super::model::Datasets;
use crate::config::DashboardConfig;

static GLOBAL: DatasetCache = DatasetCache::new();

/// Memoized datasets for the lifetime of the process.
///
/// Filled on first use and kept until [`DatasetCache::reset`]. The only key
/// is the data directory; edits to the files inside it are not noticed.
pub struct DatasetCache {
    slot: Mutex<Option<(PathBuf, Arc<Datasets>)>>,
}

impl DatasetCache {
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// The process-wide instance the UI uses.
    pub fn global() -> &'static DatasetCache {
        &GLOBAL
    }

    /// Return the cached datasets, loading them first if the cache is empty
    /// or holds another directory. Failed loads leave the cache empty.
    pub fn get_or_load(&self, config: &DashboardConfig) -> Result<Arc<Datasets>> {
        let mut slot = self.lock();
        if let Some((dir, datasets)) = slot.as_ref() {
            if *dir == config.data_dir {
                return Ok(Arc::clone(datasets));
            }
            log::info!("Data directory changed, dropping cached datasets from {}", dir.display());
        }

        *slot = None;
        let datasets = Arc::new(load_datasets(config)?);
        *slot = Some((config.data_dir.clone(), Arc::clone(&datasets)));
        Ok(datasets)
    }

    pub fn reset(&self) {
        *self.lock() = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<(PathBuf, Arc<Datasets>)>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for DatasetCache {
    fn default() -> Self {
        Self::new()
    }
}
