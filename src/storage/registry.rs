//! Store factory keyed by format name.
use super::{Hdf5Store, JsonStore, RoiStore};
use crate::error::{RoiError, RoiResult};
use std::collections::HashMap;
use std::path::Path;

type StoreFactory = Box<dyn Fn() -> Box<dyn RoiStore> + Send + Sync>;

/// Registry of persistence backends.
///
/// Both built-in formats are always registered. The HDF5 store exists without the
/// `storage_hdf5` feature and reports [`RoiError::FeatureNotEnabled`] when used.
///
/// # Examples
///
/// ```
/// use neuro_roi::storage::StoreRegistry;
///
/// let registry = StoreRegistry::new();
/// assert_eq!(registry.list_formats(), vec!["hdf5", "json"]);
/// let store = registry.create("json")?;
/// assert_eq!(store.extension(), "roi.json");
/// # Ok::<(), neuro_roi::error::RoiError>(())
/// ```
pub struct StoreRegistry {
    factories: HashMap<String, StoreFactory>,
}

impl Default for StoreRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreRegistry {
    /// Registry with the built-in backends.
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register("json", || Box::new(JsonStore::new()));
        registry.register("hdf5", || Box::new(Hdf5Store::new()));
        registry
    }

    /// Register a backend under `format`, replacing any previous one.
    pub fn register<F>(&mut self, format: &str, factory: F)
    where
        F: Fn() -> Box<dyn RoiStore> + Send + Sync + 'static,
    {
        self.factories
            .insert(format.to_ascii_lowercase(), Box::new(factory));
    }

    /// Create the store for `format`.
    ///
    /// # Errors
    ///
    /// [`RoiError::InvalidParameter`] for an unregistered format.
    pub fn create(&self, format: &str) -> RoiResult<Box<dyn RoiStore>> {
        self.factories
            .get(&format.trim().to_ascii_lowercase())
            .map(|factory| factory())
            .ok_or_else(|| {
                RoiError::InvalidParameter(format!(
                    "unsupported storage format '{}', available: [{}]",
                    format,
                    self.list_formats().join(", ")
                ))
            })
    }

    /// Registered format names, sorted.
    pub fn list_formats(&self) -> Vec<String> {
        let mut formats: Vec<String> = self.factories.keys().cloned().collect();
        formats.sort();
        formats
    }

    /// Store whose extension matches the file name of `path`.
    ///
    /// # Errors
    ///
    /// [`RoiError::InvalidParameter`] when no backend claims the extension.
    pub fn store_for_path(&self, path: &Path) -> RoiResult<Box<dyn RoiStore>> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        self.list_formats()
            .iter()
            .filter_map(|format| self.create(format).ok())
            .find(|store| file_name.ends_with(&format!(".{}", store.extension())))
            .ok_or_else(|| {
                RoiError::InvalidParameter(format!(
                    "no storage backend for '{}'",
                    path.display()
                ))
            })
    }

    /// Whether some backend claims `path`.
    pub fn is_roi_file(&self, path: &Path) -> bool {
        self.store_for_path(path).is_ok()
    }
}
