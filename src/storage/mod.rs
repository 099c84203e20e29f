//! Saving and loading regions.
//!
//! Regions are converted to a backend-independent [`RoiRecord`] and written by a
//! [`RoiStore`]. Two backends exist:
//!
//! - [`JsonStore`]: always available, files end in `.roi.json`
//! - [`Hdf5Store`]: requires the `storage_hdf5` feature, files end in `.h5roi`
//!
//! File names are content addressed: `{Class}_{name}{hash}.{ext}`, where `hash` is
//! the first 16 hex digits of the SHA-256 of the name and mask bytes. Saving the same
//! region twice overwrites the same file.

pub mod hdf5;
pub mod json;
pub mod record;
pub mod registry;

use crate::error::{RoiError, RoiResult};
use crate::roi::Region;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub use self::hdf5::Hdf5Store;
pub use json::JsonStore;
pub use record::{registered_classes, EncodedMask, RoiRecord};
pub use registry::StoreRegistry;

/// A persistence backend for region records.
///
/// Implementations open, use and close their file within each call.
pub trait RoiStore: Send + Sync {
    /// Format name used in configuration and on the command line.
    fn format(&self) -> &'static str;

    /// File extension without the leading dot.
    fn extension(&self) -> &'static str;

    /// Write one record to `path`, replacing any existing file.
    fn write(&self, record: &RoiRecord, path: &Path) -> RoiResult<()>;

    /// Read one record from `path`.
    fn read(&self, path: &Path) -> RoiResult<RoiRecord>;
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | ' ' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Content-addressed file name for `region`.
pub fn file_name(region: &Region, extension: &str) -> String {
    let name = region.name();
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(region.core.geometry_bytes());
    let digest = hasher.finalize();
    let hash: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    format!(
        "{}_{}{}.{}",
        region.class_name(),
        sanitize(name),
        &hash[..16],
        extension
    )
}

/// Save `region` into `dir` (created if missing), returning the written path.
pub fn save(region: &Region, dir: &Path, store: &dyn RoiStore) -> RoiResult<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(file_name(region, store.extension()));
    store.write(&RoiRecord::from_region(region), &path)?;
    info!(
        region = region.class_name(),
        path = %path.display(),
        format = store.format(),
        "saved region"
    );
    Ok(path)
}

/// Load a region, picking the backend from the file extension.
pub fn load(path: &Path) -> RoiResult<Region> {
    load_filtered(path, |_| true)
}

/// Load a region and reject it unless `filter` accepts it.
///
/// # Errors
///
/// [`RoiError::NoRoi`] when the filter rejects the region; the region is dropped.
pub fn load_filtered<F>(path: &Path, filter: F) -> RoiResult<Region>
where
    F: Fn(&Region) -> bool,
{
    let store = StoreRegistry::new().store_for_path(path)?;
    let region = store.read(path)?.into_region()?;
    if !filter(&region) {
        return Err(RoiError::NoRoi(format!(
            "{} did not pass the filter",
            path.display()
        )));
    }
    debug!(region = region.class_name(), path = %path.display(), "loaded region");
    Ok(region)
}

/// Load every region file under `dir`, recursively, in path order.
pub fn load_rois(dir: &Path) -> RoiResult<Vec<Region>> {
    let registry = StoreRegistry::new();
    let mut paths = Vec::new();
    collect_roi_files(dir, &registry, &mut paths)?;
    paths.sort();
    let regions = paths
        .iter()
        .map(|path| load(path))
        .collect::<RoiResult<Vec<_>>>()?;
    info!(dir = %dir.display(), count = regions.len(), "loaded regions");
    Ok(regions)
}

fn collect_roi_files(dir: &Path, registry: &StoreRegistry, out: &mut Vec<PathBuf>) -> RoiResult<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_roi_files(&path, registry, out)?;
        } else if registry.is_roi_file(&path) {
            out.push(path);
        }
    }
    Ok(())
}

impl Region {
    /// Save into `dir`; see [`save`].
    pub fn save(&self, dir: &Path, store: &dyn RoiStore) -> RoiResult<PathBuf> {
        save(self, dir, store)
    }

    /// Load from `path`; see [`load`].
    pub fn load(path: &Path) -> RoiResult<Region> {
        load(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Mask;
    use crate::roi::RoiCore;

    fn named(name: &str) -> Region {
        let mut mask = Mask::from_elem((1, 3, 3), false);
        mask[[0, 1, 1]] = true;
        Region::new(
            RoiCore::from_mask(mask).with_name(name),
            crate::roi::RegionKind::Generic,
        )
    }

    #[test]
    fn test_file_name_layout() {
        let name = file_name(&named("left"), "roi.json");
        assert!(name.starts_with("Region_left"));
        assert!(name.ends_with(".roi.json"));
        assert_eq!(name.len(), "Region_left".len() + 16 + ".roi.json".len());
    }

    #[test]
    fn test_file_name_depends_on_name_and_mask() {
        assert_eq!(file_name(&named("a"), "x"), file_name(&named("a"), "x"));
        assert_ne!(file_name(&named("a"), "x"), file_name(&named("b"), "x"));
        let mut other = named("a");
        other.core = RoiCore::from_mask(Mask::from_elem((1, 3, 3), true)).with_name("a");
        assert_ne!(file_name(&named("a"), "x"), file_name(&other, "x"));
    }

    #[test]
    fn test_path_separators_stay_out_of_names() {
        let name = file_name(&named("a/b"), "roi.json");
        assert!(!name.contains('/'));
    }
}
