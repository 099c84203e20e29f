//! JSON backend.

use super::{RoiRecord, RoiStore};
use crate::error::RoiResult;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Writes one compact JSON document per region.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonStore;

impl JsonStore {
    /// Create a JSON store.
    pub fn new() -> Self {
        Self
    }
}

impl RoiStore for JsonStore {
    fn format(&self) -> &'static str {
        "json"
    }

    fn extension(&self) -> &'static str {
        "roi.json"
    }

    fn write(&self, record: &RoiRecord, path: &Path) -> RoiResult<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, record)?;
        writer.flush()?;
        Ok(())
    }

    fn read(&self, path: &Path) -> RoiResult<RoiRecord> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Mask;
    use crate::roi::Region;
    use tempfile::tempdir;

    #[test]
    fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("r.roi.json");
        let record = RoiRecord::from_region(&Region::generic(Mask::from_elem((1, 2, 3), true)));
        JsonStore.write(&record, &path).unwrap();
        assert_eq!(JsonStore.read(&path).unwrap(), record);
    }

    #[test]
    fn test_enums_stored_by_value() {
        let region = crate::roi::blobs::build(
            crate::roi::RoiCore::from_mask(Mask::from_elem((1, 1, 2), true)),
            vec![crate::roi::SubRegion::from_mask(
                Mask::from_elem((1, 1, 2), true),
                crate::roi::SubRegionKind::Hemisphere,
                None,
            )],
            Default::default(),
        )
        .unwrap();
        let json = serde_json::to_string(&RoiRecord::from_region(&region)).unwrap();
        assert!(json.contains("\"view_direction\":\"posterior\""));
        assert!(json.contains("\"class\":\"Blobs\""));
    }
}
