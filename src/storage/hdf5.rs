//! HDF5 backend.
//!
//! Layout of one file: scalars as attributes of the root group, masks as `*_shape`
//! and `*_runs` datasets, the polygon as a flat dataset with a `polygon_cols`
//! attribute, and a `subregions` group holding one child group per subregion,
//! named by zero-padded index.
//!
//! Only available with the `storage_hdf5` feature; otherwise every call returns
//! [`RoiError::FeatureNotEnabled`](crate::error::RoiError::FeatureNotEnabled).

use super::{RoiRecord, RoiStore};
use crate::error::RoiResult;
use std::path::Path;

#[cfg(not(feature = "storage_hdf5"))]
use crate::error::RoiError;

/// Writes one HDF5 file per region.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hdf5Store;

impl Hdf5Store {
    /// Create an HDF5 store.
    pub fn new() -> Self {
        Self
    }
}

impl RoiStore for Hdf5Store {
    fn format(&self) -> &'static str {
        "hdf5"
    }

    fn extension(&self) -> &'static str {
        "h5roi"
    }

    #[cfg(feature = "storage_hdf5")]
    fn write(&self, record: &RoiRecord, path: &Path) -> RoiResult<()> {
        let file = ::hdf5::File::create(path)?;
        imp::write_record(&file, record)?;
        let subregions = file.create_group("subregions")?;
        for (i, sub) in record.subregions.iter().enumerate() {
            let group = subregions.create_group(&format!("{:04}", i))?;
            imp::write_record(&group, sub)?;
        }
        Ok(())
    }

    #[cfg(feature = "storage_hdf5")]
    fn read(&self, path: &Path) -> RoiResult<RoiRecord> {
        let file = ::hdf5::File::open(path)?;
        let mut record = imp::read_record(&file)?;
        if file.link_exists("subregions") {
            let subregions = file.group("subregions")?;
            let mut names = subregions.member_names()?;
            names.sort();
            for name in names {
                record
                    .subregions
                    .push(imp::read_record(&subregions.group(&name)?)?);
            }
        }
        Ok(record)
    }

    #[cfg(not(feature = "storage_hdf5"))]
    fn write(&self, _record: &RoiRecord, _path: &Path) -> RoiResult<()> {
        Err(RoiError::FeatureNotEnabled("storage_hdf5".to_string()))
    }

    #[cfg(not(feature = "storage_hdf5"))]
    fn read(&self, _path: &Path) -> RoiResult<RoiRecord> {
        Err(RoiError::FeatureNotEnabled("storage_hdf5".to_string()))
    }
}

#[cfg(feature = "storage_hdf5")]
mod imp {
    use super::RoiRecord;
    use crate::error::{RoiError, RoiResult};
    use crate::roi::ViewDirection;
    use crate::storage::EncodedMask;
    use ::hdf5::types::VarLenUnicode;
    use ::hdf5::{Group, H5Type};
    use std::str::FromStr;

    fn write_str(group: &Group, name: &str, value: &str) -> RoiResult<()> {
        let value = VarLenUnicode::from_str(value).map_err(|e| RoiError::Hdf5(e.to_string()))?;
        group
            .new_attr::<VarLenUnicode>()
            .create(name)?
            .write_scalar(&value)?;
        Ok(())
    }

    fn write_scalar<T: H5Type>(group: &Group, name: &str, value: &T) -> RoiResult<()> {
        group.new_attr::<T>().create(name)?.write_scalar(value)?;
        Ok(())
    }

    fn write_data<T: H5Type>(group: &Group, name: &str, data: &[T]) -> RoiResult<()> {
        group.new_dataset_builder().with_data(data).create(name)?;
        Ok(())
    }

    fn to_u64(values: &[usize]) -> Vec<u64> {
        values.iter().map(|&v| v as u64).collect()
    }

    fn to_usize(values: Vec<u64>) -> Vec<usize> {
        values.into_iter().map(|v| v as usize).collect()
    }

    fn write_mask(group: &Group, prefix: &str, mask: &EncodedMask) -> RoiResult<()> {
        write_data(group, &format!("{}_shape", prefix), &to_u64(&mask.shape))?;
        write_data(group, &format!("{}_runs", prefix), &mask.runs)
    }

    pub(super) fn write_record(group: &Group, record: &RoiRecord) -> RoiResult<()> {
        write_str(group, "class", &record.class)?;
        write_str(group, "module", &record.module)?;
        if let Some(name) = &record.name {
            write_str(group, "name", name)?;
        }
        if let Some(info) = &record.info_string {
            write_str(group, "info_string", info)?;
        }
        if let Some(idx) = record.slice_idx {
            write_scalar(group, "slice_idx", &(idx as u64))?;
        }
        if let Some(orientation) = record.orientation {
            write_scalar(group, "orientation", &orientation)?;
        }
        if let Some(view) = record.view_direction {
            write_str(group, "view_direction", view.as_str())?;
        }
        if let Some(mirrored) = record.mirrored {
            write_scalar(group, "mirrored", &mirrored)?;
        }
        if let Some(phase) = record.phase {
            write_scalar(group, "phase", &phase)?;
        }
        if let Some(pseudophase) = record.pseudophase {
            write_scalar(group, "pseudophase", &pseudophase)?;
        }
        if let Some(shape) = &record.shape {
            write_data(group, "shape", &to_u64(shape))?;
        }
        if let Some(mask) = &record.mask {
            write_mask(group, "mask", mask)?;
        }
        if let Some(center) = &record.center_mask {
            write_mask(group, "center_mask", center)?;
        }
        if let Some(rows) = &record.polygon {
            let cols = rows.first().map_or(0, Vec::len);
            let flat: Vec<f64> = rows.iter().flatten().copied().collect();
            write_scalar(group, "polygon_cols", &(cols as u64))?;
            write_data(group, "polygon", &flat)?;
        }
        Ok(())
    }

    struct Reader<'a> {
        group: &'a Group,
        attrs: Vec<String>,
    }

    impl<'a> Reader<'a> {
        fn new(group: &'a Group) -> RoiResult<Self> {
            Ok(Self {
                group,
                attrs: group.attr_names()?,
            })
        }

        fn has_attr(&self, name: &str) -> bool {
            self.attrs.iter().any(|a| a == name)
        }

        fn string(&self, name: &str) -> RoiResult<Option<String>> {
            if !self.has_attr(name) {
                return Ok(None);
            }
            let value: VarLenUnicode = self.group.attr(name)?.read_scalar()?;
            Ok(Some(value.as_str().to_string()))
        }

        fn scalar<T: H5Type>(&self, name: &str) -> RoiResult<Option<T>> {
            if !self.has_attr(name) {
                return Ok(None);
            }
            Ok(Some(self.group.attr(name)?.read_scalar::<T>()?))
        }

        fn data<T: H5Type>(&self, name: &str) -> RoiResult<Option<Vec<T>>> {
            if !self.group.link_exists(name) {
                return Ok(None);
            }
            Ok(Some(self.group.dataset(name)?.read_raw::<T>()?))
        }

        fn mask(&self, prefix: &str) -> RoiResult<Option<EncodedMask>> {
            let shape = self.data::<u64>(&format!("{}_shape", prefix))?;
            let runs = self.data::<u64>(&format!("{}_runs", prefix))?;
            Ok(match (shape, runs) {
                (Some(shape), Some(runs)) => Some(EncodedMask {
                    shape: to_usize(shape),
                    runs,
                }),
                _ => None,
            })
        }

        fn polygon(&self) -> RoiResult<Option<Vec<Vec<f64>>>> {
            let Some(cols) = self.scalar::<u64>("polygon_cols")? else {
                return Ok(None);
            };
            let flat = self.data::<f64>("polygon")?.unwrap_or_default();
            if cols == 0 {
                return Ok(Some(Vec::new()));
            }
            Ok(Some(flat.chunks(cols as usize).map(<[f64]>::to_vec).collect()))
        }
    }

    pub(super) fn read_record(group: &Group) -> RoiResult<RoiRecord> {
        let reader = Reader::new(group)?;
        let view_direction = reader
            .string("view_direction")?
            .map(|s| ViewDirection::from_str(&s))
            .transpose()?;
        Ok(RoiRecord {
            name: reader.string("name")?,
            slice_idx: reader.scalar::<u64>("slice_idx")?.map(|v| v as usize),
            class: reader.string("class")?.unwrap_or_default(),
            module: reader.string("module")?.unwrap_or_default(),
            info_string: reader.string("info_string")?,
            mask: reader.mask("mask")?,
            shape: reader.data::<u64>("shape")?.map(to_usize),
            polygon: reader.polygon()?,
            orientation: reader.scalar("orientation")?,
            view_direction,
            mirrored: reader.scalar("mirrored")?,
            center_mask: reader.mask("center_mask")?,
            phase: reader.scalar("phase")?,
            pseudophase: reader.scalar("pseudophase")?,
            subregions: Vec::new(),
        })
    }
}
