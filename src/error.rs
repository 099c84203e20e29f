//! Custom error types for the crate.
//!
//! This module defines the primary error type, `RoiError`, used by every module.
//! Using the `thiserror` crate, it provides a centralized and consistent way to handle
//! the different failure conditions of ROI extraction, segmentation and persistence.
//!
//! ## Error Hierarchy
//!
//! `RoiError` consolidates these error sources:
//!
//! - **`NoRoi`**: No usable region exists for the requested operation: a region built
//!   without a mask or polygon, a region type that cannot be segmented, an empty list
//!   handed to `Region::from_rois`, subregion masks requested before segmentation, or a
//!   loaded region rejected by the caller's filter.
//! - **`InvalidSelection`**: Shape selection asked for a rank that does not exist, or the
//!   candidate list was empty.
//! - **`Unsupported`**: Functionality that is deliberately not implemented yet (for
//!   example rasterizing a polygon into a mask). Callers can match on this variant to
//!   detect roadmap gaps instead of crashing.
//! - **`TypeMismatch`**: A stored type tag could not be resolved to a region type.
//! - **`FeatureNotEnabled`**: A storage backend that was not compiled in was requested.
//!   The message names the cargo feature that enables it.
//!
//! By using `#[from]`, `RoiError` can be created from I/O, JSON and array-shape errors,
//! simplifying error handling with the `?` operator.

use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type RoiResult<T> = std::result::Result<T, RoiError>;

/// Primary error type for ROI extraction, segmentation and persistence.
///
/// # Error Categories
///
/// 1. **Input Errors** - `NoRoi`, `InvalidSelection`, `InvalidParameter`, `ShapeMismatch`
///    - Raised while building or segmenting regions from user-drawn shapes
///    - Recovery: re-prompt the user for different shapes or options
///
/// 2. **Roadmap Gaps** - `Unsupported`, `FeatureNotEnabled`
///    - Raised where a code path exists but has no implementation (or was compiled out)
///    - Recovery: choose another protocol or rebuild with the named feature
///
/// 3. **Storage Errors** - `Io`, `Serialization`, `Hdf5`, `TypeMismatch`, `Array`
///    - Raised while saving or loading region files
///    - Recovery: check the path and file contents
#[derive(Error, Debug)]
pub enum RoiError {
    /// No region is available for the requested operation.
    #[error("No ROI: {0}")]
    NoRoi(String),

    /// Shape selection failed (rank out of range, empty candidate list).
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    /// The operation exists as a placeholder and is not implemented.
    #[error("Not yet supported: {0}")]
    Unsupported(String),

    /// A stored type tag or value could not be resolved.
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Two arrays that must share a shape did not.
    #[error("Shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        /// Shape of the receiving array
        expected: Vec<usize>,
        /// Shape of the offending array
        found: Vec<usize>,
    },

    /// A parameter was outside its valid range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A storage backend was requested that was not compiled in.
    #[error("Feature '{0}' is not enabled. Rebuild with --features {0}")]
    FeatureNotEnabled(String),

    /// Standard I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding of a region record failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An array could not be built from stored data.
    #[error("Array shape error: {0}")]
    Array(#[from] ndarray::ShapeError),

    /// The HDF5 backend reported an error.
    #[error("HDF5 error: {0}")]
    Hdf5(String),
}

#[cfg(feature = "storage_hdf5")]
impl From<hdf5::Error> for RoiError {
    fn from(err: hdf5::Error) -> Self {
        RoiError::Hdf5(err.to_string())
    }
}

impl RoiError {
    /// Whether an interactive caller should re-prompt for input rather than abort.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            RoiError::NoRoi(_)
                | RoiError::InvalidSelection(_)
                | RoiError::InvalidParameter(_)
                | RoiError::ShapeMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_message_names_flag() {
        let err = RoiError::FeatureNotEnabled("storage_hdf5".to_string());
        assert_eq!(
            err.to_string(),
            "Feature 'storage_hdf5' is not enabled. Rebuild with --features storage_hdf5"
        );
    }

    #[test]
    fn test_input_errors_are_recoverable() {
        assert!(RoiError::NoRoi("empty".into()).is_input_error());
        assert!(RoiError::InvalidSelection("n = 0".into()).is_input_error());
        assert!(!RoiError::Unsupported("midline".into()).is_input_error());
        assert!(!RoiError::Hdf5("closed".into()).is_input_error());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: RoiError = io.into();
        assert!(matches!(err, RoiError::Io(_)));
    }
}
