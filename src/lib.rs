//! # neuro_roi
//!
//! Extraction, segmentation and persistence of anatomical regions of interest in
//! volumetric calcium-imaging data of the insect central complex.
//!
//! ## Crate Structure
//!
//! - **`geometry`**: Mask and polygon utilities: areas, centroids, boolean algebra,
//!   largest-shape selection, complex-number angle helpers and exact tour ordering.
//! - **`roi`**: The `Region` entity with its anatomy-specific kinds (ellipse, fan,
//!   blob pair, glomerulus cluster) and their segmentation into ordered subregions.
//! - **`protocols`**: Extraction protocols that turn raw annotations into a region,
//!   each declaring the inputs it consumes through `Capabilities`.
//! - **`catalog`**: Region categories, their aliases and their protocols.
//! - **`storage`**: Content-addressed region files with JSON and HDF5 backends.
//! - **`config`**: Figment-based configuration (`config/neuro_roi.toml` + `NEURO_ROI_*`).
//! - **`logging`**: `tracing` subscriber setup.
//! - **`error`**: The crate-wide `RoiError`.
//!
//! ## Example
//!
//! ```
//! use neuro_roi::catalog::catalog;
//! use neuro_roi::geometry::{Mask, Shape};
//! use neuro_roi::protocols::{ExtractionInput, ExtractionOptions, ExtraRois};
//! use neuro_roi::roi::SegmentOptions;
//!
//! let mut outline = Mask::from_elem((1, 32, 32), false);
//! for y in 4..28 {
//!     for x in 4..28 {
//!         outline[[0, y, x]] = true;
//!     }
//! }
//! let shapes = vec![Shape::Mask(outline)];
//! let options = ExtractionOptions { extra_rois: ExtraRois::None, ..Default::default() };
//!
//! let mut eb = catalog()
//!     .extract("eb", None, &ExtractionInput::from_shapes(&shapes), &options)
//!     .unwrap();
//! eb.segment(&SegmentOptions::default().with_segments(8)).unwrap();
//! assert_eq!(eb.subregions().len(), 8);
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod protocols;
pub mod roi;
pub mod storage;

pub use error::{RoiError, RoiResult};
pub use roi::{Region, SubRegion, ViewDirection};
