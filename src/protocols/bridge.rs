//! Protocerebral bridge protocols.
//!
//! Glomeruli are found by correlating pixel time series, an interactive process that
//! runs outside this crate. [`begin_correlation_analysis`] splits the hand-off in two:
//! the [`CorrelationCompleter`] goes to whoever runs the analysis, and the
//! [`CorrelationHandle`] stays with the caller waiting for the region.
//!
//! ```no_run
//! use neuro_roi::protocols::{begin_correlation_analysis, CorrelationRequest};
//! # async fn demo(masks: Vec<neuro_roi::geometry::Mask>) -> neuro_roi::error::RoiResult<()> {
//! let (handle, completer) = begin_correlation_analysis(CorrelationRequest::default());
//! tokio::spawn(async move {
//!     let _ = completer.complete(masks, None);
//! });
//! let bridge = handle.await_result().await?;
//! println!("{}", bridge);
//! # Ok(())
//! # }
//! ```

use super::{Capabilities, ExtractionInput, ExtractionOptions, ExtractionProtocol, ShapeKind};
use crate::error::{RoiError, RoiResult};
use crate::geometry::Mask;
use crate::roi::mustache::{self, MustacheParams};
use crate::roi::{Region, ViewDirection};
use ndarray::{Array3, Array4};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Data the correlation analysis runs on.
#[derive(Debug, Clone)]
pub struct CorrelationRequest {
    /// Raw frames `(time, planes, y, x)`
    pub frames: Option<Array4<f64>>,
    /// Reference frames `(planes, y, x)`
    pub references: Option<Array3<f64>>,
    /// Side the bridge was imaged from
    pub view_direction: ViewDirection,
    /// Left-right flipped image
    pub mirrored: bool,
    /// Name given to the resulting region
    pub roi_name: Option<String>,
}

impl Default for CorrelationRequest {
    fn default() -> Self {
        Self {
            frames: None,
            references: None,
            view_direction: ViewDirection::Posterior,
            mirrored: false,
            roi_name: None,
        }
    }
}

fn abandoned() -> RoiError {
    RoiError::NoRoi("correlation analysis ended without a result".to_string())
}

/// Start a correlation analysis.
pub fn begin_correlation_analysis(
    request: CorrelationRequest,
) -> (CorrelationHandle, CorrelationCompleter) {
    let (tx, rx) = oneshot::channel();
    debug!(
        has_frames = request.frames.is_some(),
        has_references = request.references.is_some(),
        "correlation analysis started"
    );
    (
        CorrelationHandle { rx },
        CorrelationCompleter { request, tx },
    )
}

/// Producer side of a correlation analysis.
///
/// Dropping it without calling [`complete`](Self::complete) or [`fail`](Self::fail)
/// resolves the handle with [`RoiError::NoRoi`].
#[derive(Debug)]
pub struct CorrelationCompleter {
    request: CorrelationRequest,
    tx: oneshot::Sender<RoiResult<Region>>,
}

impl CorrelationCompleter {
    /// The request being served.
    pub fn request(&self) -> &CorrelationRequest {
        &self.request
    }

    /// Deliver the delineated glomeruli.
    ///
    /// The bridge region is built here and sent to the handle; a build error is sent
    /// in its place.
    ///
    /// # Errors
    ///
    /// [`RoiError::NoRoi`] when the handle was already dropped.
    pub fn complete(
        self,
        glomeruli: Vec<Mask>,
        pseudophases: Option<Vec<Option<f64>>>,
    ) -> RoiResult<()> {
        let params = MustacheParams {
            view_direction: self.request.view_direction,
        };
        let name = self
            .request
            .roi_name
            .clone()
            .unwrap_or_else(|| "Protocerebral bridge".to_string());
        let result = mustache::from_glomeruli(glomeruli, pseudophases, self.request.mirrored, params)
            .map(|mut region| {
                region.core.name = Some(name);
                region
            });
        match &result {
            Ok(region) => info!(glomeruli = region.subregions().len(), "correlation analysis complete"),
            Err(e) => warn!(error = %e, "correlation analysis produced no region"),
        }
        self.tx
            .send(result)
            .map_err(|_| RoiError::NoRoi("correlation handle was dropped".to_string()))
    }

    /// Abort the analysis with an error.
    pub fn fail(self, error: RoiError) {
        warn!(error = %error, "correlation analysis failed");
        let _ = self.tx.send(Err(error));
    }
}

/// Consumer side of a correlation analysis.
#[derive(Debug)]
pub struct CorrelationHandle {
    rx: oneshot::Receiver<RoiResult<Region>>,
}

impl CorrelationHandle {
    /// Wait for the region.
    pub async fn await_result(self) -> RoiResult<Region> {
        self.rx.await.unwrap_or_else(|_| Err(abandoned()))
    }

    /// The region if the analysis has finished, `None` while it is running.
    pub fn try_result(&mut self) -> Option<RoiResult<Region>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(abandoned())),
        }
    }

    /// Run `callback` with the result on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// [`RoiError::Unsupported`] outside a tokio runtime.
    pub fn on_complete<F>(self, callback: F) -> RoiResult<JoinHandle<()>>
    where
        F: FnOnce(RoiResult<Region>) + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|e| {
            RoiError::Unsupported(format!("completion callbacks need a tokio runtime: {}", e))
        })?;
        Ok(runtime.spawn(async move {
            callback(self.await_result().await);
        }))
    }
}

/// Correlation-map protocol for the protocerebral bridge.
///
/// Extraction is asynchronous; see [`begin_correlation_analysis`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FitVonMises;

impl ExtractionProtocol for FitVonMises {
    fn name(&self) -> &'static str {
        "Fit von Mises"
    }

    fn base_roi_text(&self) -> &'static str {
        "View correlation map"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            accepts_frame_data: true,
            accepts_reference_frames: true,
            ..Capabilities::default()
        }
    }

    fn region_class(&self) -> &'static str {
        "GlobularMustache"
    }

    fn extract(&self, _input: &ExtractionInput<'_>, _options: &ExtractionOptions) -> RoiResult<Region> {
        Err(RoiError::Unsupported(
            "synchronous correlation extraction, use begin_correlation_analysis".to_string(),
        ))
    }
}

/// Glomeruli from manually drawn compartments. Not implemented.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualSegmentation;

impl ExtractionProtocol for ManualSegmentation {
    fn name(&self) -> &'static str {
        "Manual segmentation"
    }

    fn base_roi_text(&self) -> &'static str {
        "Use segments to create ROI"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            accepts_reference_frames: true,
            shape_kind: Some(ShapeKind::Polygon),
            ..Capabilities::default()
        }
    }

    fn region_class(&self) -> &'static str {
        "GlobularMustache"
    }

    fn extract(&self, _input: &ExtractionInput<'_>, _options: &ExtractionOptions) -> RoiResult<Region> {
        Err(RoiError::Unsupported(
            "manual compartment construction".to_string(),
        ))
    }
}
