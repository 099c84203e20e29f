//! Two-phase protocerebral bridge extraction through the correlation handle.

use ndarray::s;
use neuro_roi::error::RoiError;
use neuro_roi::geometry::Mask;
use neuro_roi::protocols::{begin_correlation_analysis, CorrelationRequest};
use neuro_roi::roi::{RegionKind, SubRegionKind, ViewDirection};
use std::time::Duration;
use tokio::sync::oneshot;

fn glomeruli(n: usize) -> Vec<Mask> {
    (0..n)
        .map(|i| {
            let mut mask = Mask::from_elem((1, 6, 4 * n), false);
            mask.slice_mut(s![0, 2..4, 4 * i..4 * i + 2]).fill(true);
            mask
        })
        .collect()
}

#[tokio::test]
async fn test_result_arrives_from_worker_task() {
    let request = CorrelationRequest {
        roi_name: Some("PB fly 3".to_string()),
        mirrored: true,
        ..CorrelationRequest::default()
    };
    let (handle, completer) = begin_correlation_analysis(request);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        let phases = Some((0..4).map(|i| Some(i as f64)).collect());
        completer.complete(glomeruli(4), phases).unwrap();
    });

    let pb = handle.await_result().await.unwrap();
    assert_eq!(pb.name(), "PB fly 3");
    assert_eq!(pb.subregions().len(), 4);
    assert!(pb
        .subregions()
        .iter()
        .all(|g| g.kind == SubRegionKind::Glomerulus));
    // mirrored reverses the supplied pseudophases
    let phases: Vec<Option<f64>> = pb.subregions().iter().map(|g| g.phase).collect();
    assert_eq!(phases, vec![Some(3.0), Some(2.0), Some(1.0), Some(0.0)]);
    let RegionKind::GlobularMustache(params) = &pb.kind else {
        panic!("expected a glomerulus cluster");
    };
    assert_eq!(params.view_direction, ViewDirection::Posterior);
}

#[tokio::test]
async fn test_on_complete_runs_callback() {
    let (handle, completer) = begin_correlation_analysis(CorrelationRequest::default());
    let (tx, rx) = oneshot::channel();

    let task = handle
        .on_complete(move |result| {
            let _ = tx.send(result.map(|pb| pb.subregions().len()));
        })
        .unwrap();
    completer.complete(glomeruli(3), None).unwrap();

    task.await.unwrap();
    assert_eq!(rx.await.unwrap().unwrap(), 3);
}

#[tokio::test]
async fn test_dropped_completer_resolves_to_no_roi() {
    let (handle, completer) = begin_correlation_analysis(CorrelationRequest::default());
    drop(completer);
    assert!(matches!(
        handle.await_result().await,
        Err(RoiError::NoRoi(_))
    ));
}

#[tokio::test]
async fn test_failure_is_forwarded() {
    let (handle, completer) = begin_correlation_analysis(CorrelationRequest::default());
    completer.fail(RoiError::InvalidParameter("no correlated pixels".to_string()));
    assert!(matches!(
        handle.await_result().await,
        Err(RoiError::InvalidParameter(_))
    ));
}

#[tokio::test]
async fn test_empty_glomerulus_list_is_sent_as_error() {
    let (handle, completer) = begin_correlation_analysis(CorrelationRequest::default());
    completer.complete(Vec::new(), None).unwrap();
    assert!(matches!(
        handle.await_result().await,
        Err(RoiError::NoRoi(_))
    ));
}

#[test]
fn test_on_complete_needs_runtime() {
    let (handle, _completer) = begin_correlation_analysis(CorrelationRequest::default());
    assert!(matches!(
        handle.on_complete(|_| {}),
        Err(RoiError::Unsupported(_))
    ));
}
