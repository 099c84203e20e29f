//! Configuration validation messages.

use neuro_roi::config::RoiConfig;
use neuro_roi::error::RoiError;

#[test]
fn test_defaults_are_valid() {
    assert!(RoiConfig::default().validate().is_ok());
}

#[test]
fn test_unknown_log_level_rejected() {
    let mut config = RoiConfig::default();
    config.logging.level = "chatty".to_string();
    let err_msg = config.validate().unwrap_err().to_string();
    assert!(err_msg.contains("logging.level"));
    assert!(err_msg.contains("chatty"));
}

#[test]
fn test_log_level_is_case_insensitive() {
    let mut config = RoiConfig::default();
    config.logging.level = "DEBUG".to_string();
    config.logging.format = "Json".to_string();
    assert!(config.validate().is_ok());
}

#[test]
fn test_zero_ellipse_segments_rejected() {
    let mut config = RoiConfig::default();
    config.segmentation.ellipse_segments = 0;
    let result = config.validate();
    assert!(matches!(result, Err(RoiError::InvalidParameter(_))));
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("segmentation.ellipse_segments must be at least 1"));
}

#[test]
fn test_tour_limit_boundary() {
    let mut config = RoiConfig::default();
    config.segmentation.max_tour_glomeruli = 20;
    assert!(config.validate().is_ok());
    config.segmentation.max_tour_glomeruli = 21;
    let err_msg = config.validate().unwrap_err().to_string();
    assert!(err_msg.contains("exceeds the solver limit of 20"));
}

#[test]
fn test_unknown_storage_format_rejected() {
    let mut config = RoiConfig::default();
    config.storage.default_format = "zarr".to_string();
    let err_msg = config.validate().unwrap_err().to_string();
    assert!(err_msg.contains("storage.default_format"));
}

#[test]
fn test_configured_tour_ceiling_limits_ordering() {
    use neuro_roi::geometry::Mask;
    use neuro_roi::roi::{mustache, MustacheParams};

    let glomeruli: Vec<Mask> = (0..5)
        .map(|i| {
            let mut mask = Mask::from_elem((1, 3, 20), false);
            mask[[0, 1, 4 * i]] = true;
            mask
        })
        .collect();
    let mut pb =
        mustache::from_glomeruli(glomeruli, None, false, MustacheParams::default()).unwrap();

    let mut config = RoiConfig::default();
    config.segmentation.max_tour_glomeruli = 4;
    assert!(matches!(
        pb.sort_by_tour(config.segmentation.tour_ceiling(None)),
        Err(RoiError::InvalidParameter(_))
    ));

    config.segmentation.max_tour_glomeruli = 5;
    let order = pb.sort_by_tour(config.segmentation.tour_ceiling(None)).unwrap();
    assert_eq!(order.len(), 5);
}
