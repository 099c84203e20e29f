//! Region catalog lookups and protocol dispatch.

use ndarray::{array, s, Array3};
use neuro_roi::catalog::{catalog, Catalog, RegionCategory};
use neuro_roi::error::RoiError;
use neuro_roi::geometry::{pixel_count, Mask, Polygon, Shape};
use neuro_roi::protocols::{
    ExtraRois, ExtractionInput, ExtractionOptions, ExtractionProtocol, GenericRoi, OutlineFan,
    UseEllipse,
};
use neuro_roi::roi::{RegionKind, SegmentOptions, SubRegionKind, ViewDirection};
use std::f64::consts::FRAC_PI_2;

fn square(planes: usize, side: usize, from: usize, to: usize) -> Mask {
    let mut mask = Mask::from_elem((planes, side, side), false);
    mask.slice_mut(s![.., from..to, from..to]).fill(true);
    mask
}

#[test]
fn test_every_alias_resolves() {
    let expected = [
        ("eb", "Ellipsoid body"),
        ("Ellipsoid", "Ellipsoid body"),
        ("fsb", "Fan-shaped body"),
        ("fan shaped body", "Fan-shaped body"),
        ("PB", "Protocerebral bridge"),
        ("bridge", "Protocerebral bridge"),
        ("nod", "Noduli"),
        ("generic", "Generic"),
    ];
    for (alias, name) in expected {
        assert_eq!(catalog().category(alias).unwrap().name(), name, "{}", alias);
    }
}

#[test]
fn test_defaults_and_protocol_names() {
    let names = |alias: &str| -> Vec<&'static str> {
        catalog()
            .category(alias)
            .unwrap()
            .protocols()
            .map(|p| p.name())
            .collect()
    };
    assert_eq!(names("eb"), vec!["Use ellipse", "Fit von Mises"]);
    assert_eq!(catalog().default_protocol("eb").unwrap().name(), "Use ellipse");
    assert_eq!(catalog().default_protocol("pb").unwrap().name(), "Fit von Mises");
    assert_eq!(catalog().default_protocol("noduli").unwrap().name(), "Draw ROI");
    assert_eq!(
        catalog().protocol("fb", "outline FAN").unwrap().region_class(),
        "Fan"
    );
    assert!(matches!(
        catalog().protocol("fb", "Use ellipse"),
        Err(RoiError::InvalidParameter(_))
    ));
}

#[test]
fn test_ellipse_with_center_pipeline() {
    let shapes = vec![
        Shape::Mask(square(1, 24, 10, 14)),
        Shape::Mask(square(1, 24, 2, 22)),
    ];
    let options = ExtractionOptions {
        roi_name: Some("EB".to_string()),
        ..ExtractionOptions::default()
    };
    let mut eb = catalog()
        .extract("eb", None, &ExtractionInput::from_shapes(&shapes), &options)
        .unwrap();

    assert_eq!(eb.name(), "EB");
    assert_eq!(pixel_count(eb.mask().unwrap().view()), 20 * 20 - 4 * 4);
    let RegionKind::Ellipse(params) = &eb.kind else {
        panic!("expected an ellipse, got {}", eb.class_name());
    };
    assert_eq!(params.center_mask.as_ref().map(|c| pixel_count(c.view())), Some(16));

    eb.segment(&SegmentOptions::default()).unwrap();
    assert_eq!(eb.subregions().len(), 16);
    assert!(eb.subregions().iter().all(|w| w.kind == SubRegionKind::Wedge));
}

#[test]
fn test_ellipse_center_needs_two_shapes() {
    let shapes = vec![Shape::Mask(square(1, 10, 2, 8))];
    let result = UseEllipse.extract(
        &ExtractionInput::from_shapes(&shapes),
        &ExtractionOptions::default(),
    );
    assert!(matches!(result, Err(RoiError::InvalidSelection(_))));

    let options = ExtractionOptions {
        extra_rois: ExtraRois::None,
        ..ExtractionOptions::default()
    };
    assert!(UseEllipse
        .extract(&ExtractionInput::from_shapes(&shapes), &options)
        .is_ok());
}

#[test]
fn test_fan_takes_orientation_and_exclusion() {
    let shapes = vec![Shape::Mask(square(2, 16, 2, 14))];
    let reference: Vec<Polygon> = vec![array![[0.0, 0.0], [0.0, 10.0]]];
    let input = ExtractionInput::from_shapes(&shapes).with_anatomy_reference(&reference);
    let options = ExtractionOptions {
        exclusion: Some(square(2, 16, 2, 6)),
        view_direction: Some(ViewDirection::Posterior),
        ..ExtractionOptions::default()
    };

    let fb = OutlineFan.extract(&input, &options).unwrap();
    let RegionKind::Fan(params) = &fb.kind else {
        panic!("expected a fan");
    };
    assert!((params.orientation - FRAC_PI_2).abs() < 1e-12);
    assert_eq!(params.view_direction, ViewDirection::Posterior);
    assert!(params.mirrored);
    assert_eq!(
        pixel_count(fb.mask().unwrap().view()),
        2 * (12 * 12 - 4 * 4)
    );
}

#[test]
fn test_reference_frames_must_match_masks() {
    let shapes = vec![Shape::Mask(square(1, 10, 2, 8))];
    let frames = Array3::<f64>::zeros((1, 12, 12));
    let input = ExtractionInput::from_shapes(&shapes).with_reference_frames(frames.view());
    assert!(matches!(
        GenericRoi.extract(&input, &ExtractionOptions::default()),
        Err(RoiError::ShapeMismatch { .. })
    ));
}

#[test]
fn test_fixed_slice_restricts_extraction() {
    let mut mask = square(3, 10, 2, 8);
    mask.slice_mut(s![0, 2..4, 2..4]).fill(false);
    let shapes = vec![Shape::Mask(mask)];
    let options = ExtractionOptions {
        slice_idx: Some(1),
        ..ExtractionOptions::default()
    };
    let roi = catalog()
        .extract("generic", None, &ExtractionInput::from_shapes(&shapes), &options)
        .unwrap();
    assert_eq!(roi.core.slice_idx, Some(1));
    assert_eq!(pixel_count(roi.mask().unwrap().view()), 36);
}

#[test]
fn test_noduli_hemispheres_are_ordered() {
    let mut left = Mask::from_elem((1, 10, 20), false);
    left.slice_mut(s![0, 2..6, 1..5]).fill(true);
    let mut right = Mask::from_elem((1, 10, 20), false);
    right.slice_mut(s![0, 2..7, 14..19]).fill(true);
    let shapes = vec![Shape::Mask(left), Shape::Mask(right)];

    let no = catalog()
        .extract(
            "no",
            None,
            &ExtractionInput::from_shapes(&shapes),
            &ExtractionOptions::default(),
        )
        .unwrap();
    assert_eq!(no.class_name(), "Blobs");
    let phases: Vec<Option<f64>> = no.subregions().iter().map(|h| h.phase).collect();
    assert_eq!(phases, vec![Some(0.0), Some(1.0)]);
    // posterior view: anatomical left is on the image left
    let first_x = no.subregions()[0].center_estimate().unwrap()[2];
    assert!(first_x < 10.0);
}

#[test]
fn test_unimplemented_protocols_report_unsupported() {
    let shapes = vec![Shape::Mask(square(1, 10, 2, 8))];
    let input = ExtractionInput::from_shapes(&shapes);
    for (alias, protocol) in [
        ("eb", "Fit von Mises"),
        ("pb", "Fit von Mises"),
        ("pb", "Manual segmentation"),
        ("noduli", "ICA (independent component analysis)"),
    ] {
        let result = catalog().extract(alias, Some(protocol), &input, &ExtractionOptions::default());
        assert!(
            matches!(result, Err(RoiError::Unsupported(_))),
            "{} / {}",
            alias,
            protocol
        );
    }
}

#[test]
fn test_custom_catalog_rejects_alias_collision() {
    let mut custom = Catalog::new();
    custom
        .register(
            RegionCategory::new("Lateral accessory lobe", &["lal"])
                .with_protocol(GenericRoi)
                .unwrap(),
        )
        .unwrap();
    let clash = RegionCategory::new("Lateral lobe", &["LAL"])
        .with_protocol(GenericRoi)
        .unwrap();
    assert!(matches!(
        custom.register(clash),
        Err(RoiError::InvalidParameter(_))
    ));
}
