//! Saving and loading regions through the store backends.

use ndarray::s;
use neuro_roi::error::RoiError;
use neuro_roi::geometry::Mask;
use neuro_roi::roi::mustache::{self, MustacheParams};
use neuro_roi::roi::{
    blobs, BlobsParams, EllipseParams, FanParams, Region, RegionKind, RoiCore, SegmentOptions,
    SubRegion, SubRegionKind, ViewDirection,
};
use neuro_roi::storage::{self, Hdf5Store, JsonStore, RoiStore, StoreRegistry};
use tempfile::TempDir;

fn disk(size: usize, radius: f64) -> Mask {
    let c = (size / 2) as f64;
    Mask::from_shape_fn((2, size, size), |(_, y, x)| {
        let (dy, dx) = (y as f64 - c, x as f64 - c);
        (dy * dy + dx * dx).sqrt() <= radius
    })
}

fn segmented_ellipse() -> Region {
    let mask = disk(21, 8.0);
    let mut center = Mask::from_elem(mask.dim(), false);
    center.slice_mut(s![.., 9..12, 9..12]).fill(true);
    let params = EllipseParams {
        orientation: 0.3,
        center_mask: Some(center),
        view_direction: ViewDirection::Posterior,
        mirrored: true,
    };
    let core = RoiCore::from_mask(mask).with_name("EB left");
    let mut eb = Region::new(core, RegionKind::Ellipse(params));
    eb.segment(&SegmentOptions::default().with_segments(16)).unwrap();
    eb
}

fn segmented_fan() -> Region {
    let mut mask = disk(21, 9.0);
    mask.slice_mut(s![.., 11.., ..]).fill(false);
    let params = FanParams {
        orientation: -0.2,
        ..FanParams::default()
    };
    let mut core = RoiCore::from_mask(mask).with_name("FB").with_slice_idx(Some(1));
    core.info_string = Some("layer 3".to_string());
    let mut fb = Region::new(core, RegionKind::Fan(params));
    fb.segment(&SegmentOptions::default().with_segments(8)).unwrap();
    fb
}

fn noduli() -> Region {
    let mut left = Mask::from_elem((1, 10, 20), false);
    left.slice_mut(s![0, 3..7, 2..6]).fill(true);
    let mut right = Mask::from_elem((1, 10, 20), false);
    right.slice_mut(s![0, 3..7, 13..18]).fill(true);
    let mut union = left.clone();
    union.zip_mut_with(&right, |u, &r| *u = *u || r);
    let hemispheres = vec![
        SubRegion::from_mask(right, SubRegionKind::Hemisphere, None),
        SubRegion::from_mask(left, SubRegionKind::Hemisphere, None),
    ];
    blobs::build(
        RoiCore::from_mask(union).with_name("Noduli"),
        hemispheres,
        BlobsParams::default(),
    )
    .unwrap()
}

fn bridge() -> Region {
    let glomeruli = (0..6)
        .map(|i| {
            let mut mask = Mask::from_elem((1, 8, 40), false);
            mask.slice_mut(s![0, 3..5, i * 6..i * 6 + 3]).fill(true);
            mask
        })
        .collect();
    let phases = Some((0..6).map(|i| Some(i as f64 * 0.5)).collect());
    mustache::from_glomeruli(glomeruli, phases, false, MustacheParams::default()).unwrap()
}

fn round_trip(region: &Region, store: &dyn RoiStore) -> Region {
    let dir = TempDir::new().unwrap();
    let path = region.save(dir.path(), store).unwrap();
    assert!(path.exists());
    Region::load(&path).unwrap()
}

#[test]
fn test_json_round_trip_each_kind() {
    let store = JsonStore::new();
    for region in [segmented_ellipse(), segmented_fan(), noduli(), bridge()] {
        let loaded = round_trip(&region, &store);
        assert_eq!(loaded, region, "{} changed on disk", region.class_name());
    }
}

#[test]
fn test_loaded_subregions_keep_phase_and_order() {
    let eb = segmented_ellipse();
    let loaded = round_trip(&eb, &JsonStore::new());
    let phases: Vec<Option<f64>> = loaded.subregions().iter().map(|w| w.phase).collect();
    let expected: Vec<Option<f64>> = eb.subregions().iter().map(|w| w.phase).collect();
    assert_eq!(phases, expected);
    assert!(loaded
        .subregions()
        .iter()
        .all(|w| w.kind == SubRegionKind::Wedge));

    let pb = round_trip(&bridge(), &JsonStore::new());
    assert_eq!(pb.subregions()[3].phase, Some(1.5));
    assert_eq!(pb.subregions()[3].kind, SubRegionKind::Glomerulus);
}

#[test]
fn test_same_region_same_file() {
    let dir = TempDir::new().unwrap();
    let fb = segmented_fan();
    let first = fb.save(dir.path(), &JsonStore::new()).unwrap();
    let second = fb.save(dir.path(), &JsonStore::new()).unwrap();
    assert_eq!(first, second);

    let name = first.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("Fan_FB"), "{}", name);
    assert!(name.ends_with(".roi.json"), "{}", name);
    // 16 hex digits between the name and the extension
    let hash = &name["Fan_FB".len()..name.len() - ".roi.json".len()];
    assert_eq!(hash.len(), 16);
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_filter_rejects_region() {
    let dir = TempDir::new().unwrap();
    let path = noduli().save(dir.path(), &JsonStore::new()).unwrap();

    let kept = storage::load_filtered(&path, |r| r.class_name() == "Blobs").unwrap();
    assert_eq!(kept.subregions().len(), 2);

    let rejected = storage::load_filtered(&path, |r| r.class_name() == "Fan");
    assert!(matches!(rejected, Err(RoiError::NoRoi(_))));
}

#[test]
fn test_load_rois_recurses_and_skips_other_files() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("fly1").join("trial2");
    segmented_ellipse().save(dir.path(), &JsonStore::new()).unwrap();
    segmented_fan().save(&nested, &JsonStore::new()).unwrap();
    std::fs::write(dir.path().join("notes.txt"), "not a region").unwrap();

    let regions = storage::load_rois(dir.path()).unwrap();
    let mut classes: Vec<&str> = regions.iter().map(|r| r.class_name()).collect();
    classes.sort_unstable();
    assert_eq!(classes, vec!["Ellipse", "Fan"]);
}

#[test]
fn test_registry_picks_store_by_extension() {
    let registry = StoreRegistry::new();
    assert_eq!(registry.list_formats(), vec!["hdf5".to_string(), "json".to_string()]);
    assert!(registry.is_roi_file(std::path::Path::new("a/Fan_x0123.roi.json")));
    assert!(!registry.is_roi_file(std::path::Path::new("a/b.json")));
    assert!(matches!(
        registry.create("tiff"),
        Err(RoiError::InvalidParameter(_))
    ));
}

#[cfg(not(feature = "storage_hdf5"))]
#[test]
fn test_hdf5_requires_feature() {
    let dir = TempDir::new().unwrap();
    let result = noduli().save(dir.path(), &Hdf5Store::new());
    assert!(matches!(result, Err(RoiError::FeatureNotEnabled(_))));
}

#[cfg(feature = "storage_hdf5")]
#[test]
fn test_hdf5_round_trip_each_kind() {
    let store = Hdf5Store::new();
    for region in [segmented_ellipse(), segmented_fan(), noduli(), bridge()] {
        let loaded = round_trip(&region, &store);
        assert_eq!(loaded, region, "{} changed on disk", region.class_name());
    }
}
