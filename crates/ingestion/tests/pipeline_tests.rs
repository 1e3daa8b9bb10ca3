//! Tiling pipeline runs against a temporary data tree.

use std::path::Path;

use ingestion::{
    assemble_dalles, ChartOutcome, PipelineConfig, SourceIndex, TilingPipeline, STAGING_DIR,
};
use storage::CatalogDocument;
use test_utils::fixtures::SAMPLE_CATALOG;
use test_utils::{count_pixels, create_solid_raster, create_test_raster, TestDataDir};

const RED: [u8; 4] = [200, 0, 0, 255];

const TWO_CHARTS: &str = r#"
layers:
  gt50k:
    - { name: 1001_pal300, scaleDenominator: 50000, width: 1500, height: 1100,
        south: 47.0, west: -3.0, north: 47.5, east: -2.0, left: 0, top: 0, right: 1500, bottom: 1100 }
    - { name: 1002_pal300, scaleDenominator: 50000, width: 300, height: 300,
        south: 47.0, west: -3.0, north: 47.5, east: -2.0, left: 0, top: 0, right: 300, bottom: 300 }
    - { name: 1003_pal300, scaleDenominator: 50000, width: 64, height: 64,
        south: 47.0, west: -3.0, north: 47.5, east: -2.0, left: 0, top: 0, right: 64, bottom: 64 }
"#;

fn sources(dir: &Path) -> SourceIndex {
    SourceIndex::scan(dir, &PipelineConfig::default().source_extensions).unwrap()
}

#[test]
fn slicing_round_trip_reproduces_source() {
    let data = TestDataDir::new();
    let src_dir = data.root().join("sources");
    std::fs::create_dir_all(&src_dir).unwrap();
    let original = create_test_raster(1500, 1100);
    original.save(src_dir.join("1001_pal300.png")).unwrap();

    let doc = CatalogDocument::from_yaml(TWO_CHARTS).unwrap();
    let pipeline = TilingPipeline::new(data.tiles_root(), PipelineConfig::default());
    let report = pipeline.run(&doc, &sources(&src_dir), &["1001_pal300".to_string()]);

    assert!(report.is_success(), "{:?}", report);
    assert_eq!(
        report.outcomes,
        vec![ChartOutcome::Succeeded {
            name: "1001_pal300".to_string(),
            dalles: 4,
            erased: 0,
        }]
    );
    let rebuilt = assemble_dalles(&pipeline.chart_dir("1001_pal300"), 1500, 1100).unwrap();
    assert!(rebuilt == original);
    assert!(!data.tiles_root().join(STAGING_DIR).exists());
}

#[test]
fn failures_are_per_chart() {
    let data = TestDataDir::new();
    let src_dir = data.root().join("sources");
    std::fs::create_dir_all(&src_dir).unwrap();
    // 1001 has no source, 1002 has the wrong size, 1003 is fine
    create_solid_raster(100, 100, RED)
        .save(src_dir.join("1002_pal300.png"))
        .unwrap();
    create_solid_raster(64, 64, RED)
        .save(src_dir.join("1003_pal300.png"))
        .unwrap();

    let doc = CatalogDocument::from_yaml(TWO_CHARTS).unwrap();
    let pipeline = TilingPipeline::new(data.tiles_root(), PipelineConfig::default());
    let report = pipeline.run(&doc, &sources(&src_dir), &[]);

    assert!(!report.is_success());
    let failed: Vec<&str> = report.failed().map(|o| o.name()).collect();
    assert_eq!(failed, vec!["1001_pal300", "1002_pal300"]);
    let succeeded: Vec<&str> = report.succeeded().map(|o| o.name()).collect();
    assert_eq!(succeeded, vec!["1003_pal300"]);

    assert!(pipeline.chart_dir("1003_pal300").join("0-0.png").exists());
    assert!(!pipeline.chart_dir("1002_pal300").exists());
    assert!(!data.tiles_root().join(STAGING_DIR).exists());
}

#[test]
fn erasures_become_transparent() {
    let data = TestDataDir::new();
    let src_dir = data.root().join("sources");
    std::fs::create_dir_all(&src_dir).unwrap();
    create_solid_raster(200, 200, RED)
        .save(src_dir.join("7002_pal300.png"))
        .unwrap();

    let doc = CatalogDocument::from_yaml(SAMPLE_CATALOG).unwrap();
    let pipeline = TilingPipeline::new(data.tiles_root(), PipelineConfig::default());
    let report = pipeline.run(&doc, &sources(&src_dir), &["7002_pal300".to_string()]);

    let Some(ChartOutcome::Succeeded { erased, .. }) = report.outcomes.first() else {
        panic!("unexpected report {:?}", report);
    };
    let img = assemble_dalles(&pipeline.chart_dir("7002_pal300"), 200, 200).unwrap();
    assert_eq!(count_pixels(&img, [0, 0, 0, 0]) as u64, *erased);
    // rectangle in the north-east corner
    assert_eq!(img.get_pixel(199, 0).0, [0, 0, 0, 0]);
    // triangle in the south-west corner
    assert_eq!(img.get_pixel(1, 198).0, [0, 0, 0, 0]);
    assert_eq!(img.get_pixel(100, 100).0, RED);
    assert_eq!(img.get_pixel(199, 199).0, RED);
}

#[test]
fn rerun_replaces_published_chart() {
    let data = TestDataDir::new();
    let src_dir = data.root().join("sources");
    std::fs::create_dir_all(&src_dir).unwrap();
    let path = src_dir.join("1003_pal300.png");
    create_solid_raster(64, 64, RED).save(&path).unwrap();

    let doc = CatalogDocument::from_yaml(TWO_CHARTS).unwrap();
    let pipeline = TilingPipeline::new(data.tiles_root(), PipelineConfig::default());
    let only = ["1003_pal300".to_string()];
    assert!(pipeline.run(&doc, &sources(&src_dir), &only).is_success());

    let blue = [0, 0, 200, 255];
    create_solid_raster(64, 64, blue).save(&path).unwrap();
    assert!(pipeline.run(&doc, &sources(&src_dir), &only).is_success());

    let img = assemble_dalles(&pipeline.chart_dir("1003_pal300"), 64, 64).unwrap();
    assert_eq!(count_pixels(&img, blue), 64 * 64);
}

#[test]
fn source_index_prefers_listed_extension_order() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("sub")).unwrap();
    std::fs::write(dir.path().join("sub/7001_pal300.png"), b"").unwrap();
    std::fs::write(dir.path().join("7001_pal300.tif"), b"").unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"").unwrap();

    let index = sources(dir.path());
    assert_eq!(index.len(), 1);
    assert!(index.find("7001_pal300").unwrap().ends_with("7001_pal300.tif"));
    assert!(index.find("notes").is_none());
}
