//! End-to-end tests: GeoTIFF + GeoJSON on disk through clipping, reduction,
//! correlation and time-series aggregation.

use approx::assert_relative_eq;
use nightlight_analysis::prelude::*;
use nightlight_core::io::{read_geotiff, write_geotiff};
use nightlight_parallel::ProcessingMode;
use std::path::Path;

const NODATA: f64 = -999.0;

/// 40x60 radiance field over lon [0, 60], lat [0, 40], with a masked stripe
fn radiance(rows: usize, cols: usize, scale: f64) -> MaskedGrid {
    let data = (0..rows * cols)
        .map(|i| {
            let (r, c) = (i / cols, i % cols);
            if c == 17 {
                NODATA
            } else {
                scale * (((r * 31 + c * 7) % 97) as f64 + 0.5)
            }
        })
        .collect();
    MaskedGrid::from_vec(
        data,
        rows,
        cols,
        Some(NODATA),
        GeoTransform::new(0.0, rows as f64, 1.0, -1.0),
    )
    .unwrap()
}

const COUNTRIES: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "properties": { "name": "Westland", "gdp_md_est": 1200 },
      "geometry": { "type": "Polygon", "coordinates": [[[2,2],[20,2],[20,30],[2,30],[2,2]]] }
    },
    {
      "type": "Feature",
      "properties": { "name": "Eastland", "gdp_md_est": 5400.5 },
      "geometry": { "type": "MultiPolygon", "coordinates": [
        [[[30,5],[45,5],[45,20],[30,20],[30,5]]],
        [[[50,25],[58,25],[58,38],[50,38],[50,25]]]
      ] }
    },
    {
      "type": "Feature",
      "properties": { "name": "Faraway" },
      "geometry": { "type": "Polygon", "coordinates": [[[100,100],[110,100],[110,110],[100,100]]] }
    },
    {
      "type": "Feature",
      "properties": { "name": "Dot" },
      "geometry": { "type": "Point", "coordinates": [1, 1] }
    }
  ]
}"#;

fn write_countries(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("countries.geojson");
    std::fs::write(&path, COUNTRIES).unwrap();
    path
}

// ---------------------------------------------------------------------------
// Reduction
// ---------------------------------------------------------------------------

#[test]
fn chunked_matches_eager_after_disk_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lights.tif");
    let grid = radiance(40, 60, 1.0);
    write_geotiff(&grid, &path).unwrap();

    let loaded = GeoTiffSource::new(&path).load().unwrap();
    assert_eq!(loaded.shape(), (40, 60));
    assert_eq!(loaded.valid_count(), 40 * 59);

    let eager = EagerReducer.reduce(&loaded).unwrap();
    for tile in [1, 3, 16, 64] {
        for mode in [ProcessingMode::Sequential, ProcessingMode::Parallel] {
            let chunked = ChunkedReducer::new(tile).unwrap().with_mode(mode);
            let s = chunked.reduce(&loaded).unwrap();
            assert_eq!(s.valid_count, eager.valid_count);
            assert_relative_eq!(s.sum, eager.sum, max_relative = 1e-9);
            assert_relative_eq!(s.mean, eager.mean, max_relative = 1e-9);
        }
    }
}

#[test]
fn fully_masked_grid_has_no_valid_data() {
    let grid = MaskedGrid::filled(8, 8, NODATA, Some(NODATA)).unwrap();
    assert!(matches!(EagerReducer.reduce(&grid), Err(Error::NoValidData { .. })));
    assert!(matches!(
        ChunkedReducer::new(3).unwrap().reduce(&grid),
        Err(Error::NoValidData { .. })
    ));
}

#[test]
fn georeferencing_survives_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lights.tif");
    let grid = radiance(10, 20, 0.5);
    write_geotiff(&grid, &path).unwrap();

    let band = read_geotiff(&path).unwrap();
    assert_eq!(band.nodata, Some(NODATA));
    assert_relative_eq!(band.transform.origin_x, 0.0);
    assert_relative_eq!(band.transform.origin_y, 10.0);
    assert_relative_eq!(band.transform.pixel_width, 1.0);
    assert_relative_eq!(band.transform.pixel_height, -1.0);
}

// ---------------------------------------------------------------------------
// Clipping and correlation
// ---------------------------------------------------------------------------

#[test]
fn countries_from_geojson() {
    let dir = tempfile::tempdir().unwrap();
    let boundaries = GeoJsonBoundaries::new(write_countries(dir.path()))
        .boundaries()
        .unwrap();

    let names: Vec<&str> = boundaries.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["Westland", "Eastland", "Faraway"]);
    assert_relative_eq!(boundaries[0].gdp_estimate(), 1200.0);
    assert_relative_eq!(boundaries[1].gdp_estimate(), 5400.5);
    assert_eq!(boundaries[2].gdp_estimate(), 0.0);
}

#[test]
fn multipolygon_envelope_spans_all_parts() {
    let grid = radiance(40, 60, 1.0);
    let boundaries = GeoJsonBoundaries::parse(COUNTRIES).unwrap();
    let east = find_boundary(&boundaries, "eastland").unwrap();

    let envelope = clip(&grid, east, ClipMode::Envelope).unwrap();
    assert_eq!(envelope.grid.shape(), (33, 28));

    let exact = clip(&grid, east, ClipMode::Exact).unwrap();
    // 15x15 + 8x13 pixel centers inside the two parts
    assert_eq!(exact.grid.valid_count(), 15 * 15 + 8 * 13);
    assert!(exact.grid.valid_count() < envelope.grid.valid_count());
}

#[test]
fn scalar_gdp_correlation_is_undefined() {
    let grid = radiance(40, 60, 1.0);
    let boundaries = GeoJsonBoundaries::parse(COUNTRIES).unwrap();

    let result =
        correlate_with_gdp(&grid, &boundaries, "Westland", &CountryParams::default()).unwrap();
    assert_eq!(
        result,
        CorrelationResult::Undefined {
            reason: UndefinedReason::ZeroVariance,
            count: 28 * 17,
        }
    );
    assert_eq!(result.to_string(), "undefined: zero variance (n = 476)");
}

#[test]
fn out_of_extent_country_is_an_error_for_correlation() {
    let grid = radiance(40, 60, 1.0);
    let boundaries = GeoJsonBoundaries::parse(COUNTRIES).unwrap();
    assert!(matches!(
        correlate_with_gdp(&grid, &boundaries, "Faraway", &CountryParams::default()),
        Err(Error::OutOfBounds { .. })
    ));
}

#[test]
fn activity_table_and_cross_country_correlation() {
    let grid = radiance(40, 60, 1.0);
    let boundaries = GeoJsonBoundaries::parse(COUNTRIES).unwrap();
    let config = AnalysisConfig::from_json_str(
        r#"{"reducer": {"kind": "chunked", "tile_size": 8}, "clip_mode": "exact"}"#,
    )
    .unwrap();
    let reducer = config.build_reducer().unwrap();

    let activity =
        country_activity(&grid, &boundaries, reducer.as_ref(), &config.country_params()).unwrap();
    assert_eq!(activity.len(), 2);
    assert!(activity.iter().all(|a| a.statistic.is_some()));

    let r = cross_country_correlation(&activity).unwrap();
    // two points always lie on a line
    assert_relative_eq!(r.coefficient().unwrap().abs(), 1.0, epsilon = 1e-9);
}

// ---------------------------------------------------------------------------
// Time series
// ---------------------------------------------------------------------------

#[test]
fn monthly_series_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut sources = Vec::new();
    for (month, scale) in [(1, 1.0), (2, 0.0), (3, 2.0)] {
        let path = dir.path().join(format!("VNL_2023{:02}.tif", month));
        let grid = if scale == 0.0 {
            MaskedGrid::filled(40, 60, NODATA, Some(NODATA)).unwrap()
        } else {
            radiance(40, 60, scale)
        };
        write_geotiff(&grid, &path).unwrap();
        sources.push(GeoTiffSource::new(path));
    }

    let series = aggregate_sources(&sources, &default_labels(3), &EagerReducer).unwrap();
    assert_eq!(series.len(), 3);
    assert_eq!(series.missing_count(), 1);

    let means = series.means();
    assert!(means[1].is_none());
    assert_relative_eq!(means[2].unwrap(), 2.0 * means[0].unwrap(), max_relative = 1e-6);
}

#[test]
fn label_count_must_match() {
    let grids = vec![radiance(4, 4, 1.0), radiance(4, 4, 2.0), radiance(4, 4, 3.0)];
    assert!(matches!(
        aggregate(&grids, &["Jan", "Feb"], &EagerReducer),
        Err(Error::LengthMismatch { expected: 3, found: 2 })
    ));
}
