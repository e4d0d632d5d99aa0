use estuary_imagery::core::projection::to_native;
use estuary_imagery::core::{AffineResolver, BandSet};
use estuary_imagery::io::FamilyExtras;
use estuary_imagery::{
    AffineMatrix, FamilyConfig, GeoPoint, ImageryError, IndexResolver, PixelIndex, Polygon,
    ProductFamily, RawProduct, RegionConfig, RegionTable, SatelliteImage,
};
use ndarray::{Array2, Array3};

const RAW_SHAPE: (usize, usize) = (60, 80);

fn utm_affine() -> AffineMatrix {
    AffineMatrix::new(10.0, 0.0, 300_000.0, 0.0, -10.0, 5_200_000.0)
}

fn utm_resolver() -> AffineResolver {
    AffineResolver::from_crs_str(utm_affine(), "EPSG:32620").unwrap()
}

/// Blue band is the ramp `row + col`, so resampled values reveal their source position
fn sentinel_raw() -> RawProduct {
    let mut bands = BandSet::new();
    bands.insert(
        "blue_band",
        Array2::from_shape_fn(RAW_SHAPE, |(r, c)| (r + c) as f32),
    );
    for name in ["green_band", "red_band", "nir_band"] {
        bands.insert(name, Array2::from_elem(RAW_SHAPE, 0.03f32));
    }
    bands.insert("cloud_prob", Array2::<f32>::zeros(RAW_SHAPE));
    bands.insert("scene_clf", Array2::from_elem(RAW_SHAPE, 6.0f32));
    bands.insert(
        "true_color_image",
        Array3::<f32>::zeros((RAW_SHAPE.0, RAW_SHAPE.1, 3)),
    );

    RawProduct {
        family: ProductFamily::Sentinel2,
        bands,
        date: "2021-07-14T15:19:11.024Z".to_string(),
        extras: FamilyExtras::Raster {
            crs: "EPSG:32620".to_string(),
            affine: utm_affine(),
            cloud_coverage: Some(12.5),
        },
    }
}

/// Polygon through the geographic positions of raw cells
fn polygon_around_cells(rows: (f64, f64), cols: (f64, f64)) -> Polygon {
    let resolver = utm_resolver();
    let vertices = [
        (rows.0, cols.0),
        (rows.0, cols.1),
        (rows.1, cols.1),
        (rows.1, cols.0),
    ]
    .iter()
    .map(|&(row, col)| resolver.locate(PixelIndex::new(row, col)).unwrap())
    .collect();
    Polygon::new(vertices).unwrap()
}

fn raw_distance(a: PixelIndex, b: PixelIndex) -> f64 {
    ((a.row - b.row).powi(2) + (a.col - b.col).powi(2)).sqrt()
}

#[test]
fn test_oblique_rotation_keeps_geo_pixel_consistency() {
    let region = RegionConfig::new("estuary")
        .with_rotation(-45.0)
        .with_polygon(polygon_around_cells((20.0, 40.0), (30.0, 50.0)));
    let image = SatelliteImage::from_raw(sentinel_raw(), &region, &FamilyConfig::sentinel2())
        .expect("product construction failed");

    assert_eq!(image.before_transform_image_shape(), RAW_SHAPE);
    let (rows, cols) = image.image_shape();
    assert!(rows > 20 && cols > 20, "crop too small: {:?}", (rows, cols));
    assert!(rows < 60 && cols < 80, "crop too large: {:?}", (rows, cols));

    let resolver = utm_resolver();
    let blue = image.single_band("blue_band").unwrap();
    for (r0, c0) in [(30usize, 40usize), (25, 35), (35, 45), (24, 46)] {
        let source = PixelIndex::from_cell(r0, c0);
        let geo = resolver.locate(source).unwrap();

        let (row, col) = image.pixel_for(geo).unwrap();
        let value = blue[[row, col]];
        assert!(
            (value - (r0 + c0) as f32).abs() <= 1.0 + 1e-3,
            "cell ({}, {}) holds {} for source ({}, {})",
            row,
            col,
            value,
            r0,
            c0
        );

        // Rounding to the final grid moves at most half a cell diagonal
        let back = image.geo_for(row, col).unwrap();
        let back_index = resolver.native_to_index(to_native(back, resolver.crs()).unwrap());
        assert!(raw_distance(back_index, source) <= 0.5f64.hypot(0.5) + 1e-3);
    }
}

#[test]
fn test_quarter_turn_is_exact() {
    let region = RegionConfig::new("estuary")
        .with_rotation(-90.0)
        .with_polygon(polygon_around_cells((10.0, 50.0), (20.0, 60.0)));
    let image = SatelliteImage::from_raw(sentinel_raw(), &region, &FamilyConfig::sentinel2())
        .unwrap();

    let resolver = utm_resolver();
    let blue = image.single_band("blue_band").unwrap();
    for (r0, c0) in [(10usize, 20usize), (30, 40), (50, 60), (42, 23)] {
        let geo = resolver.locate(PixelIndex::from_cell(r0, c0)).unwrap();
        let (row, col) = image.pixel_for(geo).unwrap();
        assert_eq!(blue[[row, col]], (r0 + c0) as f32);

        let back = image.geo_for(row, col).unwrap();
        assert!((back.longitude - geo.longitude).abs() < 1e-7);
        assert!((back.latitude - geo.latitude).abs() < 1e-7);
    }

    // Categorical bands are moved, never blended
    let scene = image.single_band("scene_clf").unwrap();
    assert!(scene.iter().all(|&v| v == 6.0));
    assert_eq!(image.water_mask().unwrap().iter().filter(|&&w| w).count(), scene.len());
}

#[test]
fn test_metadata_carried_to_product() {
    let table = RegionTable::builtin().unwrap();
    let mut region = table.get("general").unwrap().clone();
    region.polygon = None;

    let image = SatelliteImage::from_raw(sentinel_raw(), &region, &FamilyConfig::sentinel2())
        .unwrap();
    assert_eq!(image.key(), "general_2021-07-14");
    assert_eq!(image.atmospheric_correction(), "Sen2Cor");
    assert_eq!(image.cloud_coverage(), Some(12.5));
    assert_eq!(image.crs().unwrap().epsg_code(), 32620);
    assert_eq!(image.affine_matrix(), Some(&utm_affine()));
    assert_eq!(image.image_shape(), RAW_SHAPE);
}

#[test]
fn test_polygon_outside_scene_is_empty_region() {
    let region = RegionConfig::new("elsewhere")
        .with_polygon(polygon_around_cells((-60.0, -40.0), (-50.0, -30.0)));
    let result = SatelliteImage::from_raw(sentinel_raw(), &region, &FamilyConfig::sentinel2());
    assert!(matches!(result, Err(ImageryError::EmptyRegion(_))));
}

#[test]
fn test_missing_inputs_are_not_found() {
    let mut raw = sentinel_raw();
    raw.bands.remove("blue_band").unwrap();
    let result = SatelliteImage::from_raw(raw, &RegionConfig::new("x"), &FamilyConfig::sentinel2());
    assert!(matches!(result, Err(ImageryError::NotFound(_))));

    // A product without its classification layer is incomplete too
    let mut raw = sentinel_raw();
    raw.bands.remove("scene_clf").unwrap();
    let result = SatelliteImage::from_raw(raw, &RegionConfig::new("x"), &FamilyConfig::sentinel2());
    assert!(matches!(result, Err(ImageryError::NotFound(_))));

    let mut raw = polymer_raw();
    raw.bands.remove("swir_band").unwrap();
    let result = SatelliteImage::from_raw(raw, &RegionConfig::new("x"), &FamilyConfig::polymer());
    assert!(matches!(result, Err(ImageryError::NotFound(_))));

    let table = RegionTable::builtin().unwrap();
    assert!(matches!(table.get("atlantis"), Err(ImageryError::NotFound(_))));
}

#[test]
fn test_query_outside_product_is_out_of_bounds() {
    let region = RegionConfig::new("estuary")
        .with_polygon(polygon_around_cells((20.0, 40.0), (30.0, 50.0)));
    let image = SatelliteImage::from_raw(sentinel_raw(), &region, &FamilyConfig::sentinel2())
        .unwrap();

    let outside = utm_resolver().locate(PixelIndex::new(5.0, 5.0)).unwrap();
    assert!(matches!(
        image.pixel_for(outside),
        Err(ImageryError::OutOfBounds { .. })
    ));

    let (rows, cols) = image.image_shape();
    assert!(matches!(
        image.geo_for(rows, cols),
        Err(ImageryError::OutOfBounds { .. })
    ));
}

fn polymer_raw() -> RawProduct {
    let shape = (40, 50);
    let mut bands = BandSet::new();
    for name in ["blue_band", "green_band", "red_band", "nir_band", "swir_band"] {
        bands.insert(name, Array2::from_elem(shape, 0.05f32));
    }
    bands.insert(
        "lon",
        Array2::from_shape_fn(shape, |(_, c)| (-63.5 + 0.002 * c as f64) as f32),
    );
    bands.insert(
        "lat",
        Array2::from_shape_fn(shape, |(r, _)| (46.5 - 0.0015 * r as f64) as f32),
    );

    RawProduct {
        family: ProductFamily::Polymer,
        bands,
        date: "2021-08-02 15:09:21.024000".to_string(),
        extras: FamilyExtras::Netcdf,
    }
}

#[test]
fn test_polymer_grid_queries_follow_final_bands() {
    let raw = polymer_raw();
    let raw_lon = raw.bands.single("lon").unwrap().clone();
    let raw_lat = raw.bands.single("lat").unwrap().clone();

    let polygon = Polygon::new(vec![
        GeoPoint::new(raw_lon[[0, 10]] as f64, raw_lat[[30, 0]] as f64),
        GeoPoint::new(raw_lon[[0, 40]] as f64, raw_lat[[30, 0]] as f64),
        GeoPoint::new(raw_lon[[0, 40]] as f64, raw_lat[[8, 0]] as f64),
        GeoPoint::new(raw_lon[[0, 10]] as f64, raw_lat[[8, 0]] as f64),
    ])
    .unwrap();
    let region = RegionConfig::new("bay").with_rotation(-90.0).with_polygon(polygon);
    let image = SatelliteImage::from_raw(raw, &region, &FamilyConfig::polymer()).unwrap();

    assert_eq!(image.atmospheric_correction(), "Polymer");
    assert_eq!(image.date(), "2021-08-02T15:09:21.024000");
    assert_eq!(image.key(), "bay_2021-08-02");
    assert!(image.crs().is_none());
    // 23 raw rows by 31 raw cols, turned a quarter
    assert_eq!(image.image_shape(), (31, 23));

    for (r0, c0) in [(10usize, 20usize), (30, 40), (8, 10), (19, 33)] {
        let target = GeoPoint::new(raw_lon[[r0, c0]] as f64, raw_lat[[r0, c0]] as f64);
        let (row, col) = image.pixel_for(target).unwrap();
        assert_eq!(image.single_band("lon").unwrap()[[row, col]], raw_lon[[r0, c0]]);
        assert_eq!(image.single_band("lat").unwrap()[[row, col]], raw_lat[[r0, c0]]);
        assert_eq!(image.geo_for(row, col).unwrap(), target);
    }

    let true_color = image.band("true_color_image").unwrap().as_stacked().unwrap();
    assert_eq!(true_color.dim(), (31, 23, 3));
    assert!(true_color.iter().all(|&v| v == 85.0));
}

#[test]
fn test_family_layout_must_match_product() {
    let result = SatelliteImage::from_raw(polymer_raw(), &RegionConfig::new("bay"), &FamilyConfig::sentinel2());
    assert!(matches!(result, Err(ImageryError::InvalidFormat(_))));
}
