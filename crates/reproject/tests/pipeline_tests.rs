//! End-to-end reprojection of synthetic -TAB images.

use std::path::{Path, PathBuf};

use fits_io::{Card, FitsFile, FitsWriter, Header, ImageData};
use reproject::{
    compute_footprint, run, Outcome, ReprojectConfig, ReprojectError, ReprojectRequest, Resampler,
};
use tempfile::TempDir;
use test_utils::{
    assert_approx_eq, car_output_cards, linear_output_cards, tab_wcs_header, write_header_file, write_tab_image,
    write_tab_image_with, TAB_HEIGHT, TAB_WIDTH,
};
use wcs::{parse_descriptors, CoordinateTransform, TableLoader, WcsTransform};

/// Output grid matching the fixture's world coordinates: 15 columns of
/// 1 degree centred on RA 15, 10 rows of 0.5 degree covering the input.
fn write_linear_header(dir: &Path) -> PathBuf {
    write_header_file(
        &dir.join("linear.hdr"),
        &linear_output_cards((15.0, -27.75), (1.0, 0.5), (8.0, 5.5)),
    )
}

fn request(dir: &Path, input: PathBuf, header: Option<PathBuf>) -> ReprojectRequest {
    ReprojectRequest {
        input,
        output: dir.join("out.fits").to_string_lossy().into_owned(),
        header_file: header,
        ..Default::default()
    }
}

fn read_f32(path: &str) -> (Header, Vec<usize>, Vec<f32>) {
    let mut file = FitsFile::open(path).unwrap();
    let primary = file.primary().unwrap();
    let axes = primary.image_info().unwrap().axes;
    match primary.read_image(&mut file).unwrap() {
        ImageData::F32(v) => (primary.header.clone(), axes, v),
        other => panic!("unexpected pixel type {:?}", other.pixel_type()),
    }
}

fn input_transform(path: &Path) -> WcsTransform {
    let mut file = FitsFile::open(path).unwrap();
    let primary = file.primary().unwrap();
    let naxis = primary.image_info().unwrap().axes.len();
    let mut descriptor = parse_descriptors(&primary.header, naxis).unwrap().descriptors.remove(0);
    file.load_tables(&mut descriptor).unwrap();
    WcsTransform::new(&descriptor).unwrap()
}

#[test]
fn test_explicit_output_header() {
    let dir = TempDir::new().unwrap();
    let input = write_tab_image(&dir.path().join("tab.fits"), 1);
    let header = write_linear_header(dir.path());
    let req = request(dir.path(), input, Some(header));

    let config = ReprojectConfig {
        list_coordinates: true,
        ..Default::default()
    };
    let mut out = Vec::new();
    let outcome = run(&req, &config, &mut out).unwrap();

    let Outcome::Completed(summary) = outcome else {
        panic!("expected a completed run");
    };
    assert_eq!(summary.wcs_name, "TAB test");
    assert_eq!(summary.dimensions, vec![15, 10]);
    // Columns 3..=13 (RA 10..20) lie within the table's half-cell margin.
    assert_eq!(summary.mapped, 11 * 10);
    assert_eq!(summary.filled, 11 * 10);

    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("TAB test\n"));
    assert_eq!(text.matches("Input: ").count(), 110);

    let (header, axes, data) = read_f32(&req.output);
    assert_eq!(axes, vec![15, 10]);
    assert_eq!(header.get_str("CTYPE1"), Some("RA"));
    assert_eq!(header.get_str("BUNIT"), Some("Jy/beam"));
    assert_eq!(header.get_f64("CRVAL1"), Some(15.0));

    for j in 0..10 {
        for i in 0..15 {
            let value = data[j * 15 + i];
            let column = i + 1;
            if (3..=13).contains(&column) {
                assert!(!value.is_nan(), "column {} row {} should be filled", column, j + 1);
            } else {
                assert!(value.is_nan(), "column {} row {} should be blank", column, j + 1);
            }
        }
        // RA 10 lies before the first table node: nearest input column 1.
        assert_eq!(data[j * 15 + 2], j as f32);
        // RA 20 is the last table node: input column 10.
        assert_eq!(data[j * 15 + 12], (9000 + j) as f32);
        // RA 16.4 would be node 8; RA 16 falls between nodes 7 and 8, nearer 8.
        assert_eq!(data[j * 15 + 8], (7000 + j) as f32);
    }
}

#[test]
fn test_plate_carree_output() {
    let dir = TempDir::new().unwrap();
    let input = write_tab_image(&dir.path().join("tab.fits"), 1);
    // Equatorial reference point; rows 1..=10 cover DEC -30..-25.5.
    let header = write_header_file(
        &dir.path().join("car.hdr"),
        &car_output_cards((15.0, 0.0), 0.5, (11.0, 61.0)),
    );
    let req = request(dir.path(), input, Some(header));

    let outcome = run(&req, &ReprojectConfig::default(), &mut Vec::new()).unwrap();
    let Outcome::Completed(summary) = outcome else {
        panic!("expected a completed run");
    };
    assert_eq!(summary.dimensions, vec![21, 121]);
    assert_eq!(summary.filled, 21 * 10);

    let (header, _, data) = read_f32(&req.output);
    assert_eq!(header.get_str("CTYPE1"), Some("RA---CAR"));
    // Column 1 is RA 10, column 21 is RA 20.
    assert_eq!(data[0], 0.0);
    assert_eq!(data[20], 9000.0);
    assert!(data[21 * 10].is_nan());
}

#[test]
fn test_mappings_are_distinct_and_bounded() {
    let dir = TempDir::new().unwrap();
    let input = write_tab_image(&dir.path().join("tab.fits"), 1);
    let header = write_linear_header(dir.path());

    let input_t = input_transform(&input);
    let output_descriptor = reproject::read_output_descriptor(&header).unwrap();
    let output_t = WcsTransform::new(&output_descriptor).unwrap();
    let grid = reproject::OutputGrid {
        dimensions: vec![15, 10],
        pixel_type: fits_io::PixelType::F32,
    };
    let reference = [0.0, -30.0];
    let mappings = Resampler::new(&output_t, &input_t, &reference).run(&grid, false);

    let mut world = [0.0; 2];
    let mut back = [0.0; 2];
    for j in 0..grid.height() {
        let mut row: Vec<f64> = Vec::new();
        for i in 0..grid.width() {
            let Some(pixel) = mappings.get(grid.index(i, j, 0)) else {
                continue;
            };
            assert!(pixel[0] >= 0.5 && pixel[0] <= TAB_WIDTH as f64 + 0.5);
            assert!(pixel[1] >= 0.5 && pixel[1] <= TAB_HEIGHT as f64 + 0.5);
            assert_approx_eq!(pixel[1], (j + 1) as f64, 1e-9);

            // Forward then inverse returns the same input pixel.
            input_t.pixel_to_world(pixel, &mut world).unwrap();
            input_t.world_to_pixel(&world, &mut back).unwrap();
            assert_approx_eq!(back[0], pixel[0], 1e-6);
            assert_approx_eq!(back[1], pixel[1], 1e-6);

            row.push(pixel[0]);
        }
        assert_eq!(row.len(), 11);
        assert!(row.windows(2).all(|w| w[1] > w[0]), "row {} not increasing: {:?}", j, row);
    }
}

#[test]
fn test_parallel_output_matches_serial() {
    let dir = TempDir::new().unwrap();
    let input = write_tab_image(&dir.path().join("tab.fits"), 1);
    let header = write_linear_header(dir.path());

    let serial = request(dir.path(), input.clone(), Some(header.clone()));
    run(&serial, &ReprojectConfig::default(), &mut Vec::new()).unwrap();

    let mut parallel = request(dir.path(), input, Some(header));
    parallel.output = dir.path().join("par.fits").to_string_lossy().into_owned();
    let config = ReprojectConfig {
        parallel: true,
        ..Default::default()
    };
    run(&parallel, &config, &mut Vec::new()).unwrap();

    let (_, _, a) = read_f32(&serial.output);
    let (_, _, b) = read_f32(&parallel.output);
    assert_eq!(a.len(), b.len());
    assert!(a.iter().zip(&b).all(|(x, y)| x == y || (x.is_nan() && y.is_nan())));
}

#[test]
fn test_cube_depth_carry_through() {
    let dir = TempDir::new().unwrap();
    let input = write_tab_image(&dir.path().join("cube.fits"), 3);
    let header = write_linear_header(dir.path());
    let req = request(dir.path(), input, Some(header));

    let outcome = run(&req, &ReprojectConfig::default(), &mut Vec::new()).unwrap();
    let Outcome::Completed(summary) = outcome else {
        panic!("expected a completed run");
    };
    assert_eq!(summary.dimensions, vec![15, 10, 3]);

    let (_, axes, data) = read_f32(&req.output);
    assert_eq!(axes, vec![15, 10, 3]);
    let plane = 15 * 10;
    for z in 0..3 {
        // Output column 13, row 1 maps to input column 10 of plane z.
        assert_eq!(data[z * plane + 12], (9000 + z * 100_000) as f32);
        assert!(data[z * plane].is_nan());
    }
}

#[test]
fn test_footprint_of_fixture() {
    let dir = TempDir::new().unwrap();
    let input = write_tab_image(&dir.path().join("tab.fits"), 1);
    let fp = compute_footprint(&input_transform(&input), &[TAB_WIDTH, TAB_HEIGHT]).unwrap();
    assert_approx_eq!(fp.lon_min, 10.1, 1e-9);
    assert_approx_eq!(fp.lon_max, 20.0, 1e-9);
    assert_approx_eq!(fp.lat_min, -30.0, 1e-9);
    assert_approx_eq!(fp.lat_max, -25.5, 1e-9);
}

#[test]
fn test_default_geometry_from_resolution() {
    let dir = TempDir::new().unwrap();
    let input = write_tab_image(&dir.path().join("tab.fits"), 1);
    let mut req = request(dir.path(), input, None);
    req.resolution = Some(0.5);

    let outcome = run(&req, &ReprojectConfig::default(), &mut Vec::new()).unwrap();
    let Outcome::Completed(summary) = outcome else {
        panic!("expected a completed run");
    };
    // Footprint spans 9.9 x 4.5 degrees.
    assert_eq!(summary.dimensions, vec![19, 9]);

    let (header, _, _) = read_f32(&req.output);
    assert_eq!(header.get_str("CTYPE1"), Some("RA---CAR"));
    assert_eq!(header.get_str("CTYPE2"), Some("DEC--CAR"));
    assert_eq!(header.get_f64("CDELT1"), Some(0.5));
    assert_eq!(header.get_f64("CRPIX1"), Some(10.0));
    assert_eq!(header.get_f64("CRPIX2"), Some(5.0));
}

#[test]
fn test_geometry_underspecified_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let input = write_tab_image(&dir.path().join("tab.fits"), 1);
    let req = request(dir.path(), input, None);

    let err = run(&req, &ReprojectConfig::default(), &mut Vec::new()).unwrap_err();
    assert!(matches!(err, ReprojectError::GeometryUnderspecified(_)));
    assert!(!Path::new(&req.output).exists());
}

#[test]
fn test_no_coordinate_systems() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("plain.fits");
    let mut writer = FitsWriter::create(path.to_string_lossy()).unwrap();
    let mut extra = Header::new();
    extra.push(Card::new("BUNIT", "K"));
    writer
        .write_image(&extra, &[4, 4], &ImageData::F32(vec![1.0; 16]))
        .unwrap();
    writer.close().unwrap();

    let req = request(dir.path(), path, None);
    let mut out = Vec::new();
    let outcome = run(&req, &ReprojectConfig::default(), &mut out).unwrap();
    assert_eq!(outcome, Outcome::NoCoordinateSystems);
    assert_eq!(String::from_utf8(out).unwrap(), "No world coordinate systems found.\n");
    assert!(!Path::new(&req.output).exists());
}

fn write_two_alternates(dir: &Path) -> PathBuf {
    // Standard fixture plus a linear alternate 'A'.
    let mut header = tab_wcs_header(1);
    header.push(Card::new("CTYPE1A", "PIXEL"));
    header.push(Card::new("CTYPE2A", "PIXEL"));
    header.push(Card::new("CRPIX1A", 1.0));
    header.push(Card::new("CRPIX2A", 1.0));
    write_tab_image_with(&dir.join("alt.fits"), &header, 1)
}

#[test]
fn test_selector_failures() {
    let dir = TempDir::new().unwrap();
    let input = write_two_alternates(dir.path());
    let header = write_linear_header(dir.path());

    for selector in ["3", "2", "B", "AB"] {
        let mut req = request(dir.path(), input.clone(), Some(header.clone()));
        req.selector = selector.to_string();
        let err = run(&req, &ReprojectConfig::default(), &mut Vec::new()).unwrap_err();
        assert!(
            matches!(err, ReprojectError::InvalidSelector(_)),
            "selector {:?} gave {:?}",
            selector,
            err
        );
        assert!(!Path::new(&req.output).exists());
    }

    // Alternate A is linear and selectable by letter or index.
    for selector in ["a", "1"] {
        let mut req = request(dir.path(), input.clone(), Some(header.clone()));
        req.selector = selector.to_string();
        req.output = format!("!{}", req.output);
        let outcome = run(&req, &ReprojectConfig::default(), &mut Vec::new()).unwrap();
        assert!(matches!(outcome, Outcome::Completed(_)));
    }
}

#[test]
fn test_missing_header_file() {
    let dir = TempDir::new().unwrap();
    let input = write_tab_image(&dir.path().join("tab.fits"), 1);
    let req = request(dir.path(), input, Some(dir.path().join("missing.hdr")));

    let mut out = Vec::new();
    let err = run(&req, &ReprojectConfig::default(), &mut out).unwrap_err();
    assert!(matches!(err, ReprojectError::HeaderFile { .. }));
    // WCSNAME is printed before the header file is read.
    assert_eq!(String::from_utf8(out).unwrap(), "TAB test\n");
    assert!(!Path::new(&req.output).exists());
}

#[test]
fn test_existing_output_needs_clobber_prefix() {
    let dir = TempDir::new().unwrap();
    let input = write_tab_image(&dir.path().join("tab.fits"), 1);
    let header = write_linear_header(dir.path());
    let req = request(dir.path(), input, Some(header));
    std::fs::write(&req.output, b"occupied").unwrap();

    let err = run(&req, &ReprojectConfig::default(), &mut Vec::new()).unwrap_err();
    assert!(err.container_error().is_some());
    assert_eq!(std::fs::read(&req.output).unwrap(), b"occupied");

    let mut clobber = req.clone();
    clobber.output = format!("!{}", req.output);
    run(&clobber, &ReprojectConfig::default(), &mut Vec::new()).unwrap();
    let (_, axes, _) = read_f32(&req.output);
    assert_eq!(axes, vec![15, 10]);
}
