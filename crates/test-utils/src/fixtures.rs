//! FITS fixtures with `-TAB` coordinate systems.
//!
//! The standard fixture is a 10x10 single-precision image whose first axis
//! is a right ascension `-TAB` axis driven by a quadratic lookup table and
//! whose second axis is a plain linear declination:
//!
//! - RA(p1)  = 10 + p1^2 / 10 degrees (table element p1, identity index vector)
//! - DEC(p2) = -30 + 0.5 * (p2 - 1) degrees
//!
//! Pixel values follow [`crate::create_test_grid`].

use std::io::Write;
use std::path::{Path, PathBuf};

use fits_io::{Card, FitsWriter, Header, ImageData, TableColumn};

use crate::generators::{create_test_cube, create_test_grid, quadratic_table};

/// Image width (NAXIS1) of the standard fixture.
pub const TAB_WIDTH: usize = 10;

/// Image height (NAXIS2) of the standard fixture.
pub const TAB_HEIGHT: usize = 10;

/// EXTNAME of the lookup table extension.
pub const TAB_EXTNAME: &str = "WCS-TAB";

/// Constant part of the right ascension table.
pub const RA_OFFSET: f64 = 10.0;

/// Declination at pixel row 1.
pub const DEC_REFERENCE: f64 = -30.0;

/// Declination step per pixel row.
pub const DEC_SCALE: f64 = 0.5;

/// World coordinates of a 1-based pixel position in the standard fixture.
pub fn tab_world(p1: f64, p2: f64) -> (f64, f64) {
    (RA_OFFSET + p1 * p1 / 10.0, DEC_REFERENCE + DEC_SCALE * (p2 - 1.0))
}

/// Primary-header WCS keyrecords of the standard fixture.
///
/// `depth > 1` adds a unit-scale linear third axis.
pub fn tab_wcs_header(depth: usize) -> Header {
    let mut header = Header::new();
    header.push(Card::new("BUNIT", "Jy/beam"));
    header.push(Card::new("WCSNAME", "TAB test"));
    header.push(Card::new("CTYPE1", "RA---TAB"));
    header.push(Card::new("CTYPE2", "DEC"));
    header.push(Card::new("CUNIT1", "deg"));
    header.push(Card::new("CUNIT2", "deg"));
    header.push(Card::new("CRPIX1", 0.0));
    header.push(Card::new("CRPIX2", 1.0));
    header.push(Card::new("CRVAL1", 0.0));
    header.push(Card::new("CRVAL2", DEC_REFERENCE));
    header.push(Card::new("CDELT1", 1.0));
    header.push(Card::new("CDELT2", DEC_SCALE));
    header.push(Card::new("PS1_0", TAB_EXTNAME));
    header.push(Card::new("PS1_1", "COORDS"));
    header.push(Card::new("PS1_2", "INDEX"));
    header.push(Card::new("PV1_3", 1i64));
    if depth > 1 {
        header.push(Card::new("CTYPE3", "FREQ"));
        header.push(Card::new("CRPIX3", 1.0));
        header.push(Card::new("CRVAL3", 1.0));
        header.push(Card::new("CDELT3", 1.0));
    }
    header.push(Card::commentary("HISTORY", "synthetic -TAB fixture"));
    header
}

/// Write the standard fixture to `path` (2-D, or a cube when `depth > 1`).
pub fn write_tab_image(path: &Path, depth: usize) -> PathBuf {
    write_tab_image_with(path, &tab_wcs_header(depth), depth)
}

/// Like [`write_tab_image`] with a caller-supplied primary header.
pub fn write_tab_image_with(path: &Path, header: &Header, depth: usize) -> PathBuf {
    let (axes, data) = if depth > 1 {
        (
            vec![TAB_WIDTH, TAB_HEIGHT, depth],
            create_test_cube(TAB_WIDTH, TAB_HEIGHT, depth),
        )
    } else {
        (vec![TAB_WIDTH, TAB_HEIGHT], create_test_grid(TAB_WIDTH, TAB_HEIGHT))
    };

    let mut writer = FitsWriter::create(path.to_string_lossy()).expect("create fixture file");
    writer
        .write_image(header, &axes, &ImageData::F32(data))
        .expect("write fixture image");

    let mut extra = Header::new();
    extra.push(Card::new("EXTNAME", TAB_EXTNAME));
    let index: Vec<f64> = (1..=TAB_WIDTH).map(|k| k as f64).collect();
    writer
        .write_bintable(
            &extra,
            &[
                TableColumn::new("COORDS", quadratic_table(TAB_WIDTH, RA_OFFSET))
                    .with_dims(vec![1, TAB_WIDTH]),
                TableColumn::new("INDEX", index),
            ],
        )
        .expect("write fixture table");
    writer.close().expect("close fixture file");
    path.to_path_buf()
}

/// Write keyrecords as a text header file, one record per line.
pub fn write_header_file(path: &Path, cards: &[Card]) -> PathBuf {
    let mut file = std::fs::File::create(path).expect("create header file");
    for card in cards {
        writeln!(file, "{}", card.to_record().trim_end()).expect("write header line");
    }
    path.to_path_buf()
}

/// Output WCS keyrecords for a plate carree grid covering part of the
/// standard fixture: `n1 x n2` pixels of `scale` degrees, reference pixel
/// at the grid centre.
pub fn car_output_cards(crval: (f64, f64), scale: f64, crpix: (f64, f64)) -> Vec<Card> {
    vec![
        Card::new("WCSNAME", "Regridded"),
        Card::new("CTYPE1", "RA---CAR"),
        Card::new("CTYPE2", "DEC--CAR"),
        Card::new("CRPIX1", crpix.0),
        Card::new("CRPIX2", crpix.1),
        Card::new("CRVAL1", crval.0),
        Card::new("CRVAL2", crval.1),
        Card::new("CDELT1", scale),
        Card::new("CDELT2", scale),
    ]
}

/// Output WCS keyrecords for a linear grid: world = crval + scale * (p - crpix)
/// on both axes, matching the fixture's world coordinates directly.
pub fn linear_output_cards(crval: (f64, f64), scale: (f64, f64), crpix: (f64, f64)) -> Vec<Card> {
    vec![
        Card::new("WCSNAME", "Linear grid"),
        Card::new("CTYPE1", "RA"),
        Card::new("CTYPE2", "DEC"),
        Card::new("CRPIX1", crpix.0),
        Card::new("CRPIX2", crpix.1),
        Card::new("CRVAL1", crval.0),
        Card::new("CRVAL2", crval.1),
        Card::new("CDELT1", scale.0),
        Card::new("CDELT2", scale.1),
    ]
}
