//! End-to-end reprojection of one FITS image.

use std::io::Write;
use std::path::{Path, PathBuf};

use fits_io::{Card, FitsFile, FitsWriter, Header, ImageData};
use tracing::{debug, info, warn};
use wcs::{parse_descriptors, CoordinateDescriptor, TableLoader, WcsError, WcsTransform};

use crate::config::ReprojectConfig;
use crate::emit::{replay, CoordinateListing, NearestSampler, ResultEmitter};
use crate::error::{ReprojectError, Result};
use crate::footprint::compute_footprint;
use crate::geometry::{resolve_geometry, GeometryRequest, ResolvedGeometry};
use crate::resample::Resampler;
use crate::selector::{select_descriptor, Selector};

/// Input keywords carried over to the output image.
const COPIED_KEYWORDS: [&str; 3] = ["BUNIT", "BSCALE", "BZERO"];

/// One reprojection job.
#[derive(Debug, Clone, Default)]
pub struct ReprojectRequest {
    pub input: PathBuf,
    /// Output file name; a leading `!` allows overwriting.
    pub output: String,
    /// `-a` value: empty, a 0-relative index, a letter or a blank.
    pub selector: String,
    /// Text header holding the output WCS.
    pub header_file: Option<PathBuf>,
    /// Degrees per output pixel.
    pub resolution: Option<f64>,
    /// Explicit NAXIS1 and NAXIS2.
    pub dimensions: [Option<usize>; 2],
}

/// What a completed run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ReprojectSummary {
    /// WCSNAME of the selected input descriptor.
    pub wcs_name: String,
    /// WCS keyrecords rejected while parsing the input header.
    pub rejected: usize,
    pub dimensions: Vec<usize>,
    /// Output samples whose transforms succeeded.
    pub mapped: usize,
    /// Output samples that received an input value.
    pub filled: usize,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The input header holds no coordinate systems; nothing was written.
    NoCoordinateSystems,
    Completed(ReprojectSummary),
}

/// Reproject `request.input` onto the output grid and write `request.output`.
///
/// Program output (rejected keyrecord count, WCSNAME, the optional
/// coordinate listing) goes to `out`.
pub fn run<W: Write>(request: &ReprojectRequest, config: &ReprojectConfig, out: &mut W) -> Result<Outcome> {
    info!(input = %request.input.display(), "opening input image");
    let mut file = FitsFile::open(&request.input)?;
    let primary = file.primary()?;
    let image_info = primary.image_info()?;
    if image_info.axes.len() < 2 {
        return Err(ReprojectError::unsupported_image(format!(
            "{} has {} axes, at least 2 are needed",
            request.input.display(),
            image_info.axes.len()
        )));
    }

    let parsed = match parse_descriptors(&primary.header, image_info.axes.len()) {
        Ok(parsed) => parsed,
        Err(WcsError::NoDescriptorsFound) => {
            writeln!(out, "No world coordinate systems found.")?;
            return Ok(Outcome::NoCoordinateSystems);
        }
        Err(err) => return Err(err.into()),
    };
    if parsed.rejected > 0 {
        warn!(rejected = parsed.rejected, "rejected WCS keyrecords");
        writeln!(out, "\n{} WCS keyrecords were rejected.", parsed.rejected)?;
    }

    let selector = Selector::parse(&request.selector)?;
    let index = select_descriptor(&parsed.descriptors, selector)?;
    let mut input_descriptor = parsed.descriptors[index].clone();
    debug!(index, alt = %input_descriptor.alt, "selected input descriptor");

    file.load_tables(&mut input_descriptor)?;
    writeln!(out, "{}", input_descriptor.name)?;

    let output_descriptor = request
        .header_file
        .as_deref()
        .map(read_output_descriptor)
        .transpose()?;

    let input_transform = WcsTransform::new(&input_descriptor)?;
    let footprint = match compute_footprint(&input_transform, &image_info.axes) {
        Ok(footprint) => Some(footprint),
        Err(err) => {
            warn!(error = %err, "continuing without a footprint");
            None
        }
    };

    let geometry = resolve_geometry(
        GeometryRequest {
            output_descriptor,
            resolution: request.resolution,
            dimensions: request.dimensions,
        },
        &input_descriptor,
        &image_info,
        footprint.as_ref(),
    )?;
    let output_transform = WcsTransform::new(&geometry.descriptor)?;

    let mappings = Resampler::new(&output_transform, &input_transform, &input_descriptor.reference_value)
        .run(&geometry.grid, config.parallel);

    let data = primary.read_image(&mut file)?;
    let blank = primary.header.get_i64("BLANK");
    let mut sampler = NearestSampler::new(&data, &image_info.axes, &geometry.grid, blank)?;
    if config.list_coordinates {
        let mut listing = CoordinateListing::new(&mut *out);
        let emitters: &mut [&mut dyn ResultEmitter] = &mut [&mut sampler, &mut listing];
        replay(&mappings, &geometry.grid, emitters)?;
    } else {
        let emitters: &mut [&mut dyn ResultEmitter] = &mut [&mut sampler];
        replay(&mappings, &geometry.grid, emitters)?;
    }
    let filled = sampler.filled();
    let image = sampler.into_data();

    write_output(request, &primary.header, &geometry, &image, blank)?;

    let summary = ReprojectSummary {
        wcs_name: input_descriptor.name.clone(),
        rejected: parsed.rejected,
        dimensions: geometry.grid.dimensions.clone(),
        mapped: mappings.valid_count(),
        filled,
    };
    info!(
        output = %request.output,
        dimensions = ?summary.dimensions,
        mapped = summary.mapped,
        filled = summary.filled,
        "reprojection complete"
    );
    Ok(Outcome::Completed(summary))
}

/// First coordinate descriptor of a text header file.
pub fn read_output_descriptor(path: &Path) -> Result<CoordinateDescriptor> {
    let text = std::fs::read_to_string(path).map_err(|source| ReprojectError::HeaderFile {
        path: path.to_path_buf(),
        source,
    })?;
    let header = Header::from_text(&text)?;
    let parsed = parse_descriptors(&header, 0)?;
    if parsed.rejected > 0 {
        warn!(path = %path.display(), rejected = parsed.rejected, "rejected WCS keyrecords in output header");
    }
    parsed
        .descriptors
        .into_iter()
        .next()
        .ok_or(ReprojectError::Wcs(WcsError::NoDescriptorsFound))
}

fn write_output(
    request: &ReprojectRequest,
    input_header: &Header,
    geometry: &ResolvedGeometry,
    image: &ImageData,
    blank: Option<i64>,
) -> Result<()> {
    let mut extra = Header::new();
    for keyword in COPIED_KEYWORDS {
        if let Some(card) = input_header.cards().iter().find(|c| c.keyword == keyword) {
            extra.push(card.clone());
        }
    }
    let pixel_type = image.pixel_type();
    if !pixel_type.is_float() {
        if let Some(blank) = blank.or(pixel_type.default_blank()) {
            extra.push(Card::new("BLANK", blank));
        }
    }
    extra.merge(&geometry.descriptor.to_header());
    extra.push(Card::commentary(
        "HISTORY",
        format!("Reprojected from {}", request.input.display()),
    ));

    let mut writer = FitsWriter::create(&request.output)?;
    writer.write_image(&extra, &geometry.grid.dimensions, image)?;
    writer.close()?;
    Ok(())
}
