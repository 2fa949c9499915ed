//! Command-line arguments.

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use reproject::{ReprojectConfig, ReprojectRequest};

pub const USAGE: &str = "\
Usage: wcstabproj [OPTION]... <infile> <outfile>

wcstabproj reorganises spatially TAB projected data into a 2-D/3-D FITS image.
Options:
  -a<alt>         Specify an alternate coordinate representation (ignored if
                  there is only one).  Can also be specified as a 0-relative
                  index in the range 0 to 26, where alternates are sequenced
                  alphabetically following the primary representation.
  -h<header_name> Specify the name of the text WCS header to be used for the
                  output image.
  -r<resolution>  Specify the resolution of the output image (deg/px).
  -n1<pixelnumber_x> Specify the x dimension of the output image.
  -n2<pixelnumber_y> Specify the y dimension of the output image.
  --config <file> YAML configuration file.
  --log-level <level>
                  One of trace, debug, info, warn, error.
  --list          Print the input pixel coordinates of every output sample.
  --parallel      Resample output rows in parallel.
  --help          Print this text.
";

#[derive(Parser, Debug)]
#[command(name = "wcstabproj")]
#[command(about = "Reorganise TAB projected data into a regular FITS image")]
#[command(disable_help_flag = true)]
pub struct Args {
    /// Alternate coordinate representation (letter, blank or 0-relative index)
    #[arg(short = 'a', allow_hyphen_values = true)]
    pub alt: Option<String>,

    /// Text WCS header describing the output image
    #[arg(short = 'h')]
    pub header: Option<PathBuf>,

    /// Output resolution in degrees per pixel
    #[arg(short = 'r')]
    pub resolution: Option<f64>,

    /// Output dimension: `-n1<N>` or `-n2<N>`
    #[arg(short = 'n', action = ArgAction::Append)]
    pub dimension: Vec<String>,

    /// Configuration file path
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level
    #[arg(long)]
    pub log_level: Option<String>,

    /// Print mapped input coordinates
    #[arg(long)]
    pub list: bool,

    /// Resample rows in parallel
    #[arg(long)]
    pub parallel: bool,

    #[arg(long, action = ArgAction::SetTrue)]
    pub help: bool,

    pub infile: Option<PathBuf>,

    pub outfile: Option<String>,
}

impl Args {
    /// Parse `-n1<N>` / `-n2<N>` values; `None` on a malformed value.
    pub fn dimensions(&self) -> Option<[Option<usize>; 2]> {
        let mut dims = [None, None];
        for value in &self.dimension {
            let (axis, n) = value.split_at(value.len().min(1));
            let slot = match axis {
                "1" => 0,
                "2" => 1,
                _ => return None,
            };
            dims[slot] = Some(n.parse().ok()?);
        }
        Some(dims)
    }

    /// The reprojection job, `None` when a positional argument is missing or
    /// a dimension is malformed.
    pub fn request(&self) -> Option<ReprojectRequest> {
        Some(ReprojectRequest {
            input: self.infile.clone()?,
            output: self.outfile.clone()?,
            selector: self.alt.clone().unwrap_or_default(),
            header_file: self.header.clone(),
            resolution: self.resolution,
            dimensions: self.dimensions()?,
        })
    }

    /// Command-line flags override the loaded configuration.
    pub fn apply(&self, config: &mut ReprojectConfig) {
        if let Some(level) = &self.log_level {
            config.log_level = level.to_lowercase();
        }
        config.list_coordinates |= self.list;
        config.parallel |= self.parallel;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("wcstabproj").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_attached_short_values() {
        let args = parse(&["-aB", "-hout.hdr", "-r0.25", "-n1200", "-n2100", "in.fits", "out.fits"]);
        assert_eq!(args.alt.as_deref(), Some("B"));
        assert_eq!(args.header, Some(PathBuf::from("out.hdr")));
        assert_eq!(args.resolution, Some(0.25));
        assert_eq!(args.dimensions(), Some([Some(200), Some(100)]));

        let request = args.request().unwrap();
        assert_eq!(request.input, PathBuf::from("in.fits"));
        assert_eq!(request.output, "out.fits");
        assert_eq!(request.selector, "B");
    }

    #[test]
    fn test_malformed_dimension() {
        assert_eq!(parse(&["-n3100", "a", "b"]).dimensions(), None);
        assert_eq!(parse(&["-n1x", "a", "b"]).dimensions(), None);
        assert!(parse(&["-n3100", "a", "b"]).request().is_none());
    }

    #[test]
    fn test_missing_outfile() {
        assert!(parse(&["in.fits"]).request().is_none());
    }

    #[test]
    fn test_unknown_flag_rejected() {
        assert!(Args::try_parse_from(["wcstabproj", "-x", "a", "b"]).is_err());
        assert!(Args::try_parse_from(["wcstabproj", "a", "b", "c"]).is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let args = parse(&["--list", "--log-level", "DEBUG", "a", "b"]);
        let mut config = ReprojectConfig::default();
        args.apply(&mut config);
        assert!(config.list_coordinates);
        assert!(!config.parallel);
        assert_eq!(config.log_level, "debug");
    }
}
