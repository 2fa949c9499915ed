//! Reprojection of images with lookup-table (`-TAB`) coordinates onto
//! regular output grids.
//!
//! The flow runs strictly downstream:
//!
//! 1. [`selector`] picks the input coordinate descriptor
//! 2. [`footprint`] projects the image corners to world coordinates
//! 3. [`geometry`] resolves the output descriptor and grid dimensions
//! 4. [`resample`] maps every output sample back to an input pixel
//! 5. [`emit`] turns the mappings into output samples or a listing
//!
//! [`pipeline::run`] wires these together with FITS input and output.

pub mod config;
pub mod emit;
pub mod error;
pub mod footprint;
pub mod geometry;
pub mod pipeline;
pub mod resample;
pub mod selector;
pub mod types;

pub use config::ReprojectConfig;
pub use emit::{format_g, replay, CoordinateListing, NearestSampler, ResultEmitter};
pub use error::{ReprojectError, Result};
pub use footprint::{compute_footprint, image_corners};
pub use geometry::{default_output_descriptor, resolve_geometry, GeometryRequest, ResolvedGeometry};
pub use pipeline::{read_output_descriptor, run, Outcome, ReprojectRequest, ReprojectSummary};
pub use resample::Resampler;
pub use selector::{select_descriptor, AltIndex, Selector};
pub use types::{Footprint, MappingGrid, OutputGrid, SampleMapping};
