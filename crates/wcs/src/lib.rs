//! World coordinate systems for FITS images.
//!
//! Parses the WCS keyrecords of a header into [`CoordinateDescriptor`]s,
//! loads the lookup tables of `-TAB` axes from binary table extensions and
//! builds pixel <-> world transforms. Celestial projections and the sky
//! rotation come from `mapproj`; linear and lookup-table axes are evaluated
//! here.
//!
//! Supported axis types:
//! - Linear axes (CDELT/PC, CD or CROTA conventions)
//! - Celestial pairs: TAN, SIN, ARC, STG, ZEA, CAR, CEA, MER
//! - Lookup-table axes (`-TAB`) with 1-D or 2-D coordinate arrays

pub mod celestial;
pub mod descriptor;
pub mod error;
pub mod linear;
pub mod parse;
pub mod tab;
pub mod table_loader;
pub mod transform;

pub use descriptor::{AltKey, CoordinateDescriptor, ProjectionCode, ProjectionParam, StringParam};
pub use error::{TransformError, WcsError, WcsResult};
pub use parse::{parse_descriptors, ParsedDescriptors};
pub use tab::{LookupTable, TableSpec};
pub use table_loader::TableLoader;
pub use transform::{CoordinateTransform, WcsTransform};
