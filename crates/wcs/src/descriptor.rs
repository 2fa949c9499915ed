//! Coordinate descriptors: one world coordinate representation of an image.
//!
//! A header may carry a primary representation plus up to 26 alternates
//! (keyword suffix `A`..`Z`). Each is described by reference pixel and
//! value, scale, a linear transformation matrix, axis types and projection
//! parameters, following FITS WCS Papers I-III.

use std::fmt;

use fits_io::{Card, Header};

use crate::error::{WcsError, WcsResult};
use crate::tab::LookupTable;

/// Alternate-representation key.
///
/// Ordered primary first, then alphabetically, which is also the order
/// descriptors are returned by the header parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AltKey {
    Primary,
    Letter(char),
}

impl AltKey {
    /// Key for a keyword suffix character: blank for primary, `A`..`Z`.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            ' ' => Some(Self::Primary),
            'A'..='Z' => Some(Self::Letter(c)),
            'a'..='z' => Some(Self::Letter(c.to_ascii_uppercase())),
            _ => None,
        }
    }

    /// Keyword suffix: empty for primary, the letter otherwise.
    pub fn suffix(&self) -> String {
        match self {
            Self::Primary => String::new(),
            Self::Letter(c) => c.to_string(),
        }
    }
}

impl fmt::Display for AltKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, " "),
            Self::Letter(c) => write!(f, "{}", c),
        }
    }
}

/// Algorithm code of an axis, taken from CTYPE (`xxxx-PPP`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectionCode {
    /// No algorithm code: world = CRVAL + intermediate coordinate.
    Linear,
    /// Coordinate lookup table (Paper III).
    Tab,
    /// Gnomonic.
    Tan,
    /// Orthographic/synthesis.
    Sin,
    /// Zenithal equidistant.
    Arc,
    /// Stereographic.
    Stg,
    /// Zenithal equal area.
    Zea,
    /// Plate carree.
    Car,
    /// Cylindrical equal area.
    Cea,
    /// Mercator.
    Mer,
}

impl ProjectionCode {
    /// Parse a three-letter algorithm code.
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "TAB" => Some(Self::Tab),
            "TAN" => Some(Self::Tan),
            "SIN" => Some(Self::Sin),
            "ARC" => Some(Self::Arc),
            "STG" => Some(Self::Stg),
            "ZEA" => Some(Self::Zea),
            "CAR" => Some(Self::Car),
            "CEA" => Some(Self::Cea),
            "MER" => Some(Self::Mer),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linear => "",
            Self::Tab => "TAB",
            Self::Tan => "TAN",
            Self::Sin => "SIN",
            Self::Arc => "ARC",
            Self::Stg => "STG",
            Self::Zea => "ZEA",
            Self::Car => "CAR",
            Self::Cea => "CEA",
            Self::Mer => "MER",
        }
    }

    /// True for the spherical projections.
    pub fn is_celestial(&self) -> bool {
        !matches!(self, Self::Linear | Self::Tab)
    }

    /// True for projections whose fiducial point is the native pole.
    pub fn is_zenithal(&self) -> bool {
        matches!(self, Self::Tan | Self::Sin | Self::Arc | Self::Stg | Self::Zea)
    }
}

/// Coordinate-type part of a CTYPE value (`RA`, `DEC`, `GLON`, `WAVE`, ...).
pub fn coordinate_type(ctype: &str) -> &str {
    match ctype.as_bytes().get(4) {
        Some(b'-') => ctype[..4].trim_end_matches('-'),
        _ => ctype.trim(),
    }
}

/// Algorithm code part of a CTYPE value, if any.
pub fn algorithm_code(ctype: &str) -> Option<&str> {
    if ctype.len() >= 8 && ctype.as_bytes()[4] == b'-' {
        let code = ctype[5..8].trim_end_matches('-');
        (!code.is_empty()).then_some(code)
    } else {
        None
    }
}

/// Celestial longitude axis types: RA, xLON, xyLN.
pub fn is_longitude(ctype: &str) -> bool {
    let t = coordinate_type(ctype);
    t == "RA" || (t.len() == 4 && (t.ends_with("LON") || t.ends_with("LN")))
}

/// Celestial latitude axis types: DEC, xLAT, xyLT.
pub fn is_latitude(ctype: &str) -> bool {
    let t = coordinate_type(ctype);
    t == "DEC" || (t.len() == 4 && (t.ends_with("LAT") || t.ends_with("LT")))
}

/// Numeric projection parameter PVi_m (axis is 1-based).
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionParam {
    pub axis: usize,
    pub index: usize,
    pub value: f64,
}

/// String projection parameter PSi_m (axis is 1-based).
#[derive(Debug, Clone, PartialEq)]
pub struct StringParam {
    pub axis: usize,
    pub index: usize,
    pub value: String,
}

/// One world coordinate representation.
///
/// Arrays are indexed by 0-based axis number. `pc` is row-major:
/// `pc[i * n + j]` is PC(i+1)_(j+1). CDi_j matrices are folded into `pc`
/// with unit `scale` at parse time.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateDescriptor {
    pub alt: AltKey,
    /// WCSNAMEa, empty when absent.
    pub name: String,
    pub ctype: Vec<String>,
    pub cunit: Vec<String>,
    pub reference_pixel: Vec<f64>,
    pub reference_value: Vec<f64>,
    pub scale: Vec<f64>,
    pub pc: Vec<f64>,
    pub lonpole: Option<f64>,
    pub latpole: Option<f64>,
    pub pv: Vec<ProjectionParam>,
    pub ps: Vec<StringParam>,
    /// Coordinate lookup tables, filled in by a [`crate::TableLoader`].
    pub tables: Vec<LookupTable>,
}

impl CoordinateDescriptor {
    /// A linear descriptor with default values: reference pixel and value
    /// 0, unit scale, identity matrix.
    pub fn new(alt: AltKey, axis_count: usize) -> Self {
        let mut pc = vec![0.0; axis_count * axis_count];
        for i in 0..axis_count {
            pc[i * axis_count + i] = 1.0;
        }
        Self {
            alt,
            name: String::new(),
            ctype: vec![String::new(); axis_count],
            cunit: vec![String::new(); axis_count],
            reference_pixel: vec![0.0; axis_count],
            reference_value: vec![0.0; axis_count],
            scale: vec![1.0; axis_count],
            pc,
            lonpole: None,
            latpole: None,
            pv: Vec::new(),
            ps: Vec::new(),
            tables: Vec::new(),
        }
    }

    pub fn axis_count(&self) -> usize {
        self.ctype.len()
    }

    /// Matrix element PC(i+1)_(j+1).
    pub fn pc_at(&self, i: usize, j: usize) -> f64 {
        self.pc[i * self.axis_count() + j]
    }

    /// PVi_m for 1-based axis `axis`.
    pub fn pv(&self, axis: usize, index: usize) -> Option<f64> {
        self.pv
            .iter()
            .rev()
            .find(|p| p.axis == axis && p.index == index)
            .map(|p| p.value)
    }

    /// PSi_m for 1-based axis `axis`.
    pub fn ps(&self, axis: usize, index: usize) -> Option<&str> {
        self.ps
            .iter()
            .rev()
            .find(|p| p.axis == axis && p.index == index)
            .map(|p| p.value.as_str())
    }

    /// Algorithm code of 0-based axis `axis`.
    pub fn axis_code(&self, axis: usize) -> WcsResult<ProjectionCode> {
        let ctype = &self.ctype[axis];
        match algorithm_code(ctype) {
            None => Ok(ProjectionCode::Linear),
            Some(code) => {
                ProjectionCode::parse(code).ok_or_else(|| WcsError::UnsupportedProjection {
                    axis: axis + 1,
                    code: code.to_string(),
                })
            }
        }
    }

    /// 0-based indices of the first longitude and latitude axes.
    pub fn celestial_axes(&self) -> Option<(usize, usize)> {
        let lon = self.ctype.iter().position(|c| is_longitude(c))?;
        let lat = self.ctype.iter().position(|c| is_latitude(c))?;
        Some((lon, lat))
    }

    /// 0-based indices of the -TAB axes.
    pub fn tab_axes(&self) -> Vec<usize> {
        (0..self.axis_count())
            .filter(|&i| matches!(self.axis_code(i), Ok(ProjectionCode::Tab)))
            .collect()
    }

    /// Render as primary WCS keyrecords.
    pub fn to_header(&self) -> Header {
        let n = self.axis_count();
        let mut header = Header::new();
        header.push(Card::new("WCSAXES", n as i64));
        for i in 0..n {
            header.push(Card::new(format!("CTYPE{}", i + 1), self.ctype[i].as_str()));
        }
        for i in 0..n {
            if !self.cunit[i].is_empty() {
                header.push(Card::new(format!("CUNIT{}", i + 1), self.cunit[i].as_str()));
            }
        }
        for i in 0..n {
            header.push(Card::new(format!("CRPIX{}", i + 1), self.reference_pixel[i]));
        }
        for i in 0..n {
            header.push(Card::new(format!("CRVAL{}", i + 1), self.reference_value[i]));
        }
        for i in 0..n {
            header.push(Card::new(format!("CDELT{}", i + 1), self.scale[i]));
        }
        for i in 0..n {
            for j in 0..n {
                let identity = if i == j { 1.0 } else { 0.0 };
                let value = self.pc_at(i, j);
                if value != identity {
                    header.push(Card::new(format!("PC{}_{}", i + 1, j + 1), value));
                }
            }
        }
        for p in &self.pv {
            header.push(Card::new(format!("PV{}_{}", p.axis, p.index), p.value));
        }
        for p in &self.ps {
            header.push(Card::new(format!("PS{}_{}", p.axis, p.index), p.value.as_str()));
        }
        if let Some(lonpole) = self.lonpole {
            header.push(Card::new("LONPOLE", lonpole));
        }
        if let Some(latpole) = self.latpole {
            header.push(Card::new("LATPOLE", latpole));
        }
        if !self.name.is_empty() {
            header.push(Card::new("WCSNAME", self.name.as_str()));
        }
        header
    }
}
