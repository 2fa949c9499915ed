//! Header keyrecords to coordinate descriptors.

use std::collections::BTreeMap;

use fits_io::{Header, Value};
use tracing::{debug, warn};

use crate::descriptor::{AltKey, CoordinateDescriptor, ProjectionParam, StringParam};
use crate::error::{WcsError, WcsResult};

/// Highest axis number a WCS keyword may carry.
const MAX_AXIS: usize = 99;

/// Descriptors found in a header, primary first then alternates A..Z.
#[derive(Debug, Clone)]
pub struct ParsedDescriptors {
    pub descriptors: Vec<CoordinateDescriptor>,
    /// Number of WCS keyrecords that were recognised but could not be used.
    pub rejected: usize,
}

/// WCS keyword with its axis indices (1-based, as written).
#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    WcsAxes,
    WcsName,
    LonPole,
    LatPole,
    CrPix(usize),
    CrVal(usize),
    CDelt(usize),
    CType(usize),
    CUnit(usize),
    CRota(usize),
    Pc(usize, usize),
    Cd(usize, usize),
    Pv(usize, usize),
    Ps(usize, usize),
}

impl Field {
    /// Axis numbers this field refers to (PV/PS parameter numbers excluded).
    fn axes(&self) -> [usize; 2] {
        match *self {
            Field::CrPix(i)
            | Field::CrVal(i)
            | Field::CDelt(i)
            | Field::CType(i)
            | Field::CUnit(i)
            | Field::CRota(i)
            | Field::Pv(i, _)
            | Field::Ps(i, _) => [i, i],
            Field::Pc(i, j) | Field::Cd(i, j) => [i, j],
            Field::WcsAxes | Field::WcsName | Field::LonPole | Field::LatPole => [1, 1],
        }
    }
}

/// Keyword classification: which field and which representation.
fn classify(keyword: &str) -> Option<(Field, AltKey)> {
    for (base, field) in [
        ("WCSAXES", Field::WcsAxes),
        ("WCSNAME", Field::WcsName),
        ("LONPOLE", Field::LonPole),
        ("LATPOLE", Field::LatPole),
    ] {
        if let Some(rest) = keyword.strip_prefix(base) {
            return alt_only(rest).map(|alt| (field, alt));
        }
    }

    type Single = fn(usize) -> Field;
    let singles: [(&str, Single); 6] = [
        ("CRPIX", Field::CrPix),
        ("CRVAL", Field::CrVal),
        ("CDELT", Field::CDelt),
        ("CTYPE", Field::CType),
        ("CUNIT", Field::CUnit),
        ("CROTA", Field::CRota),
    ];
    for (base, make) in singles {
        if let Some(rest) = keyword.strip_prefix(base) {
            let (body, alt) = split_alt(rest);
            let index = parse_index(body)?;
            let field = make(index);
            // CROTAi has no alternate form.
            if matches!(field, Field::CRota(_)) && alt != AltKey::Primary {
                return None;
            }
            return Some((field, alt));
        }
    }

    type Pair = fn(usize, usize) -> Field;
    let pairs: [(&str, Pair); 4] = [
        ("PC", Field::Pc),
        ("CD", Field::Cd),
        ("PV", Field::Pv),
        ("PS", Field::Ps),
    ];
    for (base, make) in pairs {
        if let Some(rest) = keyword.strip_prefix(base) {
            let (body, alt) = split_alt(rest);
            let (i, j) = body.split_once('_')?;
            let i = parse_index(i)?;
            // PV/PS parameter numbers start at 0.
            let j = if matches!(base, "PV" | "PS") {
                parse_number(j)?
            } else {
                parse_index(j)?
            };
            return Some((make(i, j), alt));
        }
    }
    None
}

fn alt_only(rest: &str) -> Option<AltKey> {
    let mut chars = rest.chars();
    match (chars.next(), chars.next()) {
        (None, _) => Some(AltKey::Primary),
        (Some(c), None) if c.is_ascii_uppercase() => Some(AltKey::Letter(c)),
        _ => None,
    }
}

fn split_alt(rest: &str) -> (&str, AltKey) {
    match rest.chars().last() {
        Some(c) if c.is_ascii_uppercase() => (&rest[..rest.len() - 1], AltKey::Letter(c)),
        _ => (rest, AltKey::Primary),
    }
}

fn parse_number(digits: &str) -> Option<usize> {
    if digits.is_empty() || digits.len() > 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Axis number; 0 is returned as-is so it can be counted as rejected.
fn parse_index(digits: &str) -> Option<usize> {
    parse_number(digits)
}

/// Raw keyword values for one representation, in header order.
#[derive(Debug, Default)]
struct RawRepresentation {
    entries: Vec<(String, Field, Value)>,
}

/// Parse every coordinate representation present in `header`.
///
/// `naxis` is the image dimensionality; a representation without WCSAXESa
/// has as many axes as the larger of `naxis` and the highest axis number
/// among its keywords. Keyrecords whose values have the wrong type, or whose
/// axis numbers are out of range, are counted in `rejected` and skipped.
pub fn parse_descriptors(header: &Header, naxis: usize) -> WcsResult<ParsedDescriptors> {
    let mut raw: BTreeMap<AltKey, RawRepresentation> = BTreeMap::new();
    let mut rejected = 0;

    for card in header.keyrecords(true) {
        let Some((field, alt)) = classify(&card.keyword) else {
            continue;
        };
        let Some(value) = card.value.clone() else {
            continue;
        };
        raw.entry(alt)
            .or_default()
            .entries
            .push((card.keyword.clone(), field, value));
    }

    let mut descriptors = Vec::with_capacity(raw.len());
    for (alt, representation) in raw {
        let (descriptor, bad) = build_descriptor(alt, &representation, naxis);
        rejected += bad;
        if let Some(descriptor) = descriptor {
            debug!(
                alt = %alt,
                axes = descriptor.axis_count(),
                name = %descriptor.name,
                "parsed coordinate descriptor"
            );
            descriptors.push(descriptor);
        }
    }

    if descriptors.is_empty() {
        return Err(WcsError::NoDescriptorsFound);
    }
    Ok(ParsedDescriptors {
        descriptors,
        rejected,
    })
}

fn reject(keyword: &str, reason: &str) -> usize {
    warn!(keyword, reason, "rejected WCS keyrecord");
    1
}

fn build_descriptor(
    alt: AltKey,
    raw: &RawRepresentation,
    naxis: usize,
) -> (Option<CoordinateDescriptor>, usize) {
    let mut rejected = 0;

    let mut wcsaxes = None;
    for (keyword, field, value) in &raw.entries {
        if *field == Field::WcsAxes {
            match value.as_i64() {
                Some(n) if (1..=MAX_AXIS as i64).contains(&n) => wcsaxes = Some(n as usize),
                _ => rejected += reject(keyword, "WCSAXES must be an integer in 1..99"),
            }
        }
    }

    let axis_count = match wcsaxes {
        Some(n) => n,
        None => raw
            .entries
            .iter()
            .flat_map(|(_, field, _)| field.axes())
            .chain(std::iter::once(naxis))
            .max()
            .unwrap_or(naxis),
    };
    if axis_count == 0 {
        return (None, rejected);
    }

    let mut d = CoordinateDescriptor::new(alt, axis_count);
    let n = axis_count;
    let mut pc: Option<Vec<f64>> = None;
    let mut cd: Option<Vec<f64>> = None;
    let mut crota: BTreeMap<usize, f64> = BTreeMap::new();

    for (keyword, field, value) in &raw.entries {
        if *field == Field::WcsAxes {
            continue;
        }
        let [a, b] = field.axes();
        if a == 0 || b == 0 || a > n || b > n {
            rejected += reject(keyword, "axis number out of range");
            continue;
        }
        let (i, j) = (a - 1, b - 1);

        let number = value.as_f64();
        let text = value.as_str();
        match *field {
            Field::WcsName => match text {
                Some(s) => d.name = s.to_string(),
                None => rejected += reject(keyword, "expected a string"),
            },
            Field::CType(_) => match text {
                Some(s) => d.ctype[i] = s.to_string(),
                None => rejected += reject(keyword, "expected a string"),
            },
            Field::CUnit(_) => match text {
                Some(s) => d.cunit[i] = s.to_string(),
                None => rejected += reject(keyword, "expected a string"),
            },
            Field::Ps(axis, index) => match text {
                Some(s) => d.ps.push(StringParam {
                    axis,
                    index,
                    value: s.to_string(),
                }),
                None => rejected += reject(keyword, "expected a string"),
            },
            _ => {
                let Some(v) = number else {
                    rejected += reject(keyword, "expected a number");
                    continue;
                };
                match *field {
                    Field::LonPole => d.lonpole = Some(v),
                    Field::LatPole => d.latpole = Some(v),
                    Field::CrPix(_) => d.reference_pixel[i] = v,
                    Field::CrVal(_) => d.reference_value[i] = v,
                    Field::CDelt(_) => d.scale[i] = v,
                    Field::CRota(_) => {
                        crota.insert(i, v);
                    }
                    Field::Pc(_, _) => pc.get_or_insert_with(|| identity(n))[i * n + j] = v,
                    Field::Cd(_, _) => cd.get_or_insert_with(|| identity(n))[i * n + j] = v,
                    Field::Pv(axis, index) => d.pv.push(ProjectionParam {
                        axis,
                        index,
                        value: v,
                    }),
                    _ => {}
                }
            }
        }
    }

    if let Some(pc) = pc {
        d.pc = pc;
    } else if let Some(cd) = cd {
        d.pc = cd;
        d.scale = vec![1.0; n];
    } else if !crota.is_empty() && n >= 2 {
        apply_crota(&mut d, &crota);
    }

    (Some(d), rejected)
}

fn identity(n: usize) -> Vec<f64> {
    let mut m = vec![0.0; n * n];
    for i in 0..n {
        m[i * n + i] = 1.0;
    }
    m
}

/// Convert the CROTAi rotation of the latitude axis into PC elements.
fn apply_crota(d: &mut CoordinateDescriptor, crota: &BTreeMap<usize, f64>) {
    let (lon, lat) = d.celestial_axes().unwrap_or((0, 1));
    let Some(rho) = crota
        .get(&lat)
        .or_else(|| crota.values().next())
        .copied()
    else {
        return;
    };
    let (dl, db) = (d.scale[lon], d.scale[lat]);
    if rho == 0.0 || dl == 0.0 || db == 0.0 {
        return;
    }

    let n = d.axis_count();
    let (s, c) = rho.to_radians().sin_cos();
    d.pc[lon * n + lon] = c;
    d.pc[lon * n + lat] = -s * db / dl;
    d.pc[lat * n + lon] = s * dl / db;
    d.pc[lat * n + lat] = c;
}
