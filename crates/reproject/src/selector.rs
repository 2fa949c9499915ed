//! Choosing the input coordinate descriptor.

use std::collections::BTreeMap;
use std::fmt;

use wcs::{AltKey, CoordinateDescriptor};

use crate::error::{ReprojectError, Result};

/// Parsed `-a` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// No selector given: descriptor 0.
    Default,
    /// 0-relative position in the parsed descriptor list.
    Index(usize),
    /// A single blank: the primary descriptor.
    Primary,
    /// Alternate letter A-Z.
    Letter(char),
}

impl Selector {
    pub fn parse(text: &str) -> Result<Self> {
        if text.is_empty() {
            return Ok(Self::Default);
        }
        if text.bytes().all(|b| b.is_ascii_digit()) {
            return text.parse().map(Self::Index).map_err(|_| {
                ReprojectError::invalid_selector(format!(
                    "no alternate coordinate representation \"{}\"",
                    text
                ))
            });
        }

        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(' '), None) => Ok(Self::Primary),
            (Some(c), None) if c.is_ascii_alphabetic() => Ok(Self::Letter(c.to_ascii_uppercase())),
            _ => Err(ReprojectError::invalid_selector(format!(
                "alternate specifier \"{}\" is invalid",
                text
            ))),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, ""),
            Self::Index(k) => write!(f, "{}", k),
            Self::Primary => write!(f, " "),
            Self::Letter(c) => write!(f, "{}", c),
        }
    }
}

/// Alternate key to descriptor position.
#[derive(Debug, Clone, Default)]
pub struct AltIndex {
    positions: BTreeMap<AltKey, usize>,
}

impl AltIndex {
    /// Index a descriptor list; the first descriptor with a key wins.
    pub fn build(descriptors: &[CoordinateDescriptor]) -> Self {
        let mut positions = BTreeMap::new();
        for (idx, descriptor) in descriptors.iter().enumerate() {
            positions.entry(descriptor.alt).or_insert(idx);
        }
        Self { positions }
    }

    pub fn get(&self, key: AltKey) -> Option<usize> {
        self.positions.get(&key).copied()
    }

    pub fn has_primary(&self) -> bool {
        self.positions.contains_key(&AltKey::Primary)
    }
}

/// Position of the descriptor `selector` picks out of `descriptors`.
pub fn select_descriptor(descriptors: &[CoordinateDescriptor], selector: Selector) -> Result<usize> {
    match selector {
        Selector::Default => Ok(0),
        Selector::Index(k) => {
            if k >= descriptors.len() {
                Err(ReprojectError::invalid_selector(format!(
                    "no alternate coordinate representation \"{}\"",
                    k
                )))
            } else {
                Ok(k)
            }
        }
        Selector::Primary => AltIndex::build(descriptors)
            .get(AltKey::Primary)
            .ok_or_else(|| ReprojectError::invalid_selector("no primary coordinate representation")),
        Selector::Letter(c) => AltIndex::build(descriptors)
            .get(AltKey::Letter(c))
            .ok_or_else(|| {
                ReprojectError::invalid_selector(format!(
                    "no alternate coordinate representation \"{}\"",
                    c
                ))
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptors(keys: &[AltKey]) -> Vec<CoordinateDescriptor> {
        keys.iter().map(|&k| CoordinateDescriptor::new(k, 2)).collect()
    }

    #[test]
    fn test_parse() {
        assert_eq!(Selector::parse("").unwrap(), Selector::Default);
        assert_eq!(Selector::parse("2").unwrap(), Selector::Index(2));
        assert_eq!(Selector::parse("12").unwrap(), Selector::Index(12));
        assert_eq!(Selector::parse(" ").unwrap(), Selector::Primary);
        assert_eq!(Selector::parse("b").unwrap(), Selector::Letter('B'));
        assert!(matches!(Selector::parse("AB"), Err(ReprojectError::InvalidSelector(_))));
        assert!(matches!(Selector::parse("#"), Err(ReprojectError::InvalidSelector(_))));
        assert!(matches!(Selector::parse("1a"), Err(ReprojectError::InvalidSelector(_))));
    }

    #[test]
    fn test_default_is_first() {
        let d = descriptors(&[AltKey::Letter('A')]);
        assert_eq!(select_descriptor(&d, Selector::Default).unwrap(), 0);
    }

    #[test]
    fn test_index_out_of_range() {
        let d = descriptors(&[AltKey::Primary, AltKey::Letter('A')]);
        assert_eq!(select_descriptor(&d, Selector::Index(1)).unwrap(), 1);
        assert!(matches!(
            select_descriptor(&d, Selector::Index(3)),
            Err(ReprojectError::InvalidSelector(_))
        ));
        assert!(matches!(
            select_descriptor(&d, Selector::Index(2)),
            Err(ReprojectError::InvalidSelector(_))
        ));
    }

    #[test]
    fn test_index_at_usize_max() {
        let selector = Selector::parse("18446744073709551615").unwrap();
        assert_eq!(selector, Selector::Index(usize::MAX));
        let d = descriptors(&[AltKey::Primary]);
        assert!(matches!(
            select_descriptor(&d, selector),
            Err(ReprojectError::InvalidSelector(_))
        ));
    }

    #[test]
    fn test_letter_lookup() {
        let d = descriptors(&[AltKey::Primary, AltKey::Letter('A'), AltKey::Letter('C')]);
        assert_eq!(select_descriptor(&d, Selector::Letter('C')).unwrap(), 2);
        assert!(matches!(
            select_descriptor(&d, Selector::Letter('B')),
            Err(ReprojectError::InvalidSelector(_))
        ));
    }

    #[test]
    fn test_primary_required_for_blank() {
        let d = descriptors(&[AltKey::Letter('A')]);
        let err = select_descriptor(&d, Selector::Primary).unwrap_err();
        assert_eq!(err.to_string(), "no primary coordinate representation");

        let d = descriptors(&[AltKey::Primary]);
        assert_eq!(select_descriptor(&d, Selector::Primary).unwrap(), 0);
    }

    #[test]
    fn test_alt_index() {
        let d = descriptors(&[AltKey::Letter('B'), AltKey::Primary]);
        let index = AltIndex::build(&d);
        assert!(index.has_primary());
        assert_eq!(index.get(AltKey::Letter('B')), Some(0));
        assert_eq!(index.get(AltKey::Letter('Z')), None);
    }
}
