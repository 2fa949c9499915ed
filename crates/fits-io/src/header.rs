//! FITS header units: ordered keyrecords terminated by END.

use crate::card::{Card, Value, CARD_LEN};
use crate::error::{FitsError, FitsResult};

/// An ordered list of header keyrecords (END excluded).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    cards: Vec<Card>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a sequence of keyrecords, stopping at END.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a str>) -> FitsResult<Self> {
        let mut cards = Vec::new();
        for record in records {
            let card = Card::parse(record.as_bytes())?;
            if card.is_end() {
                break;
            }
            cards.push(card);
        }
        Ok(Self { cards })
    }

    /// Parse header text with one keyrecord per line.
    ///
    /// Lines are truncated or space-padded to 80 columns. Text without line
    /// breaks is split into consecutive 80-character records. Parsing stops
    /// at END.
    pub fn from_text(text: &str) -> FitsResult<Self> {
        let records: Vec<&str> = if text.contains('\n') {
            text.lines().collect()
        } else {
            let mut chunks = Vec::new();
            let mut rest = text;
            while !rest.is_empty() {
                let split = rest
                    .char_indices()
                    .nth(CARD_LEN)
                    .map(|(idx, _)| idx)
                    .unwrap_or(rest.len());
                chunks.push(&rest[..split]);
                rest = &rest[split..];
            }
            chunks
        };

        let mut cards = Vec::new();
        for line in records {
            let line = line.trim_end_matches('\r');
            let line: String = line.chars().take(CARD_LEN).collect();
            if line.trim().is_empty() {
                continue;
            }
            let card = Card::parse(line.as_bytes())?;
            if card.is_end() {
                break;
            }
            cards.push(card);
        }
        Ok(Self { cards })
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Keyrecords in order, optionally skipping COMMENT/HISTORY/blank records.
    pub fn keyrecords(&self, exclude_commentary: bool) -> impl Iterator<Item = &Card> {
        self.cards
            .iter()
            .filter(move |card| !(exclude_commentary && card.is_commentary()))
    }

    /// First value recorded for `keyword`.
    pub fn get(&self, keyword: &str) -> Option<&Value> {
        self.cards
            .iter()
            .find(|card| card.keyword == keyword)
            .and_then(|card| card.value.as_ref())
    }

    pub fn get_f64(&self, keyword: &str) -> Option<f64> {
        self.get(keyword).and_then(Value::as_f64)
    }

    pub fn get_i64(&self, keyword: &str) -> Option<i64> {
        self.get(keyword).and_then(Value::as_i64)
    }

    pub fn get_str(&self, keyword: &str) -> Option<&str> {
        self.get(keyword).and_then(Value::as_str)
    }

    /// Integer value of a mandatory keyword.
    pub fn require_i64(&self, keyword: &str) -> FitsResult<i64> {
        match self.get(keyword) {
            None => Err(FitsError::MissingKeyword(keyword.to_string())),
            Some(value) => value
                .as_i64()
                .ok_or_else(|| FitsError::invalid_keyword(keyword, "expected an integer")),
        }
    }

    /// Append a keyrecord.
    pub fn push(&mut self, card: Card) {
        self.cards.push(card);
    }

    /// Replace the first keyrecord named like `card`, or append it.
    pub fn set(&mut self, card: Card) {
        match self
            .cards
            .iter_mut()
            .find(|existing| existing.keyword == card.keyword)
        {
            Some(existing) => *existing = card,
            None => self.cards.push(card),
        }
    }

    /// Append every keyrecord of `other`, replacing value cards already present.
    pub fn merge(&mut self, other: &Header) {
        for card in other.cards() {
            if card.is_commentary() {
                self.push(card.clone());
            } else {
                self.set(card.clone());
            }
        }
    }

    /// Keyrecords as one string of concatenated 80-character records.
    pub fn to_text(&self, exclude_commentary: bool) -> String {
        self.keyrecords(exclude_commentary)
            .map(Card::to_record)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Header {
        let mut header = Header::new();
        header.push(Card::new("SIMPLE", true));
        header.push(Card::new("BITPIX", -32i64));
        header.push(Card::new("NAXIS", 2i64));
        header.push(Card::commentary("COMMENT", "a note"));
        header.push(Card::new("CTYPE1", "RA---TAB"));
        header
    }

    #[test]
    fn test_from_records_stops_at_end() {
        let records = [
            "CTYPE1  = 'RA---TAB'",
            "NAXIS   =                    2",
            "END",
            "CRPIX1  =                  1.0",
        ];
        let header = Header::from_records(records).unwrap();
        assert_eq!(header.len(), 2);
        assert_eq!(header.get_str("CTYPE1"), Some("RA---TAB"));
        assert_eq!(header.require_i64("NAXIS").unwrap(), 2);
        assert!(Header::from_records(["CTYPE1  = 'RA---TAB"]).is_err());
    }

    #[test]
    fn test_keyrecords_excludes_commentary() {
        let header = sample();
        assert_eq!(header.keyrecords(false).count(), 5);
        assert_eq!(header.keyrecords(true).count(), 4);
    }

    #[test]
    fn test_from_text_lines() {
        let text = "CTYPE1  = 'RA---CAR'\nCRPIX1  = 50\nEND\nCRPIX2  = 7\n";
        let header = Header::from_text(text).unwrap();
        assert_eq!(header.len(), 2);
        assert_eq!(header.get_f64("CRPIX1"), Some(50.0));
        assert!(header.get("CRPIX2").is_none());
    }

    #[test]
    fn test_from_text_fixed_records() {
        let text = sample().to_text(false);
        let header = Header::from_text(&text).unwrap();
        assert_eq!(header.len(), 5);
    }

    #[test]
    fn test_require_wrong_type() {
        let header = sample();
        assert!(matches!(
            header.require_i64("CTYPE1"),
            Err(FitsError::InvalidKeyword { .. })
        ));
        assert!(matches!(
            header.require_i64("NAXIS3"),
            Err(FitsError::MissingKeyword(_))
        ));
    }

    #[test]
    fn test_set_replaces() {
        let mut header = sample();
        header.set(Card::new("NAXIS", 3i64));
        assert_eq!(header.get_i64("NAXIS"), Some(3));
        assert_eq!(header.len(), 5);
    }
}
