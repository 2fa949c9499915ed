//! Header keyrecord ("card") parsing and formatting.
//!
//! A FITS header is a sequence of 80-character ASCII records. Value records
//! carry `= ` in columns 9-10; commentary records (COMMENT, HISTORY, blank
//! keyword) carry free text from column 9.

use crate::error::{FitsError, FitsResult};

/// Length of one header keyrecord in bytes.
pub const CARD_LEN: usize = 80;

/// Keyword length (columns 1-8).
const KEYWORD_LEN: usize = 8;

/// Value of a header keyrecord.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Logical(bool),
    /// Value indicator present but the field is empty.
    Undefined,
    /// A token this crate does not interpret (complex numbers, malformed reals).
    Raw(String),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Logical(b) => Some(*b),
            _ => None,
        }
    }

    /// Render the value field (columns 11-80 minus the comment).
    fn format_field(&self) -> String {
        match self {
            Value::Str(s) => {
                let escaped = s.replace('\'', "''");
                format!("'{:<8}'", escaped)
            }
            Value::Int(v) => format!("{:>20}", v),
            Value::Float(v) => format!("{:>20}", format_real(*v)),
            Value::Logical(b) => format!("{:>20}", if *b { "T" } else { "F" }),
            Value::Undefined => " ".repeat(20),
            Value::Raw(s) => format!("{:>20}", s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Logical(v)
    }
}

/// Format a real so that it always reads back as a real (has '.' or 'E').
pub fn format_real(v: f64) -> String {
    let s = format!("{:?}", v).replace('e', "E");
    if s.contains('.') || s.contains('E') || s.contains("inf") || s.contains("NaN") {
        s
    } else {
        format!("{}.0", s)
    }
}

/// One header keyrecord.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub keyword: String,
    pub value: Option<Value>,
    pub comment: Option<String>,
}

impl Card {
    /// Create a value card.
    pub fn new(keyword: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            keyword: keyword.into().to_ascii_uppercase(),
            value: Some(value.into()),
            comment: None,
        }
    }

    /// Create a commentary card (COMMENT, HISTORY, ...).
    pub fn commentary(keyword: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into().to_ascii_uppercase(),
            value: None,
            comment: Some(text.into()),
        }
    }

    /// The END card.
    pub fn end() -> Self {
        Self {
            keyword: "END".to_string(),
            value: None,
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn is_end(&self) -> bool {
        self.keyword == "END"
    }

    /// COMMENT, HISTORY and blank-keyword records.
    pub fn is_commentary(&self) -> bool {
        matches!(self.keyword.as_str(), "COMMENT" | "HISTORY" | "")
    }

    /// Parse one 80-byte (or shorter, space-padded) record.
    pub fn parse(record: &[u8]) -> FitsResult<Self> {
        if record.len() > CARD_LEN {
            return Err(FitsError::invalid_header(format!(
                "keyrecord longer than {} bytes",
                CARD_LEN
            )));
        }
        if !record.iter().all(|b| (0x20..=0x7e).contains(b)) {
            return Err(FitsError::invalid_header(
                "keyrecord contains non-printable characters",
            ));
        }
        // Checked above: printable ASCII is valid UTF-8.
        let text = std::str::from_utf8(record)
            .map_err(|e| FitsError::invalid_header(e.to_string()))?;

        let keyword_end = text.len().min(KEYWORD_LEN);
        let keyword = text[..keyword_end].trim_end().to_string();
        let rest = &text[keyword_end..];

        let is_commentary = matches!(keyword.as_str(), "COMMENT" | "HISTORY" | "");
        if is_commentary || !rest.starts_with("= ") {
            let comment = rest.trim_end();
            return Ok(Self {
                keyword,
                value: None,
                comment: (!comment.is_empty()).then(|| comment.trim_start().to_string()),
            });
        }

        let (value, comment) = parse_value_field(&rest[2..])?;
        Ok(Self {
            keyword,
            value: Some(value),
            comment,
        })
    }

    /// Render as an 80-character record.
    pub fn to_record(&self) -> String {
        let mut record = format!("{:<8}", self.keyword);
        match &self.value {
            Some(value) => {
                record.push_str("= ");
                record.push_str(&value.format_field());
                if let Some(comment) = &self.comment {
                    record.push_str(" / ");
                    record.push_str(comment);
                }
            }
            None => {
                if let Some(text) = &self.comment {
                    record.push_str(text);
                }
            }
        }
        let mut record: String = record.chars().take(CARD_LEN).collect();
        while record.len() < CARD_LEN {
            record.push(' ');
        }
        record
    }
}

/// Parse the value field that follows the value indicator.
fn parse_value_field(field: &str) -> FitsResult<(Value, Option<String>)> {
    let trimmed = field.trim_start();

    if let Some(body) = trimmed.strip_prefix('\'') {
        let mut value = String::new();
        let mut chars = body.char_indices().peekable();
        let mut close = None;
        while let Some((idx, c)) = chars.next() {
            if c == '\'' {
                if matches!(chars.peek(), Some((_, '\''))) {
                    value.push('\'');
                    chars.next();
                } else {
                    close = Some(idx);
                    break;
                }
            } else {
                value.push(c);
            }
        }
        let close =
            close.ok_or_else(|| FitsError::invalid_header("unterminated string value"))?;
        let after = &body[close + 1..];
        let comment = after
            .split_once('/')
            .map(|(_, c)| c.trim().to_string())
            .filter(|c| !c.is_empty());
        return Ok((Value::Str(value.trim_end().to_string()), comment));
    }

    let (token, comment) = match trimmed.split_once('/') {
        Some((token, comment)) => (token.trim(), Some(comment.trim().to_string())),
        None => (trimmed.trim(), None),
    };
    let comment = comment.filter(|c| !c.is_empty());

    let value = if token.is_empty() {
        Value::Undefined
    } else if token == "T" {
        Value::Logical(true)
    } else if token == "F" {
        Value::Logical(false)
    } else if let Ok(v) = token.parse::<i64>() {
        Value::Int(v)
    } else if let Ok(v) = token.replace(['D', 'd'], "E").parse::<f64>() {
        Value::Float(v)
    } else {
        Value::Raw(token.to_string())
    };
    Ok((value, comment))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(s: &str) -> Vec<u8> {
        format!("{:<80}", s).into_bytes()
    }

    #[test]
    fn test_parse_integer_card() {
        let card = Card::parse(&record("NAXIS   =                    2 / number of axes")).unwrap();
        assert_eq!(card.keyword, "NAXIS");
        assert_eq!(card.value, Some(Value::Int(2)));
        assert_eq!(card.comment.as_deref(), Some("number of axes"));
    }

    #[test]
    fn test_parse_string_with_quote() {
        let card = Card::parse(&record("WCSNAME = 'it''s TAB'         / name")).unwrap();
        assert_eq!(card.value, Some(Value::Str("it's TAB".to_string())));
    }

    #[test]
    fn test_parse_string_keeps_leading_spaces_and_slash() {
        let card = Card::parse(&record("PS1_0   = 'WCS/TAB '")).unwrap();
        assert_eq!(card.value.unwrap().as_str(), Some("WCS/TAB"));
    }

    #[test]
    fn test_parse_fortran_double() {
        let card = Card::parse(&record("CDELT1  =              1.5D-01")).unwrap();
        assert_eq!(card.value.unwrap().as_f64(), Some(0.15));
    }

    #[test]
    fn test_parse_logical_and_undefined() {
        let t = Card::parse(&record("SIMPLE  =                    T")).unwrap();
        assert_eq!(t.value, Some(Value::Logical(true)));
        let u = Card::parse(&record("BLANKVAL=")).unwrap();
        assert_eq!(u.keyword, "BLANKVAL");
        assert_eq!(u.value, Some(Value::Undefined));
    }

    #[test]
    fn test_parse_raw_token() {
        let card = Card::parse(&record("CRPIX1  = abc")).unwrap();
        assert_eq!(card.value, Some(Value::Raw("abc".to_string())));
    }

    #[test]
    fn test_commentary_card() {
        let card = Card::parse(&record("HISTORY created by test")).unwrap();
        assert!(card.is_commentary());
        assert_eq!(card.comment.as_deref(), Some("created by test"));
    }

    #[test]
    fn test_unterminated_string_fails() {
        assert!(Card::parse(&record("CTYPE1  = 'RA---TAB")).is_err());
    }

    #[test]
    fn test_record_roundtrip_layout() {
        let card = Card::new("CRVAL1", 150.25).with_comment("deg");
        let rec = card.to_record();
        assert_eq!(rec.len(), CARD_LEN);
        assert_eq!(&rec[..10], "CRVAL1  = ");
        let back = Card::parse(rec.as_bytes()).unwrap();
        assert_eq!(back.value.unwrap().as_f64(), Some(150.25));
        assert_eq!(back.comment.as_deref(), Some("deg"));
    }

    #[test]
    fn test_format_real_always_real() {
        assert_eq!(format_real(50.0), "50.0");
        assert_eq!(format_real(1e-7), "1E-7");
        assert_eq!(format_real(-0.25), "-0.25");
    }
}
