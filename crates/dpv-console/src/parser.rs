//! `[DataPoint]` line parser.
//!
//! A record line looks like:
//!
//! ```text
//! [DataPoint] Location: '/a' Quality: 'OK' Description: 'temp' Data: '10'
//! ```
//!
//! Binary streams print the checksum of the payload instead:
//!
//! ```text
//! [DataPoint] Location: '/b' Quality: '0' Data crc32_DEC: '3057449933' Data crc32_HEX: 'B63CFBCD'
//! ```
//!
//! Every field is matched on its own; a field whose pattern does not match is
//! absent, never an empty string. The parser holds no state between calls.

use std::iter::Enumerate;
use std::str::Lines;
use std::sync::OnceLock;

use dpv_schemas::{BinaryRecord, ConsoleRecord, ScalarRecord};
use regex::Regex;

use crate::error::{MalformedReason, MalformedRecord};
use crate::DATAPOINT_MARKER;

const LOCATION: &str = "Location";
const QUALITY: &str = "Quality";
const DESCRIPTION: &str = "Description";
const DATA: &str = "Data";
const DATA_CRC32_DEC: &str = "Data crc32_DEC";
const DATA_CRC32_HEX: &str = "Data crc32_HEX";

struct FieldPatterns {
    location: Regex,
    quality: Regex,
    description: Regex,
    data: Regex,
    crc32_dec: Regex,
    crc32_hex: Regex,
}

fn field_regex(name: &str) -> Regex {
    // `\b` keeps `Data` from matching inside e.g. `MetaData`; the trailing `: '`
    // keeps it from matching `Data crc32_DEC`.
    Regex::new(&format!(r"\b{}: '(.*?)'", regex::escape(name))).expect("valid field pattern")
}

fn patterns() -> &'static FieldPatterns {
    static PATTERNS: OnceLock<FieldPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| FieldPatterns {
        location: field_regex(LOCATION),
        quality: field_regex(QUALITY),
        description: field_regex(DESCRIPTION),
        data: field_regex(DATA),
        crc32_dec: field_regex(DATA_CRC32_DEC),
        crc32_hex: field_regex(DATA_CRC32_HEX),
    })
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

// ---------------------------------------------------------------------------
// Raw fields
// ---------------------------------------------------------------------------

/// Fields found on one record line, before shape validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsoleFields {
    pub location: Option<String>,
    pub quality: Option<String>,
    pub description: Option<String>,
    pub data: Option<String>,
    pub crc32_decimal: Option<String>,
    pub crc32_hex: Option<String>,
}

impl ConsoleFields {
    /// Extract every known field from the text that follows the marker.
    pub fn extract(text: &str) -> Self {
        let p = patterns();
        Self {
            location: capture(&p.location, text),
            quality: capture(&p.quality, text),
            description: capture(&p.description, text),
            data: capture(&p.data, text),
            crc32_decimal: capture(&p.crc32_dec, text),
            crc32_hex: capture(&p.crc32_hex, text),
        }
    }

    /// Assemble a record. Binary iff both checksum renderings are present.
    pub fn into_record(self, line: usize) -> Result<ConsoleRecord, MalformedRecord> {
        let malformed = |reason| MalformedRecord { line, reason };

        let location = self
            .location
            .ok_or_else(|| malformed(MalformedReason::MissingField(LOCATION)))?;
        let quality = self
            .quality
            .ok_or_else(|| malformed(MalformedReason::MissingField(QUALITY)))?;

        match (self.crc32_decimal, self.crc32_hex) {
            (Some(crc32_decimal), Some(crc32_hex)) => Ok(ConsoleRecord::Binary(BinaryRecord {
                location,
                quality,
                description: self.description,
                data: self.data,
                crc32_decimal,
                crc32_hex,
            })),
            (None, None) => {
                let data = self
                    .data
                    .ok_or_else(|| malformed(MalformedReason::MissingField(DATA)))?;
                Ok(ConsoleRecord::Scalar(ScalarRecord {
                    location,
                    quality,
                    description: self.description,
                    data,
                }))
            }
            _ => Err(malformed(MalformedReason::PartialChecksum)),
        }
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Finds record lines by their start marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordParser {
    marker: String,
}

impl Default for RecordParser {
    fn default() -> Self {
        Self::new(DATAPOINT_MARKER)
    }
}

impl RecordParser {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Raw fields of every line that starts with the marker, with its
    /// 1-based line number.
    pub fn parse_fields<'a>(&'a self, buf: &'a str) -> FieldBlocks<'a> {
        FieldBlocks {
            lines: buf.lines().enumerate(),
            marker: &self.marker,
        }
    }

    /// Lazy sequence of records in emission order.
    pub fn parse<'a>(&'a self, buf: &'a str) -> Records<'a> {
        Records {
            blocks: self.parse_fields(buf),
        }
    }

    /// All records of the buffer; the first malformed line fails the whole buffer.
    pub fn collect(&self, buf: &str) -> Result<Vec<ConsoleRecord>, MalformedRecord> {
        self.parse(buf).collect()
    }
}

/// Iterator over `(line, fields)` for marker lines.
pub struct FieldBlocks<'a> {
    lines: Enumerate<Lines<'a>>,
    marker: &'a str,
}

impl<'a> Iterator for FieldBlocks<'a> {
    type Item = (usize, ConsoleFields);

    fn next(&mut self) -> Option<Self::Item> {
        for (idx, line) in self.lines.by_ref() {
            // Anchored: the marker must open the line.
            if let Some(rest) = line.strip_prefix(self.marker) {
                return Some((idx + 1, ConsoleFields::extract(rest)));
            }
        }
        None
    }
}

/// Iterator over assembled records.
pub struct Records<'a> {
    blocks: FieldBlocks<'a>,
}

impl<'a> Iterator for Records<'a> {
    type Item = Result<ConsoleRecord, MalformedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.blocks
            .next()
            .map(|(line, fields)| fields.into_record(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BATCH: &str = "\
boot banner
[DataPoint] Location: '/a' Quality: 'OK' Description: 'first' Data: '10'
noise [DataPoint] Location: '/x' Quality: 'OK' Data: '99'
[DataPoint] Location: ' /a ' Quality: 'OK' Data: ' 20 '
END LOOP ----------------------------------------
";

    fn scalar(r: &ConsoleRecord) -> &ScalarRecord {
        match r {
            ConsoleRecord::Scalar(s) => s,
            other => panic!("expected scalar, got {other:?}"),
        }
    }

    #[test]
    fn only_anchored_markers_start_records() {
        let recs = RecordParser::default().collect(BATCH).unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(scalar(&recs[0]).data, "10");
        assert_eq!(scalar(&recs[1]).data, "20");
    }

    #[test]
    fn values_are_trimmed() {
        let recs = RecordParser::default().collect(BATCH).unwrap();
        assert_eq!(recs[1].location(), "/a");
    }

    #[test]
    fn missing_description_stays_absent() {
        let recs = RecordParser::default().collect(BATCH).unwrap();
        assert_eq!(recs[0].description(), Some("first"));
        assert_eq!(recs[1].description(), None);
    }

    #[test]
    fn empty_buffer_yields_nothing() {
        assert!(RecordParser::default().collect("").unwrap().is_empty());
        assert!(RecordParser::default()
            .collect("no markers here\n")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn unterminated_quote_leaves_field_absent() {
        let f = ConsoleFields::extract(" Location: '/a' Quality: 'OK' Description: 'never closed");
        assert_eq!(f.description, None);
        assert_eq!(f.location.as_deref(), Some("/a"));
    }

    #[test]
    fn data_does_not_match_checksum_fields() {
        let f = ConsoleFields::extract(
            " Location: '/b' Quality: '0' Data crc32_DEC: '3057449933' Data crc32_HEX: 'B63CFBCD'",
        );
        assert_eq!(f.data, None);
        assert_eq!(f.crc32_decimal.as_deref(), Some("3057449933"));
        assert_eq!(f.crc32_hex.as_deref(), Some("B63CFBCD"));
    }

    #[test]
    fn checksum_fields_make_a_binary_record() {
        let text = "[DataPoint] Location: '/b' Quality: '0' Data crc32_DEC: '3057449933' Data crc32_HEX: 'B63CFBCD'";
        let recs = RecordParser::default().collect(text).unwrap();
        match &recs[0] {
            ConsoleRecord::Binary(b) => {
                assert_eq!(b.crc32_decimal, "3057449933");
                assert_eq!(b.crc32_hex, "B63CFBCD");
                assert_eq!(b.data, None);
            }
            other => panic!("expected binary, got {other:?}"),
        }
    }

    #[test]
    fn one_checksum_field_is_malformed() {
        let text = "[DataPoint] Location: '/b' Quality: '0' Data crc32_DEC: '1'";
        let err = RecordParser::default().collect(text).unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.reason, MalformedReason::PartialChecksum);
    }

    #[test]
    fn scalar_without_data_is_malformed() {
        let text = "x\n[DataPoint] Location: '/a' Quality: 'OK'";
        let err = RecordParser::default().collect(text).unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.reason, MalformedReason::MissingField("Data"));
    }

    #[test]
    fn parsing_twice_yields_identical_records() {
        let p = RecordParser::default();
        assert_eq!(p.collect(BATCH).unwrap(), p.collect(BATCH).unwrap());
    }

    #[test]
    fn custom_marker() {
        let p = RecordParser::new("[DP]");
        let recs = p
            .collect("[DP] Location: '/c' Quality: 'OK' Data: '1'\n[DataPoint] Location: '/d' Quality: 'OK' Data: '2'")
            .unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].location(), "/c");
    }
}
