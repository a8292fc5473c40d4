use chrono::{DateTime, Utc};
use serde::Serialize;
use sgp4::Elements;
use utoipa::ToSchema;

use crate::predict::error::PredictError;

/// A validated two-line element set with its derived epoch.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TwoLineElementSet {
    pub norad_id: u64,
    pub name: Option<String>,
    pub line1: String,
    pub line2: String,
    pub epoch: DateTime<Utc>,
}

impl TwoLineElementSet {
    pub fn from_lines(name: Option<String>, line1: &str, line2: &str) -> Result<Self, PredictError> {
        let line1 = line1.trim();
        let line2 = line2.trim();
        let name = name.map(|n| strip_name_prefix(&n)).filter(|n| !n.is_empty());

        let elements = Elements::from_tle(name.clone(), line1.as_bytes(), line2.as_bytes())
            .map_err(|e| PredictError::MalformedTle(e.to_string()))?;

        Ok(Self {
            norad_id: elements.norad_id,
            name,
            line1: line1.to_string(),
            line2: line2.to_string(),
            epoch: elements.datetime.and_utc(),
        })
    }

    /// Parse a 2-line or 3-line (named) TLE block.
    pub fn parse(block: &str) -> Result<Self, PredictError> {
        let lines: Vec<&str> = block
            .lines()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect();

        match lines.as_slice() {
            [line1, line2] => Self::from_lines(None, line1, line2),
            [name, line1, line2] => Self::from_lines(Some(name.to_string()), line1, line2),
            _ => Err(PredictError::MalformedTle(format!(
                "expected 2 or 3 lines, got {}",
                lines.len()
            ))),
        }
    }

    pub fn elements(&self) -> Result<Elements, PredictError> {
        Elements::from_tle(
            self.name.clone(),
            self.line1.as_bytes(),
            self.line2.as_bytes(),
        )
        .map_err(|e| PredictError::MalformedTle(e.to_string()))
    }

    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("NORAD {}", self.norad_id))
    }
}

// Celestrak and SatNOGS prefix the title line with "0 ".
fn strip_name_prefix(name: &str) -> String {
    let name = name.trim();
    name.strip_prefix("0 ").unwrap_or(name).trim().to_string()
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_from_lines_derives_epoch() {
        let tle = iss();
        assert_eq!(tle.norad_id, 25544);
        // Day 264.51782528 of 2008 is 20 September, 12:25:40 UTC
        assert_eq!(tle.epoch.year(), 2008);
        assert_eq!(tle.epoch.month(), 9);
        assert_eq!(tle.epoch.day(), 20);
        assert_eq!(tle.epoch.hour(), 12);
        assert_eq!(tle.epoch.minute(), 25);
    }

    #[test]
    fn test_parse_three_line_block_strips_name_prefix() {
        let tle = TwoLineElementSet::parse(ARIANE_BLOCK).unwrap();
        assert_eq!(tle.norad_id, 60239);
        assert_eq!(tle.name.as_deref(), Some("ARIANE 6 R/B"));
        assert_eq!(tle.display_name(), "ARIANE 6 R/B");
    }

    #[test]
    fn test_parse_two_line_block() {
        let block = format!("\n  {}\n{}\n", ISS_LINE1, ISS_LINE2);
        let tle = TwoLineElementSet::parse(&block).unwrap();
        assert_eq!(tle.name, None);
        assert_eq!(tle.display_name(), "NORAD 25544");
    }

    #[test]
    fn test_parse_rejects_wrong_line_count() {
        let err = TwoLineElementSet::parse(ISS_LINE1).unwrap_err();
        assert!(matches!(err, PredictError::MalformedTle(_)));
    }

    #[test]
    fn test_bad_checksum_is_malformed() {
        let mut line2 = ISS_LINE2.to_string();
        line2.replace_range(68..69, "0");
        let err = TwoLineElementSet::from_lines(None, ISS_LINE1, &line2).unwrap_err();
        assert!(matches!(err, PredictError::MalformedTle(_)));
        assert!(!err.is_expected());
    }
}
