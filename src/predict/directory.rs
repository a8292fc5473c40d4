use serde::Deserialize;

use crate::predict::error::PredictError;
use crate::predict::tle::TwoLineElementSet;

pub const DEFAULT_DIRECTORY_URL: &str = "https://db.satnogs.org/api/tle/";

/// One entry of the directory's JSON answer.
#[derive(Debug, Deserialize)]
struct DirectoryEntry {
    #[serde(default)]
    tle0: Option<String>,
    tle1: String,
    tle2: String,
}

/// HTTP TLE directory queried by catalog number (SatNOGS DB API).
#[derive(Debug, Clone)]
pub struct TleDirectory {
    client: reqwest::Client,
    base_url: String,
}

impl TleDirectory {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn lookup(&self, norad_id: u64) -> Result<TwoLineElementSet, PredictError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("norad_cat_id", norad_id)])
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| PredictError::TleUnavailable(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PredictError::TleUnavailable(format!(
                "HTTP {} from {}",
                status, self.base_url
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| PredictError::TleUnavailable(format!("reading response: {}", e)))?;
        parse_directory_response(&body, norad_id)
    }
}

/// Decode a directory answer, keeping the first entry.
pub fn parse_directory_response(
    body: &str,
    norad_id: u64,
) -> Result<TwoLineElementSet, PredictError> {
    let entries: Vec<DirectoryEntry> = serde_json::from_str(body)
        .map_err(|e| PredictError::TleUnavailable(format!("invalid directory response: {}", e)))?;

    let entry = entries.into_iter().next().ok_or_else(|| {
        PredictError::TleUnavailable(format!("no TLE published for NORAD {}", norad_id))
    })?;

    TwoLineElementSet::from_lines(entry.tle0, &entry.tle1, &entry.tle2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::tle::fixtures::{ISS_LINE1, ISS_LINE2};

    #[test]
    fn test_empty_response_is_unavailable() {
        let err = parse_directory_response("[]", 60239).unwrap_err();
        assert!(matches!(err, PredictError::TleUnavailable(_)));
        assert!(err.is_expected());
    }

    #[test]
    fn test_garbage_response_is_unavailable() {
        let err = parse_directory_response("<html>502</html>", 60239).unwrap_err();
        assert!(matches!(err, PredictError::TleUnavailable(_)));
    }

    #[test]
    fn test_first_entry_is_used() {
        let body = serde_json::json!([
            {
                "tle0": "0 ISS (ZARYA)",
                "tle1": ISS_LINE1,
                "tle2": ISS_LINE2,
                "tle_source": "Celestrak (active)",
                "norad_cat_id": 25544
            },
            { "tle0": "0 OTHER", "tle1": "garbage", "tle2": "garbage" }
        ])
        .to_string();

        let tle = parse_directory_response(&body, 25544).unwrap();
        assert_eq!(tle.norad_id, 25544);
        assert_eq!(tle.name.as_deref(), Some("ISS (ZARYA)"));
    }

    #[test]
    fn test_entry_without_name() {
        let body = serde_json::json!([{ "tle1": ISS_LINE1, "tle2": ISS_LINE2 }]).to_string();
        let tle = parse_directory_response(&body, 25544).unwrap();
        assert_eq!(tle.name, None);
        assert_eq!(tle.display_name(), "NORAD 25544");
    }

    #[test]
    fn test_broken_lines_are_malformed() {
        let body = serde_json::json!([{ "tle1": ISS_LINE1, "tle2": "2 25544" }]).to_string();
        assert!(matches!(
            parse_directory_response(&body, 25544),
            Err(PredictError::MalformedTle(_))
        ));
    }
}
