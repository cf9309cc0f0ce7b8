//! Forecast parsing.
//!
//! Turns the avalanche.org product JSON into a `ForecastRecord`: timestamps
//! converted to the display zone, HTML stripped from the bottom line, and the
//! day's overall danger derived from the "current" elevation-band ratings.

use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;
use serde::Deserialize;
use std::fmt;

use crate::errors::AppError;
use crate::helpers::strip_html;

/// Timestamp format used by the product API, e.g. "2024-01-02T15:04:00+0000".
const API_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// Validity marker of the day entry describing today's conditions.
const VALID_DAY_CURRENT: &str = "current";

// ---------------------------------------------------------------------------
// Danger scale
// ---------------------------------------------------------------------------

/// North American avalanche danger scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DangerLevel {
    Unknown = 0,
    Low = 1,
    Moderate = 2,
    Considerable = 3,
    High = 4,
    Extreme = 5,
}

impl DangerLevel {
    pub fn label(self) -> &'static str {
        match self {
            DangerLevel::Unknown => "Unknown",
            DangerLevel::Low => "Low",
            DangerLevel::Moderate => "Moderate",
            DangerLevel::Considerable => "Considerable",
            DangerLevel::High => "High",
            DangerLevel::Extreme => "Extreme",
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }
}

impl TryFrom<i64> for DangerLevel {
    type Error = AppError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DangerLevel::Unknown),
            1 => Ok(DangerLevel::Low),
            2 => Ok(DangerLevel::Moderate),
            3 => Ok(DangerLevel::Considerable),
            4 => Ok(DangerLevel::High),
            5 => Ok(DangerLevel::Extreme),
            other => Err(AppError::MalformedForecast(format!(
                "danger rating {} outside 0-5",
                other
            ))),
        }
    }
}

impl fmt::Display for DangerLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Day entries
// ---------------------------------------------------------------------------

/// Which day a danger entry applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidDay {
    Current,
    Tomorrow,
    /// Any other marker the API sends, kept verbatim.
    Other(String),
}

impl From<String> for ValidDay {
    fn from(s: String) -> Self {
        match s.as_str() {
            VALID_DAY_CURRENT => ValidDay::Current,
            "tomorrow" => ValidDay::Tomorrow,
            _ => ValidDay::Other(s),
        }
    }
}

/// Danger ratings for one day across the three elevation bands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DangerDay {
    pub valid_day: ValidDay,
    pub lower: DangerLevel,
    pub middle: DangerLevel,
    pub upper: DangerLevel,
}

impl DangerDay {
    /// Highest rating across the elevation bands.
    pub fn highest(&self) -> DangerLevel {
        self.lower.max(self.middle).max(self.upper)
    }
}

/// Highest band rating among entries for the current day; `Unknown` if none.
pub fn max_current_danger(days: &[DangerDay]) -> DangerLevel {
    days.iter()
        .filter(|d| d.valid_day == ValidDay::Current)
        .map(DangerDay::highest)
        .max()
        .unwrap_or(DangerLevel::Unknown)
}

// ---------------------------------------------------------------------------
// Forecast record
// ---------------------------------------------------------------------------

/// A parsed forecast, immutable once built.
///
/// `max_current_danger` is always derived from `danger_days` in `new`.
#[derive(Debug, Clone)]
pub struct ForecastRecord {
    published_at: DateTime<Tz>,
    expires_at: DateTime<Tz>,
    author: String,
    danger_days: Vec<DangerDay>,
    bottom_line: String,
    max_current_danger: DangerLevel,
}

impl ForecastRecord {
    pub fn new(
        published_at: DateTime<Tz>,
        expires_at: DateTime<Tz>,
        author: String,
        danger_days: Vec<DangerDay>,
        bottom_line: String,
    ) -> Self {
        let max_current_danger = max_current_danger(&danger_days);
        Self {
            published_at,
            expires_at,
            author,
            danger_days,
            bottom_line,
            max_current_danger,
        }
    }

    pub fn published_at(&self) -> &DateTime<Tz> {
        &self.published_at
    }

    pub fn expires_at(&self) -> &DateTime<Tz> {
        &self.expires_at
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn danger_days(&self) -> &[DangerDay] {
        &self.danger_days
    }

    pub fn bottom_line(&self) -> &str {
        &self.bottom_line
    }

    pub fn max_current_danger(&self) -> DangerLevel {
        self.max_current_danger
    }
}

// --- avalanche.org JSON response types ---

#[derive(Debug, Deserialize)]
struct RawForecast {
    published_time: Option<String>,
    expires_time: Option<String>,
    author: Option<String>,
    danger: Option<Vec<RawDangerDay>>,
    bottom_line: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDangerDay {
    valid_day: String,
    lower: Option<i64>,
    middle: Option<i64>,
    upper: Option<i64>,
}

/// A `null` band rating means the center did not rate it.
fn rating(value: Option<i64>) -> Result<DangerLevel, AppError> {
    value.map_or(Ok(DangerLevel::Unknown), DangerLevel::try_from)
}

fn require<T>(value: Option<T>, field: &str) -> Result<T, AppError> {
    value.ok_or_else(|| AppError::MalformedForecast(format!("missing field '{}'", field)))
}

/// Parse an API timestamp and convert it to the display zone.
///
/// The API's `+0000` offset form is expected; RFC 3339 (`+00:00`) is also accepted.
pub fn parse_timestamp(s: &str, tz: Tz) -> Result<DateTime<Tz>, AppError> {
    DateTime::<FixedOffset>::parse_from_str(s, API_TIME_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(s))
        .map(|dt| dt.with_timezone(&tz))
        .map_err(|e| AppError::MalformedTimestamp(format!("'{}': {}", s, e)))
}

/// Build a `ForecastRecord` from the raw product JSON.
pub fn parse_forecast(raw_json: &serde_json::Value, tz: Tz) -> Result<ForecastRecord, AppError> {
    let raw: RawForecast = serde_json::from_value(raw_json.clone())
        .map_err(|e| AppError::MalformedForecast(format!("unexpected structure: {}", e)))?;

    let published_at = parse_timestamp(&require(raw.published_time, "published_time")?, tz)?;
    let expires_at = parse_timestamp(&require(raw.expires_time, "expires_time")?, tz)?;
    let author = require(raw.author, "author")?;
    let bottom_line = strip_html(&require(raw.bottom_line, "bottom_line")?);

    let danger_days = require(raw.danger, "danger")?
        .into_iter()
        .map(|d| {
            Ok(DangerDay {
                valid_day: ValidDay::from(d.valid_day),
                lower: rating(d.lower)?,
                middle: rating(d.middle)?,
                upper: rating(d.upper)?,
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    Ok(ForecastRecord::new(
        published_at,
        expires_at,
        author,
        danger_days,
        bottom_line,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Timelike, Utc};

    fn sample_json() -> serde_json::Value {
        serde_json::json!({
            "id": 131245,
            "published_time": "2024-01-02T15:04:00+0000",
            "expires_time": "2024-01-03T15:00:00+0000",
            "author": "Dallas Glass",
            "product_type": "forecast",
            "bottom_line": "<p>Danger is <b>high</b> today.</p>",
            "danger": [
                { "valid_day": "current", "lower": 1, "middle": 3, "upper": 2 },
                { "valid_day": "tomorrow", "lower": 5, "middle": 5, "upper": 5 }
            ]
        })
    }

    fn day(valid_day: &str, lower: i64, middle: i64, upper: i64) -> DangerDay {
        DangerDay {
            valid_day: ValidDay::from(valid_day.to_string()),
            lower: DangerLevel::try_from(lower).unwrap(),
            middle: DangerLevel::try_from(middle).unwrap(),
            upper: DangerLevel::try_from(upper).unwrap(),
        }
    }

    #[test]
    fn test_danger_level_labels() {
        let labels: Vec<&str> = (0..=5)
            .map(|i| DangerLevel::try_from(i).unwrap().label())
            .collect();
        assert_eq!(
            labels,
            ["Unknown", "Low", "Moderate", "Considerable", "High", "Extreme"]
        );
    }

    #[test]
    fn test_danger_level_out_of_range() {
        assert!(DangerLevel::try_from(6).is_err());
        assert!(DangerLevel::try_from(-1).is_err());
    }

    #[test]
    fn test_max_current_danger_ignores_tomorrow() {
        let days = vec![day("current", 1, 3, 2), day("tomorrow", 5, 5, 5)];
        assert_eq!(max_current_danger(&days), DangerLevel::Considerable);
        assert_eq!(max_current_danger(&days).index(), 3);
    }

    #[test]
    fn test_max_current_danger_no_current_entry() {
        let days = vec![day("tomorrow", 4, 4, 4)];
        assert_eq!(max_current_danger(&days), DangerLevel::Unknown);
        assert_eq!(max_current_danger(&[]), DangerLevel::Unknown);
    }

    #[test]
    fn test_max_current_danger_multiple_current_entries() {
        let days = vec![day("current", 1, 1, 2), day("current", 2, 4, 1)];
        assert_eq!(max_current_danger(&days), DangerLevel::High);
    }

    #[test]
    fn test_parse_forecast() {
        let record = parse_forecast(&sample_json(), chrono_tz::UTC).unwrap();

        assert_eq!(record.author(), "Dallas Glass");
        assert_eq!(record.bottom_line(), "Danger is high today.");
        assert_eq!(record.danger_days().len(), 2);
        assert_eq!(record.danger_days()[1].valid_day, ValidDay::Tomorrow);
        assert_eq!(record.max_current_danger(), DangerLevel::Considerable);
        assert_eq!(
            record.published_at().with_timezone(&Utc),
            "2024-01-02T15:04:00Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[test]
    fn test_parse_forecast_converts_to_display_zone() {
        let record = parse_forecast(&sample_json(), chrono_tz::US::Pacific).unwrap();
        // 15:04 UTC is 07:04 PST
        assert_eq!(record.published_at().hour(), 7);
        assert_eq!(record.published_at().timezone(), chrono_tz::US::Pacific);
    }

    #[test]
    fn test_parse_forecast_null_rating_is_unknown() {
        let mut json = sample_json();
        json["danger"] = serde_json::json!([
            { "valid_day": "current", "lower": null, "middle": 2, "upper": null }
        ]);
        let record = parse_forecast(&json, chrono_tz::UTC).unwrap();
        assert_eq!(record.danger_days()[0].lower, DangerLevel::Unknown);
        assert_eq!(record.max_current_danger(), DangerLevel::Moderate);
    }

    #[test]
    fn test_parse_forecast_missing_fields() {
        for field in ["author", "danger", "bottom_line", "published_time", "expires_time"] {
            let mut json = sample_json();
            json.as_object_mut().unwrap().remove(field);
            let err = parse_forecast(&json, chrono_tz::UTC).unwrap_err();
            assert!(
                matches!(&err, AppError::MalformedForecast(msg) if msg.contains(field)),
                "missing {} gave {:?}",
                field,
                err
            );
        }
    }

    #[test]
    fn test_parse_forecast_not_an_object() {
        for json in [serde_json::json!(""), serde_json::json!(null), serde_json::json!([1, 2])] {
            assert!(matches!(
                parse_forecast(&json, chrono_tz::UTC),
                Err(AppError::MalformedForecast(_))
            ));
        }
    }

    #[test]
    fn test_parse_forecast_out_of_range_rating() {
        let mut json = sample_json();
        json["danger"][0]["upper"] = serde_json::json!(9);
        assert!(matches!(
            parse_forecast(&json, chrono_tz::UTC),
            Err(AppError::MalformedForecast(_))
        ));
    }

    #[test]
    fn test_parse_forecast_bad_timestamp() {
        let mut json = sample_json();
        json["expires_time"] = serde_json::json!("tomorrow morning");
        assert!(matches!(
            parse_forecast(&json, chrono_tz::UTC),
            Err(AppError::MalformedTimestamp(_))
        ));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = "2024-01-02T23:04:00Z".parse::<DateTime<Utc>>().unwrap();
        for s in ["2024-01-02T15:04:00-0800", "2024-01-02T15:04:00-08:00"] {
            let parsed = parse_timestamp(s, chrono_tz::UTC).unwrap();
            assert_eq!(parsed.with_timezone(&Utc), expected, "input {}", s);
        }
    }

    #[test]
    fn test_parse_timestamp_without_offset_rejected() {
        assert!(matches!(
            parse_timestamp("2024-01-02T15:04:00", chrono_tz::UTC),
            Err(AppError::MalformedTimestamp(_))
        ));
    }
}
