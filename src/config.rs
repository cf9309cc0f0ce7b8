use chrono_tz::Tz;

use crate::errors::AppError;

const DEFAULT_TZ: &str = "UTC";
const DEFAULT_CHECK_INTERVAL_SECS: u64 = 3600;
/// Longest accepted check interval: one year.
const MAX_CHECK_INTERVAL_SECS: u64 = 365 * 24 * 3600;
const DEFAULT_MESSAGE_HEADER: &str = "Avalanche Forecast";
const DEFAULT_FULL_FORECAST_URL: &str = "http://avalanche.org";
const DEFAULT_DB_LOCATION: &str = "slacker_avycast.db";
const DEFAULT_FORECAST_API_URL: &str = "https://api.avalanche.org/v2/public/product";

/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Zone that published/expires times are rendered in.
    pub display_tz: Tz,
    pub webhook_url: String,
    pub forecast_center_id: String,
    pub forecast_zone_id: String,
    pub check_interval_secs: u64,
    pub message_header: String,
    pub full_forecast_url: String,
    pub db_location: String,
    /// Base URL of the avalanche.org product endpoint.
    pub forecast_api_url: String,
    /// Port for the status endpoint; `None` disables it.
    pub status_port: Option<u16>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key → value source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| AppError::Config(format!("{} must be set", key)))
        };

        let tz_name = get("TZ").unwrap_or_else(|| DEFAULT_TZ.to_string());
        let display_tz: Tz = tz_name
            .parse()
            .map_err(|e| AppError::Config(format!("TZ '{}' is not a known timezone: {}", tz_name, e)))?;

        let check_interval_secs = match get("FORECAST_CHECK_INTERVAL") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if (1..=MAX_CHECK_INTERVAL_SECS).contains(&secs) => secs,
                _ => {
                    return Err(AppError::Config(format!(
                        "FORECAST_CHECK_INTERVAL must be between 1 and {} seconds, got '{}'",
                        MAX_CHECK_INTERVAL_SECS, raw
                    )))
                }
            },
            None => DEFAULT_CHECK_INTERVAL_SECS,
        };

        let status_port = get("STATUS_PORT")
            .map(|raw| {
                raw.trim()
                    .parse::<u16>()
                    .map_err(|_| AppError::Config(format!("STATUS_PORT must be a valid u16, got '{}'", raw)))
            })
            .transpose()?;

        Ok(Self {
            display_tz,
            webhook_url: required("WEBHOOK_URL")?,
            forecast_center_id: required("FORECAST_CENTER_ID")?,
            forecast_zone_id: required("FORECAST_ZONE_ID")?,
            check_interval_secs,
            message_header: get("SLACK_MESSAGE_HEADER")
                .unwrap_or_else(|| DEFAULT_MESSAGE_HEADER.to_string()),
            full_forecast_url: get("FULL_FORECAST_URL")
                .unwrap_or_else(|| DEFAULT_FULL_FORECAST_URL.to_string()),
            db_location: get("DB_LOCATION").unwrap_or_else(|| DEFAULT_DB_LOCATION.to_string()),
            forecast_api_url: get("FORECAST_API_URL")
                .unwrap_or_else(|| DEFAULT_FORECAST_API_URL.to_string()),
            status_port,
        })
    }
}
