use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rota_core::error::CoreError;
use std::str::FromStr;

/// Validate IANA timezone name
pub fn validate_timezone(timezone: &str) -> Result<Tz, CoreError> {
    Tz::from_str(timezone).map_err(|_| {
        CoreError::InvalidTimezone(format!(
            "'{}'. Use IANA timezone names like 'America/New_York'",
            timezone
        ))
    })
}

/// Detect system timezone
pub fn detect_system_timezone() -> String {
    if let Ok(tz) = std::env::var("TZ") {
        if !tz.is_empty() && validate_timezone(&tz).is_ok() {
            return tz;
        }
    }

    if let Ok(tz) = iana_time_zone::get_timezone() {
        if validate_timezone(&tz).is_ok() {
            return tz;
        }
    }

    "UTC".to_string()
}

/// The configured display timezone, or the system one when none is set.
pub fn display_timezone(configured: Option<&str>) -> Result<Tz, CoreError> {
    match configured {
        Some(name) => validate_timezone(name),
        None => validate_timezone(&detect_system_timezone()),
    }
}

/// Format an instant in `tz` with its abbreviation, e.g. `2025-09-12 09:00 (CEST)`.
pub fn format_in_timezone(datetime: DateTime<Utc>, tz: Tz) -> String {
    let local = datetime.with_timezone(&tz);
    format!("{} ({})", local.format("%Y-%m-%d %H:%M"), local.format("%Z"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_validate_timezone() {
        assert!(validate_timezone("America/New_York").is_ok());
        assert!(validate_timezone("UTC").is_ok());
        assert!(matches!(
            validate_timezone("Mars/Olympus_Mons"),
            Err(CoreError::InvalidTimezone(_))
        ));
    }

    #[test]
    fn test_configured_timezone_wins() {
        assert_eq!(display_timezone(Some("Asia/Tokyo")).unwrap(), Tz::Asia__Tokyo);
        assert!(display_timezone(Some("nowhere")).is_err());
    }

    #[test]
    fn test_detected_timezone_is_valid() {
        assert!(validate_timezone(&detect_system_timezone()).is_ok());
    }

    #[test]
    fn test_format_in_timezone() {
        let instant = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
        assert_eq!(format_in_timezone(instant, Tz::UTC), "2025-01-15 12:00 (UTC)");
        assert_eq!(
            format_in_timezone(instant, Tz::America__New_York),
            "2025-01-15 07:00 (EST)"
        );
    }
}
