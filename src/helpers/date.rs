//! Date helper functions

use anyhow::{anyhow, Result};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, Locale, NaiveDate, TimeZone};
use chrono_tz::Tz;

use crate::config::SiteConfig;

/// Shown in place of a missing or unreadable publication date
pub const INVALID_DATE: &str = "Invalid Date";

/// Formats publication timestamps in a fixed pattern, locale and timezone
#[derive(Debug, Clone)]
pub struct DateFormatter {
    pattern: String,
    locale: Locale,
    timezone: Tz,
}

impl DateFormatter {
    /// Create a formatter from a date-fns pattern such as `dd MMM yyyy`
    pub fn new(pattern: &str, locale: &str, timezone: &str) -> Result<Self> {
        let locale = Locale::try_from(locale.replace('-', "_").as_str())
            .map_err(|_| anyhow!("Unknown locale: {}", locale))?;
        let timezone = if timezone.is_empty() {
            Tz::UTC
        } else {
            timezone
                .parse::<Tz>()
                .map_err(|e| anyhow!("Unknown timezone {}: {}", timezone, e))?
        };

        let chrono_pattern = date_fns_to_chrono_format(pattern);
        validate_pattern(&chrono_pattern, locale)
            .map_err(|e| anyhow!("Invalid date format {:?}: {}", pattern, e))?;

        Ok(Self {
            pattern: chrono_pattern,
            locale,
            timezone,
        })
    }

    /// Create the formatter configured for a site
    pub fn from_config(config: &SiteConfig) -> Result<Self> {
        Self::new(&config.date_format, &config.locale, &config.timezone)
    }

    /// Format a nullable ISO timestamp
    pub fn format(&self, timestamp: Option<&str>) -> String {
        match timestamp.and_then(parse_timestamp) {
            Some(date) => format_date(&date.with_timezone(&self.timezone), &self.pattern, self.locale),
            None => INVALID_DATE.to_string(),
        }
    }
}

impl Default for DateFormatter {
    fn default() -> Self {
        Self {
            pattern: date_fns_to_chrono_format("dd MMM yyyy"),
            locale: Locale::en_US,
            timezone: Tz::UTC,
        }
    }
}

/// Format a date with an already converted chrono pattern
pub fn format_date<T: TimeZone>(date: &DateTime<T>, pattern: &str, locale: Locale) -> String
where
    T::Offset: std::fmt::Display,
{
    date.format_localized(pattern, locale).to_string()
}

/// Reject chrono patterns that would fail while formatting
fn validate_pattern(pattern: &str, locale: Locale) -> Result<()> {
    if StrftimeItems::new_with_locale(pattern, locale).any(|item| matches!(item, Item::Error)) {
        return Err(anyhow!("unsupported specifier in {:?}", pattern));
    }
    Ok(())
}

/// Parse the timestamp shapes the content source produces
///
/// Accepts RFC 3339 (`2021-03-25T00:00:00Z`), offsets without a colon
/// (`2021-03-25T19:25:28+0000`) and bare dates (`2021-03-25`, taken as UTC
/// midnight).
pub fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(s) {
        return Some(date);
    }
    if let Ok(date) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(date);
    }
    if let Ok(date) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(date);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().fixed_offset())
}

/// Convert date-fns format tokens to chrono format
fn date_fns_to_chrono_format(format: &str) -> String {
    // Longest tokens first within each family
    let replacements = [
        // Year
        ("yyyy", "%Y"),
        ("yy", "%y"),
        // Month
        ("MMMM", "%B"),
        ("MMM", "%b"),
        ("MM", "%m"),
        // Day of month
        ("dd", "%d"),
        // Weekday
        ("EEEE", "%A"),
        ("EEE", "%a"),
        // Time
        ("HH", "%H"),
        ("hh", "%I"),
        ("mm", "%M"),
        ("ss", "%S"),
    ];

    // A literal % must not start a specifier
    let mut result = format.replace('%', "%%");

    for (from, to) in replacements {
        result = result.replace(from, to);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_fixed_locale() {
        let dates = DateFormatter::default();
        assert_eq!(dates.format(Some("2021-03-25T00:00:00Z")), "25 Mar 2021");
    }

    #[test]
    fn test_format_prismic_offset() {
        let dates = DateFormatter::default();
        assert_eq!(dates.format(Some("2021-03-15T19:25:28+0000")), "15 Mar 2021");
    }

    #[test]
    fn test_null_date_renders_invalid() {
        let dates = DateFormatter::default();
        assert_eq!(dates.format(None), INVALID_DATE);
        assert_eq!(dates.format(Some("yesterday")), INVALID_DATE);
    }

    #[test]
    fn test_portuguese_months() {
        let dates = DateFormatter::new("dd MMM yyyy", "pt-BR", "UTC").unwrap();
        let formatted = dates.format(Some("2021-02-10T12:00:00Z"));
        assert_eq!(formatted.to_lowercase(), "10 fev 2021");
    }

    #[test]
    fn test_timezone_shifts_day() {
        let dates = DateFormatter::new("dd MMM yyyy", "en_US", "America/Sao_Paulo").unwrap();
        assert_eq!(dates.format(Some("2021-03-25T01:00:00Z")), "24 Mar 2021");
    }

    #[test]
    fn test_unknown_locale_rejected() {
        assert!(DateFormatter::new("dd MMM yyyy", "xx_YY", "UTC").is_err());
        assert!(DateFormatter::new("dd MMM yyyy", "en_US", "Mars/Olympus").is_err());
    }

    #[test]
    fn test_literal_percent_is_kept() {
        let dates = DateFormatter::new("dd MMM yyyy 100%", "en_US", "UTC").unwrap();
        assert_eq!(dates.format(Some("2021-03-25T00:00:00Z")), "25 Mar 2021 100%");
    }

    #[test]
    fn test_invalid_chrono_pattern_rejected() {
        assert!(validate_pattern("%d %b %Y", Locale::en_US).is_ok());
        assert!(validate_pattern("%d %Q", Locale::en_US).is_err());
        assert!(validate_pattern("%d %b %Y %", Locale::en_US).is_err());
    }

    #[test]
    fn test_date_fns_to_chrono() {
        assert_eq!(date_fns_to_chrono_format("dd MMM yyyy"), "%d %b %Y");
        assert_eq!(date_fns_to_chrono_format("yyyy-MM-dd HH:mm"), "%Y-%m-%d %H:%M");
        assert_eq!(date_fns_to_chrono_format("dd%"), "%d%%");
    }
}
