use cadence_core::error::CoreError;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::str::FromStr;

/// Parse an IANA timezone name
pub fn validate_timezone(timezone: &str) -> Result<Tz, CoreError> {
    Tz::from_str(timezone).map_err(|_| CoreError::Validation(format!("Invalid timezone: {}", timezone)))
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

fn common_timezones() -> [&'static str; 16] {
    [
        "UTC",
        "America/New_York",
        "America/Chicago",
        "America/Denver",
        "America/Los_Angeles",
        "America/Sao_Paulo",
        "Europe/London",
        "Europe/Paris",
        "Europe/Berlin",
        "Europe/Madrid",
        "Asia/Tokyo",
        "Asia/Shanghai",
        "Asia/Kolkata",
        "Asia/Dubai",
        "Australia/Sydney",
        "Pacific/Auckland",
    ]
}

/// Suggest similar timezones for invalid input
pub fn suggest_timezone(invalid: &str) -> Vec<&'static str> {
    let invalid_lower = invalid.to_lowercase();

    let mut matches: Vec<_> = common_timezones()
        .into_iter()
        .filter(|tz| {
            let tz_lower = tz.to_lowercase();
            tz_lower.contains(&invalid_lower)
                || invalid_lower.contains(&tz_lower)
                || tz.split('/').any(|part| part.to_lowercase().contains(&invalid_lower))
        })
        .collect();

    matches.truncate(5);
    matches
}

/// Convert user-friendly timezone input to an IANA name
pub fn normalize_timezone_input(input: &str) -> Result<String, CoreError> {
    if validate_timezone(input).is_ok() {
        return Ok(input.to_string());
    }

    let normalized = match input.to_lowercase().as_str() {
        "est" | "eastern" => "America/New_York",
        "cst" | "central" => "America/Chicago",
        "mst" | "mountain" => "America/Denver",
        "pst" | "pacific" => "America/Los_Angeles",
        "gmt" | "utc" => "UTC",
        "bst" | "london" => "Europe/London",
        "cet" | "paris" => "Europe/Paris",
        "jst" | "tokyo" => "Asia/Tokyo",
        _ => {
            let suggestions = suggest_timezone(input);
            return Err(CoreError::Validation(if suggestions.is_empty() {
                format!(
                    "Unknown timezone '{}'. Use standard IANA names like 'America/New_York'",
                    input
                )
            } else {
                format!("Unknown timezone '{}'. Did you mean: {}?", input, suggestions.join(", "))
            }));
        }
    };

    validate_timezone(normalized)?;
    Ok(normalized.to_string())
}

/// Render a UTC instant in `tz`, with the zone abbreviation
pub fn format_in_zone(datetime: DateTime<Utc>, tz: Tz) -> String {
    datetime.with_timezone(&tz).format("%Y-%m-%d %H:%M %Z").to_string()
}
