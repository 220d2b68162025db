use cadence_core::error::CoreError;
use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_english::{parse_date_string, Dialect};
use chrono_tz::Tz;

const NAIVE_FORMATS: [&str; 4] = ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parses a CLI time argument.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM` read in `tz`, or natural language
/// such as "tomorrow 9am" relative to `now`.
pub fn parse_datetime(input: &str, tz: Tz, now: DateTime<Utc>) -> Result<DateTime<Utc>, CoreError> {
    let input = input.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(input) {
        return Ok(parsed.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return match tz.from_local_datetime(&naive) {
                LocalResult::Single(local) => Ok(local.with_timezone(&Utc)),
                // repeated wall-clock hour: take the first pass
                LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
                LocalResult::None => Err(CoreError::Validation(format!(
                    "'{}' does not exist in {} (skipped by a clock change)",
                    input, tz
                ))),
            };
        }
    }

    parse_date_string(input, now.with_timezone(&tz), Dialect::Us)
        .map(|local| local.with_timezone(&Utc))
        .map_err(|e| CoreError::Validation(format!("Failed to parse time '{}': {}", input, e)))
}
