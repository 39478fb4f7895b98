//! Scheduling and time parsing utilities
//!
//! Turns the `when` string of a job into an absolute UTC instant.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use rand::Rng;

use crate::error::{OmnicastError, Result};

const MIN_RANDOM_SECONDS: i64 = 30;
const MAX_RANDOM_SECONDS: i64 = 30 * 24 * 3600; // 30 days

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// Parse a job's scheduled time
///
/// Accepts, in order:
/// - RFC 3339 timestamps: "2025-11-20T15:00:00Z", "2025-11-20T15:00:00.000+02:00"
/// - Naive timestamps, read as UTC: "2025-11-20 15:00", "2025-11-20T15:00:00"
/// - Relative durations: "1h", "30m", "2d"
/// - Natural language: "tomorrow", "next monday 10am"
/// - Random intervals: "random:10m-20m", counted from `last_scheduled` if given
///
/// # Errors
///
/// Returns `Validation` if the input matches none of the formats.
pub fn parse_when(input: &str, last_scheduled: Option<DateTime<Utc>>) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return Err(OmnicastError::Validation(
            "Schedule string cannot be empty".to_string(),
        ));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(naive.and_utc());
        }
    }

    parse_schedule(input, last_scheduled)
}

/// Parse a relative, natural-language or random schedule string
pub fn parse_schedule(input: &str, last_scheduled: Option<DateTime<Utc>>) -> Result<DateTime<Utc>> {
    if input.is_empty() {
        return Err(OmnicastError::Validation(
            "Schedule string cannot be empty".to_string(),
        ));
    }

    if input.starts_with("random:") {
        return parse_random_schedule(input, last_scheduled);
    }

    if let Ok(duration) = parse_duration(input) {
        return Ok(Utc::now() + duration);
    }

    if let Ok(dt) = parse_natural_language(input) {
        return Ok(dt);
    }

    Err(OmnicastError::Validation(format!(
        "Could not parse schedule string: {}",
        input
    )))
}

fn parse_duration(input: &str) -> Result<Duration> {
    let std_duration = humantime::parse_duration(input)
        .map_err(|_| OmnicastError::Validation(format!("Could not parse duration: {}", input)))?;

    i64::try_from(std_duration.as_secs())
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| OmnicastError::Validation("Duration out of range".to_string()))
}

fn parse_natural_language(input: &str) -> Result<DateTime<Utc>> {
    chrono_english::parse_date_string(input, Utc::now(), chrono_english::Dialect::Us)
        .map_err(|e| OmnicastError::Validation(format!("Could not parse time: {}", e)))
}

/// "random:MIN-MAX"
fn parse_random_schedule(
    input: &str,
    last_scheduled: Option<DateTime<Utc>>,
) -> Result<DateTime<Utc>> {
    let range = input
        .strip_prefix("random:")
        .ok_or_else(|| OmnicastError::Validation("Invalid random format".to_string()))?;

    let (min_str, max_str) = range
        .split_once('-')
        .filter(|(_, max)| !max.contains('-'))
        .ok_or_else(|| OmnicastError::Validation("Random format must be MIN-MAX".to_string()))?;

    let min = parse_duration(min_str.trim())?;
    let max = parse_duration(max_str.trim())?;
    validate_random_range(min, max)?;

    let base = last_scheduled.unwrap_or_else(Utc::now);
    let secs = rand::thread_rng().gen_range(min.num_seconds()..=max.num_seconds());

    Ok(base + Duration::try_seconds(secs).unwrap_or(min))
}

fn validate_random_range(min: Duration, max: Duration) -> Result<()> {
    let min_secs = min.num_seconds();
    let max_secs = max.num_seconds();

    if min_secs < MIN_RANDOM_SECONDS {
        return Err(OmnicastError::Validation(format!(
            "Minimum random interval must be at least {} seconds",
            MIN_RANDOM_SECONDS
        )));
    }
    if max_secs > MAX_RANDOM_SECONDS {
        return Err(OmnicastError::Validation(format!(
            "Maximum random interval must be less than {} days",
            MAX_RANDOM_SECONDS / (24 * 3600)
        )));
    }
    if min_secs >= max_secs {
        return Err(OmnicastError::Validation(
            "Minimum must be less than maximum".to_string(),
        ));
    }

    Ok(())
}
