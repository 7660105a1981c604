//! Parsing for the engine's `<number><unit>` duration grammar
//! (units: `ns,us,ms,s,m,h`, greedily consumed and summed, e.g. `1h30m`).

use std::time::Duration;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

use crate::error::ValidationError;

pub fn parse(input: &str) -> Result<Duration, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::BadType {
            field: "duration".to_string(),
            reason: "empty duration string".to_string(),
        });
    }

    let mut total = Duration::ZERO;
    let mut rest = trimmed;

    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(rest.len());
        if digits_end == 0 {
            return Err(bad_duration(trimmed));
        }
        let number_str = &rest[..digits_end];
        rest = &rest[digits_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(rest.len());
        if unit_end == 0 {
            return Err(bad_duration(trimmed));
        }
        let unit_str = &rest[..unit_end];
        rest = &rest[unit_end..];

        let value: f64 = number_str.parse().map_err(|_| bad_duration(trimmed))?;
        let unit = match unit_str {
            "ns" => Duration::from_nanos(1),
            "us" => Duration::from_micros(1),
            "ms" => Duration::from_millis(1),
            "s" => Duration::from_secs(1),
            "m" => Duration::from_secs(60),
            "h" => Duration::from_secs(3600),
            _ => return Err(bad_duration(trimmed)),
        };
        total += unit.mul_f64(value);
    }

    Ok(total)
}

fn bad_duration(input: &str) -> ValidationError {
    ValidationError::BadType {
        field: "duration".to_string(),
        reason: format!(
            "`{}` is not a valid <number><unit> duration (units: ns,us,ms,s,m,h)",
            input
        ),
    }
}

/// `#[serde(deserialize_with = "duration::deserialize")]` target for
/// plain `std::time::Duration` fields backed by the engine's string grammar.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw).map_err(D::Error::custom)
}

/// Same as [`deserialize`] but for `Option<Duration>` fields that default to `None`.
pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|s| parse(&s).map_err(D::Error::custom)).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_unit() {
        assert_eq!(parse("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse("100ms").unwrap(), Duration::from_millis(100));
    }

    #[test]
    fn parses_composite_duration() {
        assert_eq!(
            parse("1h30m").unwrap(),
            Duration::from_secs(3600) + Duration::from_secs(1800)
        );
    }

    #[test]
    fn rejects_unknown_unit() {
        assert!(parse("5x").is_err());
    }

    #[test]
    fn rejects_empty_string() {
        assert!(parse("").is_err());
    }
}
