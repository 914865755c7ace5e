//! CLI command implementations.

pub mod auth;
pub mod send;

use std::time::Duration;

/// Parse a duration such as `3600`, `90s`, `60m` or `1h`.
///
/// A bare number is seconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let (digits, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
        Some(i) => s.split_at(i),
        None => (s, "s"),
    };

    let value: u64 = digits
        .parse()
        .map_err(|_| format!("invalid duration {:?}: expected e.g. 3600, 90s, 60m or 1h", s))?;

    let secs = match unit {
        "s" => value,
        "m" => value.saturating_mul(60),
        "h" => value.saturating_mul(60 * 60),
        other => return Err(format!("invalid duration unit {:?}: use s, m or h", other)),
    };

    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("3600"), Ok(Duration::from_secs(3600)));
        assert_eq!(parse_duration("90s"), Ok(Duration::from_secs(90)));
        assert_eq!(parse_duration("60m"), Ok(Duration::from_secs(3600)));
        assert_eq!(parse_duration("2h"), Ok(Duration::from_secs(7200)));
    }

    #[test]
    fn test_parse_duration_errors() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("m").is_err());
        assert!(parse_duration("10d").is_err());
        assert!(parse_duration("1h30m").is_err());
    }
}
