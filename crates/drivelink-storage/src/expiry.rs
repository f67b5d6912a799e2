//! Link expiry timestamps.
//!
//! Rows written here always carry an explicit UTC offset. Values that arrive
//! without one (older rows, admin input typed as local wall time) are read as
//! UTC rather than as the server's local time.

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unparsable expiry time: {raw:?}")]
pub struct ExpiryParseError {
    pub raw: String,
}

/// Parse a stored or submitted expiry into an absolute instant.
pub fn parse_expiry(raw: &str) -> Result<OffsetDateTime, ExpiryParseError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ExpiryParseError {
            raw: raw.to_string(),
        });
    }

    if let Ok(parsed) = OffsetDateTime::parse(value, &Rfc3339) {
        return Ok(parsed);
    }
    // `2030-01-01 08:00:00+08:00`
    if let Some((date, rest)) = value.split_once(' ') {
        let joined = format!("{date}T{rest}");
        if let Ok(parsed) = OffsetDateTime::parse(&joined, &Rfc3339) {
            return Ok(parsed);
        }
    }

    parse_naive(value)
        .map(PrimitiveDateTime::assume_utc)
        .ok_or_else(|| ExpiryParseError {
            raw: raw.to_string(),
        })
}

fn parse_naive(value: &str) -> Option<PrimitiveDateTime> {
    PrimitiveDateTime::parse(
        value,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    )
    .ok()
    .or_else(|| {
        PrimitiveDateTime::parse(
            value,
            format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        )
        .ok()
    })
    .or_else(|| {
        PrimitiveDateTime::parse(value, format_description!("[year]-[month]-[day]T[hour]:[minute]"))
            .ok()
    })
    .or_else(|| {
        PrimitiveDateTime::parse(
            value,
            format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
        )
        .ok()
    })
    .or_else(|| {
        PrimitiveDateTime::parse(
            value,
            format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        )
        .ok()
    })
}

/// Render an instant the way it is persisted: RFC 3339 in UTC.
pub fn format_expiry(value: OffsetDateTime) -> Result<String, time::error::Format> {
    value.to_offset(UtcOffset::UTC).format(&Rfc3339)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn offset_and_zulu_forms_agree() {
        let zulu = parse_expiry("2030-01-01T00:00:00Z").unwrap();
        let shifted = parse_expiry("2030-01-01T08:00:00+08:00").unwrap();
        assert_eq!(zulu, shifted);
    }

    #[test]
    fn naive_value_is_utc_not_local() {
        let naive = parse_expiry("2030-01-01T00:00:00").unwrap();
        assert_eq!(naive, datetime!(2030-01-01 00:00:00 UTC));
        assert_eq!(naive.offset(), UtcOffset::UTC);
    }

    #[test]
    fn python_isoformat_with_micros_parses() {
        let parsed = parse_expiry("2030-06-01T12:30:45.123456").unwrap();
        assert_eq!(parsed, datetime!(2030-06-01 12:30:45.123456 UTC));
    }

    #[test]
    fn minute_precision_and_space_separator_parse() {
        assert_eq!(
            parse_expiry("2030-06-01T12:30").unwrap(),
            datetime!(2030-06-01 12:30 UTC)
        );
        assert_eq!(
            parse_expiry("2030-06-01 12:30:00").unwrap(),
            datetime!(2030-06-01 12:30 UTC)
        );
        assert_eq!(
            parse_expiry("2030-06-01 20:30:00+08:00").unwrap(),
            datetime!(2030-06-01 12:30 UTC)
        );
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_expiry("next tuesday").is_err());
        assert!(parse_expiry("").is_err());
        assert!(parse_expiry("2030-13-01T00:00:00Z").is_err());
    }

    #[test]
    fn formatted_value_always_carries_offset() {
        let text = format_expiry(datetime!(2030-01-01 08:00 +08:00)).unwrap();
        assert_eq!(text, "2030-01-01T00:00:00Z");
        assert_eq!(
            parse_expiry(&text).unwrap(),
            datetime!(2030-01-01 00:00 UTC)
        );
    }
}
