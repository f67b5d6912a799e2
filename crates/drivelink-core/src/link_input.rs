use time::OffsetDateTime;

use drivelink_storage::parse_expiry;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LinkInputError {
    #[error("外链使用次数必须大于0")]
    QuotaNotPositive,
    #[error("外链使用次数必须是整数")]
    QuotaNotWhole,
    #[error("外链使用次数不能超过{max}")]
    QuotaAboveMax { max: f64 },
    #[error("无效的过期时间格式")]
    BadExpiry,
}

pub fn check_total_quota(total_quota: f64, max_quota: f64) -> Result<(), LinkInputError> {
    if !total_quota.is_finite() || total_quota <= 0.0 {
        return Err(LinkInputError::QuotaNotPositive);
    }
    if total_quota.fract() != 0.0 {
        return Err(LinkInputError::QuotaNotWhole);
    }
    if total_quota > max_quota {
        return Err(LinkInputError::QuotaAboveMax { max: max_quota });
    }
    Ok(())
}

/// Blank input means "use the default lifetime".
pub fn parse_expiry_input(raw: Option<&str>) -> Result<Option<OffsetDateTime>, LinkInputError> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => parse_expiry(value)
            .map(Some)
            .map_err(|_| LinkInputError::BadExpiry),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn quota_must_be_positive_and_bounded() {
        assert_eq!(check_total_quota(0.0, 100.0), Err(LinkInputError::QuotaNotPositive));
        assert_eq!(check_total_quota(f64::NAN, 100.0), Err(LinkInputError::QuotaNotPositive));
        assert_eq!(
            check_total_quota(101.0, 100.0),
            Err(LinkInputError::QuotaAboveMax { max: 100.0 })
        );
        assert!(check_total_quota(100.0, 100.0).is_ok());
        assert_eq!(check_total_quota(0.5, 100.0), Err(LinkInputError::QuotaNotWhole));
        assert_eq!(check_total_quota(2.5, 100.0), Err(LinkInputError::QuotaNotWhole));
    }

    #[test]
    fn expiry_input_accepts_common_forms() {
        assert_eq!(parse_expiry_input(None), Ok(None));
        assert_eq!(parse_expiry_input(Some("  ")), Ok(None));
        assert_eq!(
            parse_expiry_input(Some("2030-01-01T00:00:00Z")),
            Ok(Some(datetime!(2030-01-01 00:00 UTC)))
        );
        assert_eq!(
            parse_expiry_input(Some("2030-01-01T00:00")),
            Ok(Some(datetime!(2030-01-01 00:00 UTC)))
        );
        assert_eq!(parse_expiry_input(Some("tomorrow")), Err(LinkInputError::BadExpiry));
    }

    #[test]
    fn cap_is_rendered_in_message() {
        let err = check_total_quota(500.0, 100.0).unwrap_err();
        assert_eq!(err.to_string(), "外链使用次数不能超过100");
    }
}
