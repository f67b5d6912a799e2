use drivelink_common::GlobalConfig;
use serde_json::Value as JsonValue;
use time::OffsetDateTime;

use crate::entities;
use crate::expiry::{ExpiryParseError, parse_expiry};

/// Quota consumed by one successful redemption.
pub const REDEMPTION_STEP: f64 = 1.0;

#[derive(Debug, Clone)]
pub struct GlobalConfigRow {
    pub id: i64,
    pub config: GlobalConfig,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRow {
    pub id: i64,
    pub name: String,
    pub config_json: JsonValue,
    pub remarks: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccountRow {
    pub id: i64,
    pub provider_name: String,
    pub login_config: JsonValue,
    pub remarks: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkRow {
    pub id: i64,
    pub account_id: i64,
    pub link_uuid: String,
    pub total_quota: f64,
    pub used_quota: f64,
    pub expiry_time: String,
    pub remarks: Option<String>,
    pub created_at: OffsetDateTime,
}

impl LinkRow {
    pub fn expires_at(&self) -> Result<OffsetDateTime, ExpiryParseError> {
        parse_expiry(&self.expiry_time)
    }

    /// True once another full step no longer fits, so a fractional tail
    /// never admits a redemption the commit would refuse.
    pub fn is_exhausted(&self) -> bool {
        self.used_quota + REDEMPTION_STEP > self.total_quota
    }

    /// Whole redemptions still available.
    pub fn remaining(&self) -> f64 {
        ((self.total_quota - self.used_quota) / REDEMPTION_STEP)
            .floor()
            .max(0.0)
            * REDEMPTION_STEP
    }

    /// Not expired and not exhausted. Unparsable expiry counts as inactive.
    pub fn is_active_at(&self, now: OffsetDateTime) -> bool {
        !self.is_exhausted() && self.expires_at().is_ok_and(|at| now <= at)
    }
}

impl From<entities::providers::Model> for ProviderRow {
    fn from(m: entities::providers::Model) -> Self {
        Self {
            id: m.id,
            name: m.provider_name,
            config_json: m.config_json,
            remarks: m.remarks,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

impl From<entities::accounts::Model> for AccountRow {
    fn from(m: entities::accounts::Model) -> Self {
        Self {
            id: m.id,
            provider_name: m.provider_name,
            login_config: m.login_config,
            remarks: m.remarks,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

impl From<entities::links::Model> for LinkRow {
    fn from(m: entities::links::Model) -> Self {
        Self {
            id: m.id,
            account_id: m.account_id,
            link_uuid: m.link_uuid,
            total_quota: m.total_quota,
            used_quota: m.used_quota,
            expiry_time: m.expiry_time,
            remarks: m.remarks,
            created_at: m.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn link(used_quota: f64, total_quota: f64) -> LinkRow {
        LinkRow {
            id: 1,
            account_id: 1,
            link_uuid: "l".to_string(),
            total_quota,
            used_quota,
            expiry_time: "2031-01-01T00:00:00Z".to_string(),
            remarks: None,
            created_at: datetime!(2030-01-01 00:00 UTC),
        }
    }

    #[test]
    fn fractional_tail_counts_as_exhausted() {
        let now = datetime!(2030-01-01 00:00 UTC);
        let tail = link(1.0, 1.5);
        assert!(tail.is_exhausted());
        assert_eq!(tail.remaining(), 0.0);
        assert!(!tail.is_active_at(now));

        let fresh = link(0.0, 1.5);
        assert!(!fresh.is_exhausted());
        assert_eq!(fresh.remaining(), 1.0);
        assert!(fresh.is_active_at(now));
    }

    #[test]
    fn whole_quotas_count_down_to_zero() {
        assert_eq!(link(1.0, 3.0).remaining(), 2.0);
        assert!(!link(2.0, 3.0).is_exhausted());
        assert!(link(3.0, 3.0).is_exhausted());
        assert_eq!(link(3.0, 3.0).remaining(), 0.0);
    }
}
