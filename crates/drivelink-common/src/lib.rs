use serde::{Deserialize, Serialize};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_EXPIRY_HOURS: u32 = 24;
pub const DEFAULT_MAX_QUOTA_PER_LINK: f64 = 100.0;
pub const DEFAULT_LOGIN_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, thiserror::Error)]
pub enum GlobalConfigError {
    #[error("missing required global config field: {0}")]
    MissingField(&'static str),
    #[error("invalid global config field {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },
}

/// Final, merged global configuration used by the running process.
///
/// Merge order (after DB connection): CLI > ENV > DB, then persist back to DB.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub host: String,
    pub port: u16,
    /// Stored as a hash (not plaintext).
    pub admin_key_hash: String,
    /// Optional outbound proxy for remote login calls.
    pub proxy: Option<String>,
    /// Database DSN used for this process.
    pub dsn: String,
    /// Expiry applied to links created without an explicit expiry time.
    #[serde(default = "default_expiry_hours")]
    pub default_expiry_hours: u32,
    /// Upper bound for `total_quota` on a single link.
    #[serde(default = "default_max_quota_per_link")]
    pub max_quota_per_link: f64,
    /// Timeout for one remote login attempt.
    #[serde(default = "default_login_timeout_secs")]
    pub login_timeout_secs: u64,
}

fn default_expiry_hours() -> u32 {
    DEFAULT_EXPIRY_HOURS
}

fn default_max_quota_per_link() -> f64 {
    DEFAULT_MAX_QUOTA_PER_LINK
}

fn default_login_timeout_secs() -> u64 {
    DEFAULT_LOGIN_TIMEOUT_SECS
}

/// Optional layer used for merging global config.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalConfigPatch {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub admin_key_hash: Option<String>,
    pub proxy: Option<String>,
    pub dsn: Option<String>,
    pub default_expiry_hours: Option<u32>,
    pub max_quota_per_link: Option<f64>,
    pub login_timeout_secs: Option<u64>,
}

impl GlobalConfigPatch {
    pub fn overlay(&mut self, other: GlobalConfigPatch) {
        if other.host.is_some() {
            self.host = other.host;
        }
        if other.port.is_some() {
            self.port = other.port;
        }
        if other.admin_key_hash.is_some() {
            self.admin_key_hash = other.admin_key_hash;
        }
        if other.proxy.is_some() {
            self.proxy = other.proxy;
        }
        if other.dsn.is_some() {
            self.dsn = other.dsn;
        }
        if other.default_expiry_hours.is_some() {
            self.default_expiry_hours = other.default_expiry_hours;
        }
        if other.max_quota_per_link.is_some() {
            self.max_quota_per_link = other.max_quota_per_link;
        }
        if other.login_timeout_secs.is_some() {
            self.login_timeout_secs = other.login_timeout_secs;
        }
    }

    pub fn into_config(self) -> Result<GlobalConfig, GlobalConfigError> {
        let max_quota_per_link = self
            .max_quota_per_link
            .unwrap_or(DEFAULT_MAX_QUOTA_PER_LINK);
        if !max_quota_per_link.is_finite() || max_quota_per_link <= 0.0 {
            return Err(GlobalConfigError::InvalidField {
                field: "max_quota_per_link",
                reason: format!("must be a positive number, got {max_quota_per_link}"),
            });
        }
        let default_expiry_hours = self.default_expiry_hours.unwrap_or(DEFAULT_EXPIRY_HOURS);
        if default_expiry_hours == 0 {
            return Err(GlobalConfigError::InvalidField {
                field: "default_expiry_hours",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(GlobalConfig {
            host: self.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: self.port.unwrap_or(DEFAULT_PORT),
            admin_key_hash: self
                .admin_key_hash
                .ok_or(GlobalConfigError::MissingField("admin_key_hash"))?,
            proxy: self.proxy,
            dsn: self.dsn.ok_or(GlobalConfigError::MissingField("dsn"))?,
            default_expiry_hours,
            max_quota_per_link,
            login_timeout_secs: self
                .login_timeout_secs
                .unwrap_or(DEFAULT_LOGIN_TIMEOUT_SECS),
        })
    }
}

impl From<GlobalConfig> for GlobalConfigPatch {
    fn from(value: GlobalConfig) -> Self {
        Self {
            host: Some(value.host),
            port: Some(value.port),
            admin_key_hash: Some(value.admin_key_hash),
            proxy: value.proxy,
            dsn: Some(value.dsn),
            default_expiry_hours: Some(value.default_expiry_hours),
            max_quota_per_link: Some(value.max_quota_per_link),
            login_timeout_secs: Some(value.login_timeout_secs),
        }
    }
}
