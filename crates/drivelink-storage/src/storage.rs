use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use time::OffsetDateTime;

use drivelink_common::GlobalConfig;

use crate::rows::{AccountRow, GlobalConfigRow, LinkRow, ProviderRow};

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("db error: {0}")]
    Db(#[from] sea_orm::DbErr),
    #[error("serde json error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("time format error: {0}")]
    TimeFormat(#[from] time::error::Format),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("no unused link token after {0} attempts")]
    TokenExhausted(usize),
}

#[derive(Debug, Clone)]
pub struct NewLink {
    pub account_id: i64,
    pub total_quota: f64,
    pub remarks: Option<String>,
    /// `None` applies the storage's default link lifetime from now.
    pub expiry_time: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LinkMetaUpdate {
    Updated,
    NotFound,
    /// The requested total would fall below what has already been used.
    BelowUsed { used_quota: f64 },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardCounts {
    pub accounts: u64,
    pub active_links: u64,
    pub total_links: u64,
}

/// Storage is used for:
/// - bootstrap (global config, provider seeding)
/// - admin CRUD over provider templates, accounts and links
/// - the redemption path (link/account reads, quota increments)
///
/// Not-found is reported through `Option`/`bool`, never as an error.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Entity-first schema sync. Enabled by default at bootstrap.
    async fn sync(&self) -> StorageResult<()>;
    async fn health(&self) -> StorageResult<()>;

    async fn load_global_config(&self) -> StorageResult<Option<GlobalConfigRow>>;
    async fn upsert_global_config(&self, config: &GlobalConfig) -> StorageResult<()>;

    // Provider templates
    /// `None` when a template with this name already exists.
    async fn insert_provider(
        &self,
        name: &str,
        config_json: &JsonValue,
        remarks: Option<&str>,
    ) -> StorageResult<Option<i64>>;
    async fn get_provider(&self, name: &str) -> StorageResult<Option<ProviderRow>>;
    async fn list_providers(&self) -> StorageResult<Vec<ProviderRow>>;
    async fn update_provider(
        &self,
        name: &str,
        config_json: Option<&JsonValue>,
        remarks: Option<&str>,
    ) -> StorageResult<bool>;
    async fn delete_provider(&self, name: &str) -> StorageResult<bool>;

    // Accounts
    /// `None` when the named provider template does not exist.
    async fn insert_account(
        &self,
        provider_name: &str,
        login_config: &JsonValue,
        remarks: Option<&str>,
    ) -> StorageResult<Option<i64>>;
    async fn get_account(&self, account_id: i64) -> StorageResult<Option<AccountRow>>;
    async fn list_accounts(&self) -> StorageResult<Vec<AccountRow>>;
    async fn list_accounts_by_provider(&self, provider_name: &str)
    -> StorageResult<Vec<AccountRow>>;
    async fn update_account(
        &self,
        account_id: i64,
        login_config: Option<&JsonValue>,
        remarks: Option<&str>,
    ) -> StorageResult<bool>;
    /// Does not look at referencing links; callers check that first.
    async fn delete_account(&self, account_id: i64) -> StorageResult<bool>;

    // Links
    /// Returns the new link token, or `None` when the account does not exist.
    async fn create_link(&self, input: NewLink) -> StorageResult<Option<String>>;
    async fn get_link(&self, link_uuid: &str) -> StorageResult<Option<LinkRow>>;
    async fn list_links(&self) -> StorageResult<Vec<LinkRow>>;
    async fn list_links_by_account(&self, account_id: i64) -> StorageResult<Vec<LinkRow>>;
    /// Single conditional update: `used_quota += step` only while the result
    /// stays within `total_quota`. `false` when the link is missing or the
    /// bound would be exceeded; nothing is written in either case.
    async fn increment_link_usage(&self, link_uuid: &str, step: f64) -> StorageResult<bool>;
    async fn update_link_meta(
        &self,
        link_uuid: &str,
        total_quota: Option<f64>,
        remarks: Option<&str>,
    ) -> StorageResult<LinkMetaUpdate>;
    async fn delete_link(&self, link_uuid: &str) -> StorageResult<bool>;

    // Reporting
    async fn dashboard_counts(&self, now: OffsetDateTime) -> StorageResult<DashboardCounts>;
    async fn count_accounts_by_provider(&self) -> StorageResult<BTreeMap<String, u64>>;
}
