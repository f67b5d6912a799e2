use std::collections::BTreeMap;

use sea_orm::sea_query::{Expr, Index, OnConflict};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection,
    DbErr, EntityTrait, FromQueryResult, PaginatorTrait, QueryOrder, QuerySelect, Schema, SqlErr,
    TransactionTrait,
};
use sea_orm::{ColumnTrait, ExprTrait, QueryFilter};
use serde_json::Value as JsonValue;
use time::{Duration, OffsetDateTime};

use drivelink_common::{DEFAULT_EXPIRY_HOURS, GlobalConfig};

use crate::entities;
use crate::expiry::format_expiry;
use crate::rows::{AccountRow, GlobalConfigRow, LinkRow, ProviderRow};
use crate::storage::{
    DashboardCounts, LinkMetaUpdate, NewLink, Storage, StorageError, StorageResult,
};
use crate::token::{pick_unused_token, random_link_token};

#[derive(Debug, FromQueryResult)]
struct ProviderCountRow {
    provider_name: String,
    count: i64,
}

#[derive(Clone)]
pub struct SeaOrmStorage {
    db: DatabaseConnection,
    link_ttl: Duration,
}

impl SeaOrmStorage {
    pub async fn connect(dsn: &str) -> StorageResult<Self> {
        let db = Database::connect(dsn).await?;
        if db.get_database_backend() == DatabaseBackend::Sqlite {
            db.execute_unprepared("PRAGMA foreign_keys = ON").await?;
        }
        Ok(Self {
            db,
            link_ttl: Duration::hours(i64::from(DEFAULT_EXPIRY_HOURS)),
        })
    }

    /// Lifetime given to links created without an explicit expiry.
    pub fn with_link_ttl(mut self, ttl: Duration) -> Self {
        self.link_ttl = ttl;
        self
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    pub async fn provider_names(&self) -> StorageResult<Vec<String>> {
        let rows = entities::Providers::find()
            .order_by_asc(entities::providers::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(|m| m.provider_name).collect())
    }

    async fn ensure_indexes(&self) -> StorageResult<()> {
        use entities::accounts::Column as AccountColumn;
        use entities::links::Column as LinkColumn;

        let statements = vec![
            Index::create()
                .name("idx_external_links_account_id")
                .table(entities::links::Entity)
                .col(LinkColumn::AccountId)
                .if_not_exists()
                .to_owned(),
            Index::create()
                .name("idx_user_drives_provider_name")
                .table(entities::accounts::Entity)
                .col(AccountColumn::ProviderName)
                .if_not_exists()
                .to_owned(),
        ];

        for statement in statements {
            self.db.execute(&statement).await?;
        }
        Ok(())
    }

    async fn link_token_taken(db: &DatabaseConnection, token: String) -> StorageResult<bool> {
        let hits = entities::Links::find()
            .filter(entities::links::Column::LinkUuid.eq(token))
            .count(db)
            .await?;
        Ok(hits > 0)
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn check_quota(total_quota: f64) -> StorageResult<()> {
    if !total_quota.is_finite() || total_quota < 0.0 {
        return Err(StorageError::InvalidInput(format!(
            "total_quota must be a non-negative number, got {total_quota}"
        )));
    }
    Ok(())
}

#[async_trait::async_trait]
impl Storage for SeaOrmStorage {
    async fn sync(&self) -> StorageResult<()> {
        Schema::new(self.db.get_database_backend())
            .builder()
            .register(entities::GlobalConfig)
            .register(entities::Providers)
            .register(entities::Accounts)
            .register(entities::Links)
            .sync(&self.db)
            .await?;
        self.ensure_indexes().await?;
        Ok(())
    }

    async fn health(&self) -> StorageResult<()> {
        entities::GlobalConfig::find()
            .order_by_asc(entities::global_config::Column::Id)
            .one(&self.db)
            .await?;
        Ok(())
    }

    async fn load_global_config(&self) -> StorageResult<Option<GlobalConfigRow>> {
        use entities::global_config::Column;
        let row = entities::GlobalConfig::find()
            .order_by_asc(Column::Id)
            .one(&self.db)
            .await?;
        let Some(model) = row else {
            return Ok(None);
        };
        let config: GlobalConfig = serde_json::from_value(model.config_json)?;
        Ok(Some(GlobalConfigRow {
            id: model.id,
            config,
            updated_at: model.updated_at,
        }))
    }

    async fn upsert_global_config(&self, config: &GlobalConfig) -> StorageResult<()> {
        use entities::global_config::Column;

        let active = entities::global_config::ActiveModel {
            id: ActiveValue::Set(1),
            config_json: ActiveValue::Set(serde_json::to_value(config)?),
            updated_at: ActiveValue::Set(OffsetDateTime::now_utc()),
        };
        entities::GlobalConfig::insert(active)
            .on_conflict(
                OnConflict::column(Column::Id)
                    .update_columns([Column::ConfigJson, Column::UpdatedAt])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn insert_provider(
        &self,
        name: &str,
        config_json: &JsonValue,
        remarks: Option<&str>,
    ) -> StorageResult<Option<i64>> {
        use entities::providers::{ActiveModel as ProviderActive, Column};

        let existing = entities::Providers::find()
            .filter(Column::ProviderName.eq(name))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            return Ok(None);
        }

        let now = OffsetDateTime::now_utc();
        let active = ProviderActive {
            id: ActiveValue::NotSet,
            provider_name: ActiveValue::Set(name.to_string()),
            config_json: ActiveValue::Set(config_json.clone()),
            remarks: ActiveValue::Set(remarks.map(str::to_string)),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        };
        match entities::Providers::insert(active).exec(&self.db).await {
            Ok(inserted) => Ok(Some(inserted.last_insert_id)),
            Err(err) if is_unique_violation(&err) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn get_provider(&self, name: &str) -> StorageResult<Option<ProviderRow>> {
        let row = entities::Providers::find()
            .filter(entities::providers::Column::ProviderName.eq(name))
            .one(&self.db)
            .await?;
        Ok(row.map(ProviderRow::from))
    }

    async fn list_providers(&self) -> StorageResult<Vec<ProviderRow>> {
        let rows = entities::Providers::find()
            .order_by_asc(entities::providers::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(ProviderRow::from).collect())
    }

    async fn update_provider(
        &self,
        name: &str,
        config_json: Option<&JsonValue>,
        remarks: Option<&str>,
    ) -> StorageResult<bool> {
        use entities::providers::{ActiveModel as ProviderActive, Column};

        let existing = entities::Providers::find()
            .filter(Column::ProviderName.eq(name))
            .one(&self.db)
            .await?;
        let Some(model) = existing else {
            return Ok(false);
        };

        let mut active: ProviderActive = model.into();
        if let Some(config_json) = config_json {
            active.config_json = ActiveValue::Set(config_json.clone());
        }
        if let Some(remarks) = remarks {
            active.remarks = ActiveValue::Set(Some(remarks.to_string()));
        }
        active.updated_at = ActiveValue::Set(OffsetDateTime::now_utc());
        active.update(&self.db).await?;
        Ok(true)
    }

    async fn delete_provider(&self, name: &str) -> StorageResult<bool> {
        let result = entities::Providers::delete_many()
            .filter(entities::providers::Column::ProviderName.eq(name))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn insert_account(
        &self,
        provider_name: &str,
        login_config: &JsonValue,
        remarks: Option<&str>,
    ) -> StorageResult<Option<i64>> {
        if self.get_provider(provider_name).await?.is_none() {
            return Ok(None);
        }

        let now = OffsetDateTime::now_utc();
        let active = entities::accounts::ActiveModel {
            id: ActiveValue::NotSet,
            provider_name: ActiveValue::Set(provider_name.to_string()),
            login_config: ActiveValue::Set(login_config.clone()),
            remarks: ActiveValue::Set(remarks.map(str::to_string)),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        };
        let inserted = entities::Accounts::insert(active).exec(&self.db).await?;
        Ok(Some(inserted.last_insert_id))
    }

    async fn get_account(&self, account_id: i64) -> StorageResult<Option<AccountRow>> {
        let row = entities::Accounts::find_by_id(account_id)
            .one(&self.db)
            .await?;
        Ok(row.map(AccountRow::from))
    }

    async fn list_accounts(&self) -> StorageResult<Vec<AccountRow>> {
        let rows = entities::Accounts::find()
            .order_by_asc(entities::accounts::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(AccountRow::from).collect())
    }

    async fn list_accounts_by_provider(
        &self,
        provider_name: &str,
    ) -> StorageResult<Vec<AccountRow>> {
        use entities::accounts::Column;
        let rows = entities::Accounts::find()
            .filter(Column::ProviderName.eq(provider_name))
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(AccountRow::from).collect())
    }

    async fn update_account(
        &self,
        account_id: i64,
        login_config: Option<&JsonValue>,
        remarks: Option<&str>,
    ) -> StorageResult<bool> {
        let existing = entities::Accounts::find_by_id(account_id)
            .one(&self.db)
            .await?;
        let Some(model) = existing else {
            return Ok(false);
        };

        let mut active: entities::accounts::ActiveModel = model.into();
        if let Some(login_config) = login_config {
            active.login_config = ActiveValue::Set(login_config.clone());
        }
        if let Some(remarks) = remarks {
            active.remarks = ActiveValue::Set(Some(remarks.to_string()));
        }
        active.updated_at = ActiveValue::Set(OffsetDateTime::now_utc());
        active.update(&self.db).await?;
        Ok(true)
    }

    async fn delete_account(&self, account_id: i64) -> StorageResult<bool> {
        let result = entities::Accounts::delete_by_id(account_id)
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn create_link(&self, input: NewLink) -> StorageResult<Option<String>> {
        check_quota(input.total_quota)?;
        if self.get_account(input.account_id).await?.is_none() {
            return Ok(None);
        }

        let now = OffsetDateTime::now_utc();
        let expiry = input.expiry_time.unwrap_or(now + self.link_ttl);
        let db = &self.db;
        let token = pick_unused_token(random_link_token, |candidate| {
            Self::link_token_taken(db, candidate)
        })
        .await?;

        let active = entities::links::ActiveModel {
            id: ActiveValue::NotSet,
            account_id: ActiveValue::Set(input.account_id),
            link_uuid: ActiveValue::Set(token.clone()),
            total_quota: ActiveValue::Set(input.total_quota),
            used_quota: ActiveValue::Set(0.0),
            expiry_time: ActiveValue::Set(format_expiry(expiry)?),
            remarks: ActiveValue::Set(input.remarks),
            created_at: ActiveValue::Set(now),
        };
        entities::Links::insert(active).exec(&self.db).await?;
        tracing::debug!(account_id = input.account_id, token = %token, "link created");
        Ok(Some(token))
    }

    async fn get_link(&self, link_uuid: &str) -> StorageResult<Option<LinkRow>> {
        let row = entities::Links::find()
            .filter(entities::links::Column::LinkUuid.eq(link_uuid))
            .one(&self.db)
            .await?;
        Ok(row.map(LinkRow::from))
    }

    async fn list_links(&self) -> StorageResult<Vec<LinkRow>> {
        let rows = entities::Links::find()
            .order_by_desc(entities::links::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(LinkRow::from).collect())
    }

    async fn list_links_by_account(&self, account_id: i64) -> StorageResult<Vec<LinkRow>> {
        use entities::links::Column;
        let rows = entities::Links::find()
            .filter(Column::AccountId.eq(account_id))
            .order_by_desc(Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(LinkRow::from).collect())
    }

    async fn increment_link_usage(&self, link_uuid: &str, step: f64) -> StorageResult<bool> {
        use entities::links::Column;

        if !step.is_finite() || step <= 0.0 {
            return Err(StorageError::InvalidInput(format!(
                "usage step must be positive, got {step}"
            )));
        }
        let result = entities::Links::update_many()
            .col_expr(Column::UsedQuota, Expr::col(Column::UsedQuota).add(step))
            .filter(Column::LinkUuid.eq(link_uuid))
            .filter(
                Expr::col(Column::UsedQuota)
                    .add(step)
                    .lte(Expr::col(Column::TotalQuota)),
            )
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected == 1)
    }

    async fn update_link_meta(
        &self,
        link_uuid: &str,
        total_quota: Option<f64>,
        remarks: Option<&str>,
    ) -> StorageResult<LinkMetaUpdate> {
        use entities::links::Column;

        let Some(current) = self.get_link(link_uuid).await? else {
            return Ok(LinkMetaUpdate::NotFound);
        };
        if let Some(total) = total_quota {
            check_quota(total)?;
            if total < current.used_quota {
                return Ok(LinkMetaUpdate::BelowUsed {
                    used_quota: current.used_quota,
                });
            }
        }
        if total_quota.is_none() && remarks.is_none() {
            return Ok(LinkMetaUpdate::Updated);
        }

        let mut update = entities::Links::update_many().filter(Column::LinkUuid.eq(link_uuid));
        if let Some(total) = total_quota {
            // Redemptions may land between the read above and this write.
            update = update
                .col_expr(Column::TotalQuota, Expr::value(total))
                .filter(Column::UsedQuota.lte(total));
        }
        if let Some(remarks) = remarks {
            update = update.col_expr(Column::Remarks, Expr::value(remarks.to_string()));
        }
        let result = update.exec(&self.db).await?;
        if result.rows_affected > 0 {
            return Ok(LinkMetaUpdate::Updated);
        }

        match self.get_link(link_uuid).await? {
            Some(latest) => Ok(LinkMetaUpdate::BelowUsed {
                used_quota: latest.used_quota,
            }),
            None => Ok(LinkMetaUpdate::NotFound),
        }
    }

    async fn delete_link(&self, link_uuid: &str) -> StorageResult<bool> {
        let result = entities::Links::delete_many()
            .filter(entities::links::Column::LinkUuid.eq(link_uuid))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn dashboard_counts(&self, now: OffsetDateTime) -> StorageResult<DashboardCounts> {
        use entities::links::Column;

        // One transaction so the three reads see the same rows.
        let txn = self.db.begin().await?;
        let accounts = entities::Accounts::find().count(&txn).await?;
        let total_links = entities::Links::find().count(&txn).await?;
        // Expiry is stored as text, so the time bound is checked after fetching.
        let candidates = entities::Links::find()
            .filter(Expr::col(Column::UsedQuota).lt(Expr::col(Column::TotalQuota)))
            .all(&txn)
            .await?;
        txn.commit().await?;
        let active_links = candidates
            .into_iter()
            .map(LinkRow::from)
            .filter(|link| link.is_active_at(now))
            .count() as u64;

        Ok(DashboardCounts {
            accounts,
            active_links,
            total_links,
        })
    }

    async fn count_accounts_by_provider(&self) -> StorageResult<BTreeMap<String, u64>> {
        use entities::accounts::Column;

        let rows = entities::Accounts::find()
            .select_only()
            .column(Column::ProviderName)
            .column_as(Expr::col(Column::Id).count(), "count")
            .group_by(Column::ProviderName)
            .into_model::<ProviderCountRow>()
            .all(&self.db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| (row.provider_name, u64::try_from(row.count).unwrap_or(0)))
            .collect())
    }
}
