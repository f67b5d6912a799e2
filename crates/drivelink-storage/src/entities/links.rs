use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

/// External link. `account_id` is a denormalized reference checked by the
/// application, not by a foreign key.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "external_links")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub account_id: i64,
    #[sea_orm(unique)]
    pub link_uuid: String,
    pub total_quota: f64,
    pub used_quota: f64,
    /// RFC 3339 text. Rows written by this crate always carry an offset.
    pub expiry_time: String,
    pub remarks: Option<String>,
    pub created_at: OffsetDateTime,
}

impl ActiveModelBehavior for ActiveModel {}
