use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

/// One user's drive credentials bound to a provider template by name.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "user_drives")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub provider_name: String,
    pub login_config: Json,
    pub remarks: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl ActiveModelBehavior for ActiveModel {}
