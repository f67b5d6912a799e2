use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};

use drivelink_core::{AppState, DeleteOutcome, delete_account_guarded};
use drivelink_provider_core::ProviderError;
use drivelink_router::{JsonBody, envelope};
use drivelink_storage::AccountRow;

use crate::ts;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AccountFilter {
    #[serde(default)]
    provider_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateAccount {
    #[serde(default)]
    provider_name: String,
    #[serde(default)]
    login_config: Option<JsonValue>,
    #[serde(default)]
    remarks: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateAccount {
    #[serde(default)]
    login_config: Option<JsonValue>,
    #[serde(default)]
    remarks: Option<String>,
}

fn account_json(row: &AccountRow) -> JsonValue {
    json!({
        "id": row.id,
        "provider_name": row.provider_name,
        "login_config": row.login_config,
        "remarks": row.remarks,
        "created_at": ts(row.created_at),
        "updated_at": ts(row.updated_at),
    })
}

fn config_error_message(err: &ProviderError) -> String {
    match err {
        ProviderError::MissingFields(fields) => format!("登录配置缺少字段: {}", fields.join(", ")),
        ProviderError::Unsupported(kind) => format!("不支持的网盘登录类型: {kind}"),
        other => format!("登录配置无效: {other}"),
    }
}

/// Check `login_config` against the implementation the account's template selects.
async fn check_login_config(
    app: &AppState,
    provider_name: &str,
    login_config: &JsonValue,
) -> Result<(), Response> {
    let template = match app.storage.get_provider(provider_name).await {
        Ok(Some(row)) => row.config_json,
        Ok(None) => {
            return Err(envelope::fail(
                StatusCode::BAD_REQUEST,
                "指定的网盘类型不存在",
            ));
        }
        Err(err) => return Err(envelope::internal(err, "获取网盘类型失败")),
    };
    app.providers
        .for_template(&template)
        .and_then(|provider| provider.validate(login_config))
        .map_err(|err| envelope::fail(StatusCode::BAD_REQUEST, config_error_message(&err)))
}

pub(crate) async fn list_accounts(
    State(app): State<Arc<AppState>>,
    Query(filter): Query<AccountFilter>,
) -> Response {
    let provider = filter
        .provider_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());
    let rows = match provider {
        Some(name) => app.storage.list_accounts_by_provider(name).await,
        None => app.storage.list_accounts().await,
    };
    match rows {
        Ok(rows) => envelope::ok(JsonValue::Array(rows.iter().map(account_json).collect())),
        Err(err) => envelope::internal(err, "获取网盘账号失败"),
    }
}

pub(crate) async fn create_account(
    State(app): State<Arc<AppState>>,
    JsonBody(body): JsonBody<CreateAccount>,
) -> Response {
    let provider_name = body.provider_name.trim();
    if provider_name.is_empty() {
        return envelope::fail(StatusCode::BAD_REQUEST, "缺少必要的provider_name参数");
    }
    let login_config = body.login_config.unwrap_or_else(|| json!({}));
    if let Err(response) = check_login_config(&app, provider_name, &login_config).await {
        return response;
    }

    match app
        .storage
        .insert_account(provider_name, &login_config, body.remarks.as_deref())
        .await
    {
        Ok(Some(id)) => {
            tracing::info!(account_id = id, provider = provider_name, "account created");
            envelope::ok_with_message(json!({ "id": id }), "网盘账号添加成功")
        }
        // Template vanished between the check and the insert.
        Ok(None) => envelope::fail(StatusCode::BAD_REQUEST, "指定的网盘类型不存在"),
        Err(err) => envelope::internal(err, "网盘账号添加失败"),
    }
}

pub(crate) async fn get_account(
    State(app): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Response {
    match app.storage.get_account(id).await {
        Ok(Some(row)) => envelope::ok(account_json(&row)),
        Ok(None) => envelope::fail(StatusCode::NOT_FOUND, "未找到指定的网盘账号"),
        Err(err) => envelope::internal(err, "获取网盘账号失败"),
    }
}

pub(crate) async fn update_account(
    State(app): State<Arc<AppState>>,
    Path(id): Path<i64>,
    JsonBody(body): JsonBody<UpdateAccount>,
) -> Response {
    if let Some(login_config) = body.login_config.as_ref() {
        let current = match app.storage.get_account(id).await {
            Ok(Some(row)) => row,
            Ok(None) => return envelope::fail(StatusCode::NOT_FOUND, "未找到指定的网盘账号"),
            Err(err) => return envelope::internal(err, "网盘账号更新失败"),
        };
        if let Err(response) =
            check_login_config(&app, &current.provider_name, login_config).await
        {
            return response;
        }
    }

    match app
        .storage
        .update_account(id, body.login_config.as_ref(), body.remarks.as_deref())
        .await
    {
        Ok(true) => envelope::ok_message("网盘账号更新成功"),
        Ok(false) => envelope::fail(StatusCode::NOT_FOUND, "未找到指定的网盘账号"),
        Err(err) => envelope::internal(err, "网盘账号更新失败"),
    }
}

pub(crate) async fn delete_account(
    State(app): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Response {
    match delete_account_guarded(app.storage.as_ref(), id).await {
        Ok(DeleteOutcome::Deleted) => {
            tracing::info!(account_id = id, "account deleted");
            envelope::ok_message("网盘账号删除成功")
        }
        Ok(DeleteOutcome::NotFound) => {
            envelope::fail(StatusCode::NOT_FOUND, "网盘账号删除失败，可能不存在")
        }
        Ok(DeleteOutcome::InUse(_)) => envelope::fail(
            StatusCode::CONFLICT,
            "该网盘账号有关联的外链，请先删除外链后再删除账号",
        ),
        Err(err) => envelope::internal(err, "网盘账号删除失败"),
    }
}
