use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};

use drivelink_core::{AppState, DeleteOutcome, delete_provider_guarded};
use drivelink_provider_core::ProviderError;
use drivelink_router::{JsonBody, envelope};
use drivelink_storage::ProviderRow;

use crate::ts;

#[derive(Debug, Deserialize)]
pub(crate) struct CreateProvider {
    #[serde(default)]
    provider_name: String,
    #[serde(default)]
    config_vars: Option<JsonValue>,
    #[serde(default)]
    remarks: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateProvider {
    #[serde(default)]
    config_vars: Option<JsonValue>,
    #[serde(default)]
    remarks: Option<String>,
}

pub(crate) fn provider_json(row: &ProviderRow) -> JsonValue {
    json!({
        "id": row.id,
        "provider_name": row.name,
        "config_vars": row.config_json,
        "remarks": row.remarks,
        "created_at": ts(row.created_at),
        "updated_at": ts(row.updated_at),
    })
}

/// Templates must be objects and name a login kind this build knows.
fn check_template(app: &AppState, config: &JsonValue) -> Result<(), Response> {
    if !config.is_object() {
        return Err(envelope::fail(
            StatusCode::BAD_REQUEST,
            "config_vars必须是JSON对象",
        ));
    }
    match app.providers.for_template(config) {
        Ok(_) => Ok(()),
        Err(ProviderError::Unsupported(kind)) => Err(envelope::fail(
            StatusCode::BAD_REQUEST,
            format!("不支持的网盘登录类型: {kind}"),
        )),
        Err(err) => Err(envelope::fail(StatusCode::BAD_REQUEST, err.to_string())),
    }
}

pub(crate) async fn list_providers(State(app): State<Arc<AppState>>) -> Response {
    match app.storage.list_providers().await {
        Ok(rows) => envelope::ok(JsonValue::Array(rows.iter().map(provider_json).collect())),
        Err(err) => envelope::internal(err, "获取网盘类型失败"),
    }
}

pub(crate) async fn create_provider(
    State(app): State<Arc<AppState>>,
    JsonBody(body): JsonBody<CreateProvider>,
) -> Response {
    let name = body.provider_name.trim();
    if name.is_empty() {
        return envelope::fail(StatusCode::BAD_REQUEST, "缺少必要的provider_name参数");
    }
    let config = body.config_vars.unwrap_or_else(|| json!({}));
    if let Err(response) = check_template(&app, &config) {
        return response;
    }

    match app
        .storage
        .insert_provider(name, &config, body.remarks.as_deref())
        .await
    {
        Ok(Some(id)) => {
            tracing::info!(provider = name, id, "provider template created");
            envelope::ok_with_message(
                json!({ "id": id, "provider_name": name }),
                "网盘类型添加成功",
            )
        }
        Ok(None) => envelope::fail(StatusCode::CONFLICT, "网盘类型已存在"),
        Err(err) => envelope::internal(err, "网盘类型添加失败"),
    }
}

pub(crate) async fn get_provider(
    State(app): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Response {
    match app.storage.get_provider(&name).await {
        Ok(Some(row)) => envelope::ok(provider_json(&row)),
        Ok(None) => envelope::fail(StatusCode::NOT_FOUND, "未找到指定的网盘类型"),
        Err(err) => envelope::internal(err, "获取网盘类型失败"),
    }
}

pub(crate) async fn update_provider(
    State(app): State<Arc<AppState>>,
    Path(name): Path<String>,
    JsonBody(body): JsonBody<UpdateProvider>,
) -> Response {
    if let Some(config) = body.config_vars.as_ref()
        && let Err(response) = check_template(&app, config)
    {
        return response;
    }
    match app
        .storage
        .update_provider(&name, body.config_vars.as_ref(), body.remarks.as_deref())
        .await
    {
        Ok(true) => envelope::ok_message("网盘类型更新成功"),
        Ok(false) => envelope::fail(StatusCode::NOT_FOUND, "未找到指定的网盘类型"),
        Err(err) => envelope::internal(err, "网盘类型更新失败"),
    }
}

pub(crate) async fn delete_provider(
    State(app): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Response {
    match delete_provider_guarded(app.storage.as_ref(), &name).await {
        Ok(DeleteOutcome::Deleted) => {
            tracing::info!(provider = %name, "provider template deleted");
            envelope::ok_message("网盘类型删除成功")
        }
        Ok(DeleteOutcome::NotFound) => {
            envelope::fail(StatusCode::NOT_FOUND, "网盘类型删除失败，可能不存在")
        }
        Ok(DeleteOutcome::InUse(_)) => envelope::fail(
            StatusCode::CONFLICT,
            "该网盘类型下仍有网盘账号，请先删除账号后再删除类型",
        ),
        Err(err) => envelope::internal(err, "网盘类型删除失败"),
    }
}
