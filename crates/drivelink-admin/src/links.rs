use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use time::OffsetDateTime;

use drivelink_core::{AppState, LinkInputError, check_total_quota, parse_expiry_input};
use drivelink_router::{JsonBody, envelope};
use drivelink_storage::{LinkMetaUpdate, LinkRow, NewLink};

use crate::ts;

const DEFAULT_TOTAL_QUOTA: f64 = 1.0;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct LinkFilter {
    #[serde(default)]
    account_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateLink {
    #[serde(default)]
    total_quota: Option<f64>,
    #[serde(default)]
    remarks: Option<String>,
}

fn link_path(link_uuid: &str) -> String {
    format!("/exlink/{link_uuid}")
}

fn link_json(row: &LinkRow, now: OffsetDateTime) -> JsonValue {
    json!({
        "id": row.id,
        "link_uuid": row.link_uuid,
        "drive_id": row.account_id,
        "total_quota": row.total_quota,
        "used_quota": row.used_quota,
        "remaining": row.remaining(),
        "expiry_time": row.expiry_time,
        "remarks": row.remarks,
        "active": row.is_active_at(now),
        "url": link_path(&row.link_uuid),
        "created_at": ts(row.created_at),
    })
}

fn links_json(rows: &[LinkRow]) -> JsonValue {
    let now = OffsetDateTime::now_utc();
    JsonValue::Array(rows.iter().map(|row| link_json(row, now)).collect())
}

/// Accepts `{drive_id, ...}` as well as `{data: {account_id, ...}}`.
#[derive(Debug, PartialEq)]
struct CreateLinkInput {
    account_id: Option<i64>,
    total_quota: Option<f64>,
    remarks: Option<String>,
    expiry_time: Option<String>,
}

#[derive(Debug, PartialEq)]
enum PayloadError {
    BadAccountId,
    BadQuota,
    BadExpiry,
}

fn integer_field(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn number_field(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn present<'a>(payload: &'a JsonValue, key: &str) -> Option<&'a JsonValue> {
    payload.get(key).filter(|value| !value.is_null())
}

fn parse_create_payload(body: &JsonValue) -> Result<CreateLinkInput, PayloadError> {
    let payload = match body.get("data") {
        Some(inner) if inner.is_object() => inner,
        _ => body,
    };

    let account_id = match present(payload, "account_id").or_else(|| present(payload, "drive_id"))
    {
        Some(value) => Some(integer_field(value).ok_or(PayloadError::BadAccountId)?),
        None => None,
    };
    let total_quota = match present(payload, "total_quota") {
        Some(value) => Some(number_field(value).ok_or(PayloadError::BadQuota)?),
        None => None,
    };
    let expiry_time = match present(payload, "expiry_time") {
        Some(JsonValue::String(s)) => Some(s.clone()),
        Some(_) => return Err(PayloadError::BadExpiry),
        None => None,
    };
    let remarks = present(payload, "remarks")
        .and_then(JsonValue::as_str)
        .map(str::to_string);

    Ok(CreateLinkInput {
        account_id,
        total_quota,
        remarks,
        expiry_time,
    })
}

pub(crate) async fn list_links(
    State(app): State<Arc<AppState>>,
    Query(filter): Query<LinkFilter>,
) -> Response {
    let rows = match filter.account_id {
        Some(account_id) => app.storage.list_links_by_account(account_id).await,
        None => app.storage.list_links().await,
    };
    match rows {
        Ok(rows) => envelope::ok(links_json(&rows)),
        Err(err) => envelope::internal(err, "获取外链列表失败"),
    }
}

pub(crate) async fn list_account_links(
    State(app): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Response {
    match app.storage.get_account(id).await {
        Ok(Some(_)) => {}
        Ok(None) => return envelope::fail(StatusCode::NOT_FOUND, "未找到指定的网盘账号"),
        Err(err) => return envelope::internal(err, "获取外链列表失败"),
    }
    match app.storage.list_links_by_account(id).await {
        Ok(rows) => envelope::ok(links_json(&rows)),
        Err(err) => envelope::internal(err, "获取外链列表失败"),
    }
}

pub(crate) async fn create_link(
    State(app): State<Arc<AppState>>,
    JsonBody(body): JsonBody<JsonValue>,
) -> Response {
    let input = match parse_create_payload(&body) {
        Ok(input) => input,
        Err(PayloadError::BadAccountId) => {
            return envelope::fail(StatusCode::BAD_REQUEST, "drive_id参数无效");
        }
        Err(PayloadError::BadQuota) => {
            return envelope::fail(StatusCode::BAD_REQUEST, "外链使用次数必须是数字");
        }
        Err(PayloadError::BadExpiry) => {
            return envelope::fail(StatusCode::BAD_REQUEST, LinkInputError::BadExpiry.to_string());
        }
    };
    let Some(account_id) = input.account_id else {
        return envelope::fail(StatusCode::BAD_REQUEST, "缺少必要的drive_id参数");
    };
    let total_quota = input.total_quota.unwrap_or(DEFAULT_TOTAL_QUOTA);
    if let Err(err) = check_total_quota(total_quota, app.global.max_quota_per_link) {
        return envelope::fail(StatusCode::BAD_REQUEST, err.to_string());
    }
    let expiry_time = match parse_expiry_input(input.expiry_time.as_deref()) {
        Ok(expiry) => expiry,
        Err(err) => return envelope::fail(StatusCode::BAD_REQUEST, err.to_string()),
    };

    let created = app
        .storage
        .create_link(NewLink {
            account_id,
            total_quota,
            remarks: input.remarks,
            expiry_time,
        })
        .await;
    match created {
        Ok(Some(link_uuid)) => {
            tracing::info!(link = %link_uuid, account_id, total_quota, "link created");
            envelope::ok_with_message(
                json!({ "link_uuid": link_uuid, "url": link_path(&link_uuid) }),
                "外链创建成功",
            )
        }
        Ok(None) => envelope::fail(StatusCode::NOT_FOUND, "指定的网盘账号不存在"),
        Err(err) => envelope::internal(err, "外链创建失败"),
    }
}

pub(crate) async fn get_link(
    State(app): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Response {
    match app.storage.get_link(&token).await {
        Ok(Some(row)) => envelope::ok(link_json(&row, OffsetDateTime::now_utc())),
        Ok(None) => envelope::fail(StatusCode::NOT_FOUND, "无效的外链ID"),
        Err(err) => envelope::internal(err, "获取外链失败"),
    }
}

pub(crate) async fn update_link(
    State(app): State<Arc<AppState>>,
    Path(token): Path<String>,
    JsonBody(body): JsonBody<UpdateLink>,
) -> Response {
    if let Some(total_quota) = body.total_quota
        && let Err(err) = check_total_quota(total_quota, app.global.max_quota_per_link)
    {
        return envelope::fail(StatusCode::BAD_REQUEST, err.to_string());
    }
    match app
        .storage
        .update_link_meta(&token, body.total_quota, body.remarks.as_deref())
        .await
    {
        Ok(LinkMetaUpdate::Updated) => envelope::ok_message("外链更新成功"),
        Ok(LinkMetaUpdate::NotFound) => envelope::fail(StatusCode::NOT_FOUND, "无效的外链ID"),
        Ok(LinkMetaUpdate::BelowUsed { used_quota }) => envelope::fail(
            StatusCode::BAD_REQUEST,
            format!("总次数不能小于已使用次数({used_quota})"),
        ),
        Err(err) => envelope::internal(err, "外链更新失败"),
    }
}

pub(crate) async fn delete_link(
    State(app): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Response {
    match app.storage.delete_link(&token).await {
        Ok(true) => {
            tracing::info!(link = %token, "link deleted");
            envelope::ok_message("外链删除成功")
        }
        Ok(false) => envelope::fail(StatusCode::NOT_FOUND, "外链删除失败，可能不存在"),
        Err(err) => envelope::internal(err, "外链删除失败"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_payload_uses_drive_id() {
        let input = parse_create_payload(&json!({
            "drive_id": "7",
            "total_quota": 3,
            "remarks": "vip",
        }))
        .unwrap();
        assert_eq!(input.account_id, Some(7));
        assert_eq!(input.total_quota, Some(3.0));
        assert_eq!(input.remarks.as_deref(), Some("vip"));
        assert_eq!(input.expiry_time, None);
    }

    #[test]
    fn wrapped_payload_uses_account_id() {
        let input = parse_create_payload(&json!({
            "data": {"account_id": 4, "total_quota": "2.5", "expiry_time": "2030-01-01T00:00"}
        }))
        .unwrap();
        assert_eq!(input.account_id, Some(4));
        assert_eq!(input.total_quota, Some(2.5));
        assert_eq!(input.expiry_time.as_deref(), Some("2030-01-01T00:00"));
    }

    #[test]
    fn malformed_fields_are_rejected() {
        assert_eq!(
            parse_create_payload(&json!({"drive_id": "x"})),
            Err(PayloadError::BadAccountId)
        );
        assert_eq!(
            parse_create_payload(&json!({"drive_id": 1, "total_quota": "many"})),
            Err(PayloadError::BadQuota)
        );
        assert_eq!(
            parse_create_payload(&json!({"drive_id": 1, "expiry_time": 5})),
            Err(PayloadError::BadExpiry)
        );
        assert_eq!(parse_create_payload(&json!({})).unwrap().account_id, None);
    }
}
