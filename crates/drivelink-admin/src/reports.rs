use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use serde_json::json;
use time::OffsetDateTime;

use drivelink_core::{AppState, redact_dsn};
use drivelink_router::envelope;

pub(crate) async fn health(State(app): State<Arc<AppState>>) -> Response {
    match app.storage.health().await {
        Ok(()) => envelope::ok(json!({ "ok": true })),
        Err(err) => {
            tracing::error!(error = %err, "storage health check failed");
            envelope::fail(StatusCode::SERVICE_UNAVAILABLE, "存储不可用")
        }
    }
}

/// Effective config without the admin key hash.
pub(crate) async fn get_config(State(app): State<Arc<AppState>>) -> Response {
    let global = &app.global;
    envelope::ok(json!({
        "host": global.host,
        "port": global.port,
        "proxy": global.proxy,
        "dsn": redact_dsn(&global.dsn),
        "default_expiry_hours": global.default_expiry_hours,
        "max_quota_per_link": global.max_quota_per_link,
        "login_timeout_secs": global.login_timeout_secs,
        "login_kinds": app.providers.kinds(),
    }))
}

pub(crate) async fn dashboard(State(app): State<Arc<AppState>>) -> Response {
    match app.storage.dashboard_counts(OffsetDateTime::now_utc()).await {
        Ok(counts) => envelope::ok(json!({
            "user_drives_count": counts.accounts,
            "active_links_count": counts.active_links,
            "total_links_count": counts.total_links,
        })),
        Err(err) => envelope::internal(err, "获取仪表盘数据失败"),
    }
}

pub(crate) async fn statistics(State(app): State<Arc<AppState>>) -> Response {
    match app.storage.count_accounts_by_provider().await {
        Ok(by_provider) => envelope::ok(json!({ "drives_by_provider": by_provider })),
        Err(err) => envelope::internal(err, "获取统计数据失败"),
    }
}
