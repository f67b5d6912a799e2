//! Administrative API: provider templates, accounts, links and reports.
//!
//! Every route requires the admin key (`x-admin-key`, `Authorization: Bearer`
//! or `?admin_key=`).

mod accounts;
mod links;
mod providers;
mod reports;

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use time::OffsetDateTime;

use drivelink_core::{AppState, verify_admin_key};
use drivelink_router::envelope;

pub fn admin_router(app: Arc<AppState>) -> Router {
    Router::new()
        .route("/admin/health", get(reports::health))
        .route("/admin/config", get(reports::get_config))
        .route("/admin/dashboard", get(reports::dashboard))
        .route("/admin/statistics", get(reports::statistics))
        .route(
            "/admin/providers",
            get(providers::list_providers).post(providers::create_provider),
        )
        .route(
            "/admin/providers/{name}",
            get(providers::get_provider)
                .put(providers::update_provider)
                .delete(providers::delete_provider),
        )
        .route(
            "/admin/accounts",
            get(accounts::list_accounts).post(accounts::create_account),
        )
        .route(
            "/admin/accounts/{id}",
            get(accounts::get_account)
                .put(accounts::update_account)
                .delete(accounts::delete_account),
        )
        .route("/admin/accounts/{id}/links", get(links::list_account_links))
        .route("/admin/links", get(links::list_links).post(links::create_link))
        .route(
            "/admin/links/{token}",
            get(links::get_link)
                .put(links::update_link)
                .delete(links::delete_link),
        )
        .layer(middleware::from_fn_with_state(app.clone(), admin_auth))
        .with_state(app)
}

async fn admin_auth(
    State(app): State<Arc<AppState>>,
    headers: HeaderMap,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let authorized = extract_admin_key(&headers, req.uri())
        .is_some_and(|key| verify_admin_key(&app.global.admin_key_hash, &key));
    if !authorized {
        return envelope::fail(StatusCode::UNAUTHORIZED, "未授权的访问");
    }
    next.run(req).await
}

fn extract_admin_key(headers: &HeaderMap, uri: &axum::http::Uri) -> Option<String> {
    if let Some(value) = headers.get("x-admin-key")
        && let Ok(s) = value.to_str()
    {
        let s = s.trim();
        if !s.is_empty() {
            return Some(s.to_string());
        }
    }

    if let Some(value) = headers.get(header::AUTHORIZATION)
        && let Ok(auth) = value.to_str()
    {
        let auth = auth.trim();
        let prefix = "Bearer ";
        if auth.len() > prefix.len() && auth[..prefix.len()].eq_ignore_ascii_case(prefix) {
            let token = auth[prefix.len()..].trim();
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }

    let query = uri.query()?;
    let parsed: std::collections::HashMap<String, String> =
        serde_urlencoded::from_str(query).ok()?;
    let key = parsed.get("admin_key")?.trim();
    if key.is_empty() {
        return None;
    }
    Some(key.to_string())
}

pub(crate) fn ts(at: OffsetDateTime) -> i64 {
    at.unix_timestamp()
}
