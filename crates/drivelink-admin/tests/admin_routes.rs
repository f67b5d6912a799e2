use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value as JsonValue, json};
use tempfile::TempDir;
use tower::ServiceExt;

use drivelink_admin::admin_router;
use drivelink_common::GlobalConfigPatch;
use drivelink_core::{AppState, hash_admin_key};
use drivelink_provider_core::ProviderRegistry;
use drivelink_provider_impl::{builtin_provider_seeds, register_builtin_providers};
use drivelink_router::BAD_BODY;
use drivelink_storage::{SeaOrmStorage, Storage};

const KEY: &str = "secret";

struct Harness {
    _dir: TempDir,
    app: Router,
    storage: Arc<SeaOrmStorage>,
}

async fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let dsn = format!("sqlite://{}?mode=rwc", dir.path().join("admin.db").display());
    let storage = Arc::new(SeaOrmStorage::connect(&dsn).await.unwrap());
    storage.sync().await.unwrap();
    for seed in builtin_provider_seeds() {
        storage
            .insert_provider(seed.name, &seed.config_json, Some(seed.remarks))
            .await
            .unwrap();
    }

    let mut registry = ProviderRegistry::new();
    register_builtin_providers(&mut registry);
    let global = GlobalConfigPatch {
        admin_key_hash: Some(hash_admin_key(KEY)),
        dsn: Some(dsn),
        max_quota_per_link: Some(10.0),
        ..GlobalConfigPatch::default()
    }
    .into_config()
    .unwrap();
    let dyn_storage: Arc<dyn Storage> = storage.clone();
    let state = Arc::new(AppState::new(global, dyn_storage, Arc::new(registry)));

    Harness {
        _dir: dir,
        app: admin_router(state),
        storage,
    }
}

fn quark_login_config() -> JsonValue {
    json!({
        "data": {"client_id": "532", "v": "1.2"},
        "queryParams": "__dt=1&__t=",
    })
}

impl Harness {
    async fn call(&self, method: &str, uri: &str, body: Option<JsonValue>) -> (StatusCode, JsonValue) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-admin-key", KEY);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn account(&self) -> i64 {
        let (status, body) = self
            .call(
                "POST",
                "/admin/accounts",
                Some(json!({
                    "provider_name": "quark",
                    "login_config": quark_login_config(),
                    "remarks": "main",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["id"].as_i64().unwrap()
    }
}

#[tokio::test]
async fn requests_without_key_are_rejected() {
    let h = harness().await;
    let response = h
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/admin/dashboard")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let wrong = h
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/admin/dashboard")
                .header(header::AUTHORIZATION, "Bearer nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let by_query = h
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/admin/health?admin_key={KEY}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(by_query.status(), StatusCode::OK);
}

#[tokio::test]
async fn malformed_bodies_get_envelope() {
    let h = harness().await;
    for uri in ["/admin/providers", "/admin/accounts", "/admin/links"] {
        let response = h
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("x-admin-key", KEY)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: JsonValue = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], json!(false), "{uri}");
        assert_eq!(body["message"], json!(BAD_BODY), "{uri}");
    }
}

#[tokio::test]
async fn fractional_quota_is_rejected() {
    let h = harness().await;
    let account_id = h.account().await;
    let (status, body) = h
        .call(
            "POST",
            "/admin/links",
            Some(json!({"drive_id": account_id, "total_quota": "1.5"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("外链使用次数必须是整数"));
    assert!(h.storage.list_links().await.unwrap().is_empty());
}

#[tokio::test]
async fn config_hides_admin_key_hash() {
    let h = harness().await;
    let (status, body) = h.call("GET", "/admin/config", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["max_quota_per_link"], json!(10.0));
    assert!(body["data"].get("admin_key_hash").is_none());
    assert!(!body.to_string().contains(&hash_admin_key(KEY)));
}

#[tokio::test]
async fn provider_templates_crud() {
    let h = harness().await;

    let (status, body) = h
        .call(
            "POST",
            "/admin/providers",
            Some(json!({"provider_name": "quark-backup", "config_vars": {"kind": "quark"}})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("网盘类型添加成功"));

    let (status, _) = h
        .call(
            "POST",
            "/admin/providers",
            Some(json!({"provider_name": "quark-backup"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = h
        .call(
            "POST",
            "/admin/providers",
            Some(json!({"provider_name": "baidu", "config_vars": {"kind": "baidu"}})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], json!(false));

    let (status, _) = h
        .call(
            "PUT",
            "/admin/providers/quark-backup",
            Some(json!({"remarks": "spare"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = h.call("GET", "/admin/providers/quark-backup", None).await;
    assert_eq!(body["data"]["remarks"], json!("spare"));

    let (_, body) = h.call("GET", "/admin/providers", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, _) = h.call("DELETE", "/admin/providers/quark-backup", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = h.call("GET", "/admin/providers/quark-backup", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn account_login_config_is_validated() {
    let h = harness().await;
    let (status, body) = h
        .call(
            "POST",
            "/admin/accounts",
            Some(json!({"provider_name": "quark", "login_config": {"data": {"v": "1"}}})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("data.client_id"));
    assert!(message.contains("queryParams"));

    let (status, body) = h
        .call(
            "POST",
            "/admin/accounts",
            Some(json!({"provider_name": "nope", "login_config": quark_login_config()})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("指定的网盘类型不存在"));

    let id = h.account().await;
    let (_, body) = h.call("GET", "/admin/accounts?provider_name=quark", None).await;
    assert_eq!(body["data"][0]["id"], json!(id));
    let (_, body) = h.call("GET", "/admin/accounts?provider_name=other", None).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn link_lifecycle_through_admin_api() {
    let h = harness().await;
    let account_id = h.account().await;

    let (status, body) = h
        .call("POST", "/admin/links", Some(json!({"total_quota": 2})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("缺少必要的drive_id参数"));

    let (status, body) = h
        .call(
            "POST",
            "/admin/links",
            Some(json!({"drive_id": account_id, "total_quota": 50})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("外链使用次数不能超过10"));

    let (status, body) = h
        .call(
            "POST",
            "/admin/links",
            Some(json!({"drive_id": 9999, "total_quota": 2})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], json!("指定的网盘账号不存在"));

    let (status, body) = h
        .call(
            "POST",
            "/admin/links",
            Some(json!({"data": {
                "account_id": account_id,
                "total_quota": 3,
                "remarks": "friend",
                "expiry_time": "2099-01-01T00:00",
            }})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("外链创建成功"));
    let token = body["data"]["link_uuid"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["url"], json!(format!("/exlink/{token}")));

    let (_, body) = h.call("GET", &format!("/admin/links/{token}"), None).await;
    assert_eq!(body["data"]["total_quota"], json!(3.0));
    assert_eq!(body["data"]["expiry_time"], json!("2099-01-01T00:00:00Z"));
    assert_eq!(body["data"]["active"], json!(true));

    h.storage.increment_link_usage(&token, 1.0).await.unwrap();
    h.storage.increment_link_usage(&token, 1.0).await.unwrap();
    let (status, body) = h
        .call(
            "PUT",
            &format!("/admin/links/{token}"),
            Some(json!({"total_quota": 1})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], json!(false));
    let (status, _) = h
        .call(
            "PUT",
            &format!("/admin/links/{token}"),
            Some(json!({"total_quota": 5, "remarks": "more"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = h
        .call("GET", &format!("/admin/accounts/{account_id}/links"), None)
        .await;
    assert_eq!(body["data"][0]["remaining"], json!(3.0));

    let (_, body) = h.call("GET", "/admin/dashboard", None).await;
    assert_eq!(body["data"]["user_drives_count"], json!(1));
    assert_eq!(body["data"]["active_links_count"], json!(1));
    assert_eq!(body["data"]["total_links_count"], json!(1));

    let (_, body) = h.call("GET", "/admin/statistics", None).await;
    assert_eq!(body["data"]["drives_by_provider"]["quark"], json!(1));

    let (status, body) = h
        .call("DELETE", &format!("/admin/accounts/{account_id}"), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["message"],
        json!("该网盘账号有关联的外链，请先删除外链后再删除账号")
    );
    let (status, _) = h.call("DELETE", "/admin/providers/quark", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = h.call("DELETE", &format!("/admin/links/{token}"), None).await;
    assert_eq!(body["message"], json!("外链删除成功"));
    let (status, body) = h.call("DELETE", &format!("/admin/links/{token}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], json!("外链删除失败，可能不存在"));

    let (_, body) = h
        .call("DELETE", &format!("/admin/accounts/{account_id}"), None)
        .await;
    assert_eq!(body["message"], json!("网盘账号删除成功"));
    let (status, body) = h
        .call("DELETE", &format!("/admin/accounts/{account_id}"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], json!("网盘账号删除失败，可能不存在"));
}
