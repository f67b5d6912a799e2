use async_trait::async_trait;
use serde_json::Value as JsonValue;
use time::OffsetDateTime;

use drivelink_provider_core::{
    DisplayFields, LoginCtx, LoginProvider, ProviderError, ProviderResult, lookup_text,
    missing_fields,
};

use super::http_client::client_for_ctx;

pub const QUARK_KIND: &str = "quark";
pub const QUARK_LOGIN_URL: &str = "https://uop.quark.cn/cas/ajax/loginWithKpsAndQrcodeToken";
const QUARK_SUCCESS_STATUS: i64 = 2_000_000;
const REQUIRED_FIELDS: &[&str] = &["data.client_id", "data.v", "queryParams"];

const USER_AGENT: &str = "Mozilla/5.0 (Linux; U; Android 15; zh-CN; 2312DRA50C Build/AQ3A.240912.001) AppleWebKit/537.36 (KHTML, like Gecko) Version/4.0 Chrome/123.0.6312.80 Quark/7.9.2.771 Mobile Safari/537.36";

/// Quark drive: confirms a QR-code login token with the account's signed
/// `kps_wg`/`sign_wg` pair.
#[derive(Debug, Default)]
pub struct QuarkProvider;

impl QuarkProvider {
    pub fn new() -> Self {
        Self
    }
}

/// The account config may point at its own endpoint; otherwise the template's,
/// otherwise the public one.
pub(crate) fn login_url(template: &JsonValue, login_config: &JsonValue) -> String {
    [login_config, template]
        .into_iter()
        .filter_map(|config| lookup_text(config, "redirect_uri"))
        .map(|url| url.trim().to_string())
        .find(|url| !url.is_empty())
        .unwrap_or_else(|| QUARK_LOGIN_URL.to_string())
}

/// `queryParams` is stored as a prefix ending in the timestamp key, e.g.
/// `uc_param_str=...&__t=`.
pub(crate) fn build_url(base: &str, login_config: &JsonValue, now_ms: i64) -> String {
    let prefix = lookup_text(login_config, "queryParams").unwrap_or_default();
    let query = format!("{prefix}{now_ms}");
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}{query}")
}

pub(crate) fn build_form(
    login_config: &JsonValue,
    token: &str,
    now_ms: i64,
) -> Vec<(&'static str, String)> {
    let field = |name: &str| lookup_text(login_config, &format!("data.{name}")).unwrap_or_default();
    vec![
        ("client_id", field("client_id")),
        ("v", field("v")),
        ("request_id", (now_ms + 5).to_string()),
        ("sign_wg", field("sign_wg")),
        ("kps_wg", field("kps_wg")),
        ("vcode", now_ms.to_string()),
        ("token", token.to_string()),
    ]
}

pub(crate) fn is_login_success(body: &JsonValue) -> bool {
    match body.get("status") {
        Some(JsonValue::Number(n)) => n.as_i64() == Some(QUARK_SUCCESS_STATUS),
        Some(JsonValue::String(s)) => s.trim().parse::<i64>().ok() == Some(QUARK_SUCCESS_STATUS),
        _ => false,
    }
}

fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

#[async_trait]
impl LoginProvider for QuarkProvider {
    fn kind(&self) -> &'static str {
        QUARK_KIND
    }

    fn validate(&self, login_config: &JsonValue) -> ProviderResult<()> {
        let missing = missing_fields(login_config, REQUIRED_FIELDS);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ProviderError::MissingFields(missing))
        }
    }

    fn describe(&self, login_config: &JsonValue) -> DisplayFields {
        let mut fields = DisplayFields::default();
        fields.push("网盘", "夸克网盘");
        if let Some(client_id) = lookup_text(login_config, "data.client_id") {
            fields.push("client_id", client_id);
        }
        if let Some(version) = lookup_text(login_config, "data.v") {
            fields.push("版本", version);
        }
        fields
    }

    async fn attempt_login(
        &self,
        ctx: &LoginCtx,
        login_config: &JsonValue,
        token: &str,
    ) -> ProviderResult<bool> {
        self.validate(login_config)?;
        let client = client_for_ctx(ctx)?;

        let now_ms = now_millis();
        let url = build_url(&login_url(&ctx.template, login_config), login_config, now_ms);
        let form = build_form(login_config, token, now_ms);

        let response = client
            .post(&url)
            .header("Accept", "application/json, text/plain, */*")
            .header("Origin", "https://b.quark.cn")
            .header("Referer", "https://b.quark.cn/")
            .header("User-Agent", USER_AGENT)
            .header("X-Requested-With", "com.quark.browser")
            .form(&form)
            .send()
            .await;
        let response = match response {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(error = %err, "quark login request failed");
                return Ok(false);
            }
        };

        let http_status = response.status();
        let body: JsonValue = match response.json().await {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(status = %http_status, error = %err, "quark login response is not json");
                return Ok(false);
            }
        };

        let success = is_login_success(&body);
        if !success {
            tracing::info!(
                status = %http_status,
                remote_status = %body.get("status").cloned().unwrap_or(JsonValue::Null),
                message = body.get("message").and_then(JsonValue::as_str).unwrap_or(""),
                "quark login rejected"
            );
        }
        Ok(success)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;

    fn account() -> JsonValue {
        json!({
            "data": {"client_id": "532", "v": "1.2", "sign_wg": "sig", "kps_wg": "kps"},
            "queryParams": "uc_param_str=dsdnfrpfbivesscpgimibtbmnijblauputogpintnwktprchmt&__t="
        })
    }

    #[test]
    fn form_carries_signed_fields_and_derived_ids() {
        let form = build_form(&account(), "qr-token", 1_700_000_000_000);
        let get = |key: &str| {
            form.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.as_str())
        };
        assert_eq!(get("client_id"), Some("532"));
        assert_eq!(get("v"), Some("1.2"));
        assert_eq!(get("sign_wg"), Some("sig"));
        assert_eq!(get("kps_wg"), Some("kps"));
        assert_eq!(get("vcode"), Some("1700000000000"));
        assert_eq!(get("request_id"), Some("1700000000005"));
        assert_eq!(get("token"), Some("qr-token"));
    }

    #[test]
    fn query_string_ends_with_timestamp() {
        let url = build_url(QUARK_LOGIN_URL, &account(), 42);
        assert!(url.starts_with(QUARK_LOGIN_URL));
        assert!(url.ends_with("&__t=42"));
        assert_eq!(url.matches('?').count(), 1);
    }

    #[test]
    fn login_url_prefers_account_then_template() {
        let template = json!({"redirect_uri": "https://template.example/login"});
        let mut config = account();
        assert_eq!(login_url(&template, &config), "https://template.example/login");
        config["redirect_uri"] = json!("https://account.example/login");
        assert_eq!(login_url(&template, &config), "https://account.example/login");
        assert_eq!(login_url(&json!({}), &account()), QUARK_LOGIN_URL);
    }

    #[test]
    fn only_the_documented_status_is_success() {
        assert!(is_login_success(&json!({"status": 2000000})));
        assert!(is_login_success(&json!({"status": "2000000"})));
        assert!(!is_login_success(&json!({"status": 50004001})));
        assert!(!is_login_success(&json!({"message": "ok"})));
    }

    #[test]
    fn validation_names_missing_fields() {
        let provider = QuarkProvider::new();
        assert!(provider.validate(&account()).is_ok());
        let err = provider.validate(&json!({"data": {"v": "1.2"}})).unwrap_err();
        assert_eq!(
            err,
            ProviderError::MissingFields(vec!["data.client_id".into(), "queryParams".into()])
        );
    }

    #[test]
    fn describe_shows_no_secrets() {
        let fields = QuarkProvider::new().describe(&account());
        assert!(fields.iter().all(|field| field.value != "sig" && field.value != "kps"));
        assert!(fields.iter().any(|field| field.value == "532"));
    }

    #[tokio::test]
    async fn invalid_config_fails_before_any_request() {
        let ctx = LoginCtx {
            proxy: None,
            timeout: Duration::from_secs(1),
            template: json!({}),
        };
        let result = QuarkProvider::new()
            .attempt_login(&ctx, &json!({"data": {}}), "t")
            .await;
        assert!(matches!(result, Err(ProviderError::MissingFields(_))));
    }
}
