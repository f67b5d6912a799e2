use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use time::OffsetDateTime;

use drivelink_provider_core::{DisplayFields, LoginCtx, ProviderError, ProviderRegistry};
use drivelink_storage::{LinkRow, Storage, StorageError, format_expiry};

pub use drivelink_storage::REDEMPTION_STEP;

/// Why a link cannot be viewed or redeemed. `Display` is the visitor-facing
/// message.
#[derive(Debug, thiserror::Error)]
pub enum Refusal {
    #[error("缺少token参数")]
    MissingToken,
    #[error("无效的外链ID")]
    InvalidLink,
    #[error("此外链已过期")]
    Expired,
    #[error("外链信息有误（无效的过期时间）")]
    MalformedExpiry,
    #[error("此外链已达到使用次数限制")]
    QuotaExhausted,
    #[error("找不到关联的网盘信息")]
    AccountMissing,
    #[error("网盘配置有误，无法登录")]
    ProviderConfig(#[source] ProviderError),
    #[error("登录失败，请重新扫码")]
    LoginFailed,
    #[error("服务器内部错误")]
    Storage(#[from] StorageError),
}

impl Refusal {
    pub fn code(&self) -> &'static str {
        match self {
            Refusal::MissingToken => "missing_token",
            Refusal::InvalidLink => "invalid_link",
            Refusal::Expired => "expired",
            Refusal::MalformedExpiry => "malformed_expiry",
            Refusal::QuotaExhausted => "quota_exhausted",
            Refusal::AccountMissing => "account_missing",
            Refusal::ProviderConfig(_) => "provider_config",
            Refusal::LoginFailed => "login_failed",
            Refusal::Storage(_) => "storage",
        }
    }
}

/// Expiry and quota checks on a resolved link, in that order.
pub fn evaluate(link: &LinkRow, now: OffsetDateTime) -> Result<OffsetDateTime, Refusal> {
    let expires_at = link.expires_at().map_err(|_| Refusal::MalformedExpiry)?;
    if now > expires_at {
        return Err(Refusal::Expired);
    }
    if link.is_exhausted() {
        return Err(Refusal::QuotaExhausted);
    }
    Ok(expires_at)
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkView {
    pub link_uuid: String,
    pub provider_name: String,
    pub display: DisplayFields,
    pub remaining: f64,
    pub total_quota: f64,
    pub used_quota: f64,
    pub expiry_time: String,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Redemption {
    pub remaining: f64,
    /// `false` when the login went through but the quota increment lost a race
    /// or failed to persist.
    pub accounted: bool,
}

#[derive(Debug, Clone, Default)]
pub struct LoginSettings {
    pub proxy: Option<String>,
    pub timeout: Duration,
}

#[derive(Clone)]
pub struct RedemptionEngine {
    storage: Arc<dyn Storage>,
    providers: Arc<ProviderRegistry>,
    settings: LoginSettings,
}

impl RedemptionEngine {
    pub fn new(
        storage: Arc<dyn Storage>,
        providers: Arc<ProviderRegistry>,
        settings: LoginSettings,
    ) -> Self {
        Self {
            storage,
            providers,
            settings,
        }
    }

    async fn resolve(&self, link_token: &str) -> Result<LinkRow, Refusal> {
        let link_token = link_token.trim();
        if link_token.is_empty() {
            return Err(Refusal::InvalidLink);
        }
        let link = self
            .storage
            .get_link(link_token)
            .await?
            .ok_or(Refusal::InvalidLink)?;
        if let Err(refusal) = evaluate(&link, OffsetDateTime::now_utc()) {
            if matches!(refusal, Refusal::MalformedExpiry) {
                tracing::error!(link = %link.link_uuid, expiry_time = %link.expiry_time, "link has unparsable expiry");
            }
            return Err(refusal);
        }
        Ok(link)
    }

    /// Read-only: never touches `used_quota`.
    pub async fn view(&self, link_token: &str) -> Result<LinkView, Refusal> {
        let link = self.resolve(link_token).await?;
        let account = self
            .storage
            .get_account(link.account_id)
            .await?
            .ok_or(Refusal::AccountMissing)?;

        let display = match self.storage.get_provider(&account.provider_name).await? {
            Some(template) => self
                .providers
                .for_template(&template.config_json)
                .map(|provider| provider.describe(&account.login_config))
                .unwrap_or_default(),
            None => DisplayFields::default(),
        };

        Ok(LinkView {
            remaining: link.remaining(),
            expiry_time: link
                .expires_at()
                .ok()
                .and_then(|at| format_expiry(at).ok())
                .unwrap_or_else(|| link.expiry_time.clone()),
            link_uuid: link.link_uuid,
            provider_name: account.provider_name,
            display,
            total_quota: link.total_quota,
            used_quota: link.used_quota,
            remarks: link.remarks,
        })
    }

    pub async fn redeem(&self, link_token: &str, caller_token: &str) -> Result<Redemption, Refusal> {
        let caller_token = caller_token.trim();
        if caller_token.is_empty() {
            return Err(Refusal::MissingToken);
        }
        let link = self.resolve(link_token).await?;
        let account = self
            .storage
            .get_account(link.account_id)
            .await?
            .ok_or(Refusal::AccountMissing)?;
        let template = self
            .storage
            .get_provider(&account.provider_name)
            .await?
            .ok_or_else(|| {
                Refusal::ProviderConfig(ProviderError::Unsupported(account.provider_name.clone()))
            })?;
        let provider = self
            .providers
            .for_template(&template.config_json)
            .map_err(Refusal::ProviderConfig)?;
        provider
            .validate(&account.login_config)
            .map_err(Refusal::ProviderConfig)?;

        let ctx = LoginCtx {
            proxy: self.settings.proxy.clone(),
            timeout: self.settings.timeout,
            template: template.config_json,
        };
        let logged_in = provider
            .attempt_login(&ctx, &account.login_config, caller_token)
            .await
            .map_err(Refusal::ProviderConfig)?;
        if !logged_in {
            tracing::warn!(link = %link.link_uuid, account_id = account.id, "remote login failed");
            return Err(Refusal::LoginFailed);
        }

        let accounted = match self
            .storage
            .increment_link_usage(&link.link_uuid, REDEMPTION_STEP)
            .await
        {
            Ok(true) => true,
            Ok(false) => {
                tracing::warn!(link = %link.link_uuid, "login succeeded but quota was taken concurrently");
                false
            }
            Err(err) => {
                tracing::error!(link = %link.link_uuid, error = %err, "login succeeded but quota commit failed");
                false
            }
        };

        // An uncharged login must not look charged.
        let remaining = match self.storage.get_link(&link.link_uuid).await {
            Ok(Some(latest)) => latest.remaining(),
            _ if accounted => (link.remaining() - REDEMPTION_STEP).max(0.0),
            _ => link.remaining(),
        };
        tracing::info!(link = %link.link_uuid, account_id = account.id, remaining, accounted, "link redeemed");
        Ok(Redemption {
            remaining,
            accounted,
        })
    }
}
