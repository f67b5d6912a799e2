use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::config::DisplayFields;
use crate::errors::ProviderResult;

/// Per-attempt settings handed to a provider.
#[derive(Debug, Clone)]
pub struct LoginCtx {
    pub proxy: Option<String>,
    pub timeout: Duration,
    /// Config blob of the provider template the account belongs to.
    pub template: JsonValue,
}

/// One remote drive service that can complete a login on behalf of an account.
#[async_trait]
pub trait LoginProvider: Send + Sync {
    fn kind(&self) -> &'static str;

    /// Fails with `ProviderError::MissingFields` when required fields are absent.
    fn validate(&self, login_config: &JsonValue) -> ProviderResult<()>;

    fn describe(&self, login_config: &JsonValue) -> DisplayFields;

    /// Exactly one outbound attempt. Transport faults and rejected logins are
    /// `Ok(false)`; only configuration problems are errors.
    async fn attempt_login(
        &self,
        ctx: &LoginCtx,
        login_config: &JsonValue,
        token: &str,
    ) -> ProviderResult<bool>;
}
