use std::sync::Arc;
use std::time::Duration;

use drivelink_common::GlobalConfig;
use drivelink_provider_core::ProviderRegistry;
use drivelink_storage::Storage;

use crate::engine::{LoginSettings, RedemptionEngine};

/// Everything a request handler needs. Built once at boot.
pub struct AppState {
    pub global: GlobalConfig,
    pub storage: Arc<dyn Storage>,
    pub providers: Arc<ProviderRegistry>,
    pub engine: RedemptionEngine,
}

impl AppState {
    pub fn new(
        global: GlobalConfig,
        storage: Arc<dyn Storage>,
        providers: Arc<ProviderRegistry>,
    ) -> Self {
        let engine = RedemptionEngine::new(
            storage.clone(),
            providers.clone(),
            LoginSettings {
                proxy: global.proxy.clone(),
                timeout: Duration::from_secs(global.login_timeout_secs),
            },
        );
        Self {
            global,
            storage,
            providers,
            engine,
        }
    }
}
