use std::sync::Arc;

use drivelink_provider_core::ProviderRegistry;

use crate::providers::QuarkProvider;

pub fn register_builtin_providers(registry: &mut ProviderRegistry) {
    registry.register(Arc::new(QuarkProvider::new()));
}
