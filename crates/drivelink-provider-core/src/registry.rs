use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::errors::{ProviderError, ProviderResult};
use crate::provider::LoginProvider;

/// Templates without a `kind` field are treated as this provider.
pub const DEFAULT_PROVIDER_KIND: &str = "quark";

#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LoginProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn LoginProvider>) {
        self.providers.insert(provider.kind().to_string(), provider);
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn LoginProvider>> {
        self.providers.get(kind).cloned()
    }

    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.providers.keys().cloned().collect();
        kinds.sort();
        kinds
    }

    /// Pick the implementation a provider template asks for.
    pub fn for_template(&self, template: &JsonValue) -> ProviderResult<Arc<dyn LoginProvider>> {
        let kind = template
            .get("kind")
            .and_then(JsonValue::as_str)
            .map(str::trim)
            .filter(|kind| !kind.is_empty())
            .unwrap_or(DEFAULT_PROVIDER_KIND);
        self.get(kind)
            .ok_or_else(|| ProviderError::Unsupported(kind.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::config::DisplayFields;
    use crate::provider::LoginCtx;

    struct Named(&'static str);

    #[async_trait]
    impl LoginProvider for Named {
        fn kind(&self) -> &'static str {
            self.0
        }

        fn validate(&self, _login_config: &JsonValue) -> ProviderResult<()> {
            Ok(())
        }

        fn describe(&self, _login_config: &JsonValue) -> DisplayFields {
            DisplayFields::default()
        }

        async fn attempt_login(
            &self,
            _ctx: &LoginCtx,
            _login_config: &JsonValue,
            _token: &str,
        ) -> ProviderResult<bool> {
            Ok(true)
        }
    }

    fn registry() -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(Named("quark")));
        registry.register(Arc::new(Named("other")));
        registry
    }

    #[test]
    fn template_without_kind_uses_default() {
        let provider = registry().for_template(&json!({"redirect_uri": "x"})).unwrap();
        assert_eq!(provider.kind(), "quark");
    }

    #[test]
    fn template_kind_selects_provider() {
        let provider = registry().for_template(&json!({"kind": "other"})).unwrap();
        assert_eq!(provider.kind(), "other");
    }

    #[test]
    fn unknown_kind_is_unsupported() {
        let err = registry()
            .for_template(&json!({"kind": "baidu"}))
            .err()
            .unwrap();
        assert_eq!(err, ProviderError::Unsupported("baidu".to_string()));
        assert_eq!(registry().kinds(), vec!["other", "quark"]);
    }
}
