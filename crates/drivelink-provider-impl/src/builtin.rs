use serde_json::{Value as JsonValue, json};

use crate::providers::{QUARK_KIND, QUARK_LOGIN_URL};

/// Provider template inserted at boot when no template of that name exists.
#[derive(Debug, Clone)]
pub struct BuiltinProviderSeed {
    pub name: &'static str,
    pub config_json: JsonValue,
    pub remarks: &'static str,
}

pub fn builtin_provider_seeds() -> Vec<BuiltinProviderSeed> {
    vec![BuiltinProviderSeed {
        name: QUARK_KIND,
        config_json: json!({
            "kind": QUARK_KIND,
            "redirect_uri": QUARK_LOGIN_URL,
            "data": {
                "client_id": "532",
                "v": "1.2",
            },
        }),
        remarks: "夸克网盘",
    }]
}
