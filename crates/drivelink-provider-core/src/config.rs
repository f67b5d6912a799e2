use serde::Serialize;
use serde_json::Value as JsonValue;

/// Look up a dotted path (`data.client_id`) inside a JSON object.
pub fn lookup<'a>(config: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    path.split('.')
        .try_fold(config, |value, segment| value.as_object()?.get(segment))
}

/// Text form of a scalar field. Numbers are accepted since admins often type
/// `"v": 1.2` without quotes.
pub fn lookup_text(config: &JsonValue, path: &str) -> Option<String> {
    match lookup(config, path)? {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Paths from `required` that are absent, null, or not a scalar.
pub fn missing_fields(config: &JsonValue, required: &[&str]) -> Vec<String> {
    required
        .iter()
        .filter(|path| lookup_text(config, path).is_none())
        .map(|path| path.to_string())
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplayField {
    pub label: String,
    pub value: String,
}

/// Non-secret fields shown to a link visitor before they log in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DisplayFields(pub Vec<DisplayField>);

impl DisplayFields {
    pub fn push(&mut self, label: impl Into<String>, value: impl Into<String>) {
        self.0.push(DisplayField {
            label: label.into(),
            value: value.into(),
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &DisplayField> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dotted_lookup_walks_objects() {
        let config = json!({"data": {"client_id": "532", "v": 1.2}, "queryParams": ""});
        assert_eq!(lookup_text(&config, "data.client_id").as_deref(), Some("532"));
        assert_eq!(lookup_text(&config, "data.v").as_deref(), Some("1.2"));
        assert_eq!(lookup_text(&config, "queryParams").as_deref(), Some(""));
        assert!(lookup(&config, "data.client_id.deeper").is_none());
    }

    #[test]
    fn missing_fields_lists_absent_and_null() {
        let config = json!({"data": {"client_id": null}, "queryParams": "a=1"});
        let missing = missing_fields(&config, &["data.client_id", "data.v", "queryParams"]);
        assert_eq!(missing, vec!["data.client_id", "data.v"]);
    }

    #[test]
    fn objects_are_not_scalar_fields() {
        let config = json!({"data": {"client_id": {"nested": true}}});
        assert_eq!(missing_fields(&config, &["data.client_id"]), vec!["data.client_id"]);
    }
}
