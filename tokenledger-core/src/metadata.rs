use serde_json::{Map, Value};

/// Keys requested from a metadata map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataKeys {
    /// Space-delimited key names.
    Delimited(String),
    List(Vec<String>),
}

impl MetadataKeys {
    fn names(&self) -> Vec<&str> {
        match self {
            MetadataKeys::Delimited(keys) => keys.split(' ').collect(),
            MetadataKeys::List(keys) => keys.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for MetadataKeys {
    fn from(keys: &str) -> Self {
        MetadataKeys::Delimited(keys.to_string())
    }
}

impl From<String> for MetadataKeys {
    fn from(keys: String) -> Self {
        MetadataKeys::Delimited(keys)
    }
}

impl From<Vec<String>> for MetadataKeys {
    fn from(keys: Vec<String>) -> Self {
        MetadataKeys::List(keys)
    }
}

impl From<Vec<&str>> for MetadataKeys {
    fn from(keys: Vec<&str>) -> Self {
        MetadataKeys::List(keys.into_iter().map(str::to_string).collect())
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Copy of `metadata` reduced to the requested keys.
///
/// Keys that are absent or hold an empty/false/zero/null value are left out.
/// Empty names from repeated spaces are skipped.
pub fn minimize_metadata(
    metadata: &Map<String, Value>,
    keys: impl Into<MetadataKeys>,
) -> Map<String, Value> {
    let keys = keys.into();
    let mut minimized = Map::new();

    for key in keys.names() {
        if key.is_empty() {
            continue;
        }
        if let Some(value) = metadata.get(key) {
            if is_truthy(value) {
                minimized.insert(key.to_string(), value.clone());
            }
        }
    }

    minimized
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata() -> Map<String, Value> {
        match json!({
            "user_id": "u-123",
            "request_id": "r-9",
            "api_key": "secret",
            "empty": "",
            "zero": 0,
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_minimize_with_delimited_keys() {
        let minimized = minimize_metadata(&metadata(), "user_id  request_id missing");
        assert_eq!(
            Value::Object(minimized),
            json!({"user_id": "u-123", "request_id": "r-9"})
        );
    }

    #[test]
    fn test_minimize_with_key_list() {
        let minimized = minimize_metadata(&metadata(), vec!["api_key", "", "empty", "zero"]);
        assert_eq!(Value::Object(minimized), json!({"api_key": "secret"}));
    }

    #[test]
    fn test_minimize_with_no_keys() {
        assert!(minimize_metadata(&metadata(), "").is_empty());
        assert!(minimize_metadata(&metadata(), Vec::<String>::new()).is_empty());
    }
}
