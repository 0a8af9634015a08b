use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Read-only key/value bag describing one package.
///
/// Accessors never fail: a missing key or a value of the wrong shape reads as
/// absent, so metrics can treat any subset of keys as optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageMetadata {
    fields: Map<String, Value>,
}

impl PackageMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Anything other than a JSON object yields an empty bag.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self { fields },
            _ => Self::default(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// First non-blank string among `keys`.
    pub fn first_str(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|k| self.str(k))
    }

    /// Numbers, or strings holding a number.
    pub fn f64(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|v| v.is_finite())
    }

    pub fn array(&self, key: &str) -> &[Value] {
        match self.get(key) {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        }
    }

    pub fn object(&self, key: &str) -> Option<&Map<String, Value>> {
        self.get(key).and_then(Value::as_object)
    }

    /// Lowercased documentation text (`readme`, falling back to `description`).
    pub fn doc_text(&self) -> String {
        self.first_str(&["readme", "description"])
            .map(str::to_lowercase)
            .unwrap_or_default()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

impl From<Map<String, Value>> for PackageMetadata {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

/// File name from either a bare string or an object with `filename`/`path`.
pub fn file_name(entry: &Value) -> Option<&str> {
    match entry {
        Value::String(s) => Some(s.as_str()),
        Value::Object(obj) => obj
            .get("filename")
            .or_else(|| obj.get("path"))
            .and_then(Value::as_str),
        _ => None,
    }
}
