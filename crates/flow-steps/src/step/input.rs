use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_CONNECTION_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 60000;

/// Inputs of the generic API call step, as configured by a workflow designer.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct StepInput {
    /// HTTP verb, used when `url.method` is empty
    #[serde(deserialize_with = "nullable")]
    pub method: String,

    /// URL template, path variables and verb
    #[serde(deserialize_with = "nullable")]
    pub url: UrlConfig,

    /// Request headers, as a mapping or `key=value,key=value` text
    #[serde(deserialize_with = "nullable")]
    pub headers: RawCollection,

    /// Query parameters (verbs) or named action arguments (actions)
    #[serde(deserialize_with = "nullable")]
    pub params: RawCollection,

    /// Request body, as JSON text or a structured value
    #[serde(deserialize_with = "nullable")]
    pub body: RawBody,

    /// Opaque value echoed back to the callback
    #[serde(deserialize_with = "nullable")]
    pub callback_data: String,

    /// Name of the registered callback handler
    #[serde(deserialize_with = "nullable")]
    pub callbacks: String,

    /// Event the callback handler is bound to
    #[serde(deserialize_with = "nullable")]
    pub events: String,

    #[serde(deserialize_with = "nullable")]
    pub follow_redirects: bool,

    #[serde(deserialize_with = "nullable")]
    pub download: bool,

    #[serde(deserialize_with = "nullable")]
    pub full_response: bool,

    #[serde(deserialize_with = "nullable")]
    pub file_name: String,

    /// Connect timeout in milliseconds
    #[serde(deserialize_with = "nullable")]
    pub connection_timeout: u64,

    /// Read timeout in milliseconds
    #[serde(deserialize_with = "nullable")]
    pub read_timeout: u64,

    /// Named document operation
    #[serde(deserialize_with = "nullable")]
    pub action: String,
}

impl Default for StepInput {
    fn default() -> Self {
        Self {
            method: String::new(),
            url: UrlConfig::default(),
            headers: RawCollection::default(),
            params: RawCollection::default(),
            body: RawBody::default(),
            callback_data: String::new(),
            callbacks: String::new(),
            events: String::new(),
            follow_redirects: false,
            download: false,
            full_response: false,
            file_name: String::new(),
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT_MS,
            read_timeout: DEFAULT_READ_TIMEOUT_MS,
            action: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct UrlConfig {
    /// URL with `{name}` placeholders
    #[serde(deserialize_with = "nullable")]
    pub url_value: String,

    /// Values for the placeholders, keyed by name
    #[serde(deserialize_with = "path_variables")]
    pub params_value: Map<String, Value>,

    #[serde(deserialize_with = "nullable")]
    pub method: String,
}

/// A key/value collection as it arrives from the designer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RawCollection {
    Map(Map<String, Value>),
    List(Vec<String>),
    Text(String),
}

impl Default for RawCollection {
    fn default() -> Self {
        RawCollection::Map(Map::new())
    }
}

impl From<&str> for RawCollection {
    fn from(text: &str) -> Self {
        RawCollection::Text(text.to_string())
    }
}

impl From<Map<String, Value>> for RawCollection {
    fn from(map: Map<String, Value>) -> Self {
        RawCollection::Map(map)
    }
}

/// A request body as it arrives from the designer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RawBody {
    Text(String),
    Structured(Value),
}

impl Default for RawBody {
    fn default() -> Self {
        RawBody::Structured(Value::Object(Map::new()))
    }
}

impl From<&str> for RawBody {
    fn from(text: &str) -> Self {
        RawBody::Text(text.to_string())
    }
}

/// Inputs of the dedicated generate PDF step.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratePdfInput {
    /// Template source
    #[serde(deserialize_with = "nullable")]
    pub template: String,

    /// Data the template is rendered with
    pub data: Value,

    /// Page and output settings
    pub settings: Value,

    #[serde(deserialize_with = "nullable")]
    pub callback_data: String,

    #[serde(deserialize_with = "nullable")]
    pub callbacks: String,

    #[serde(deserialize_with = "nullable")]
    pub events: String,
}

/// Treats an explicit `null` like a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Path variables arrive as an object, as `null`, or as a list of
/// `key=value` strings and single-entry objects.
fn path_variables<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    let mut variables = Map::new();
    match raw {
        Some(Value::Object(map)) => variables = map,
        Some(Value::Array(items)) => {
            for item in items {
                match item {
                    Value::Object(map) => variables.extend(map),
                    Value::String(pair) => {
                        let (key, value) = pair.split_once('=').unwrap_or((pair.as_str(), ""));
                        variables.insert(key.to_string(), Value::String(value.to_string()));
                    }
                    _ => {}
                }
            }
        }
        Some(Value::Null) | None => {}
        Some(other) => {
            return Err(serde::de::Error::custom(format!(
                "paramsValue must be an object or a list, got {}",
                other
            )))
        }
    }
    Ok(variables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_fields_take_defaults() {
        let input: StepInput = serde_json::from_value(json!({})).unwrap();
        assert_eq!(input.connection_timeout, DEFAULT_CONNECTION_TIMEOUT_MS);
        assert_eq!(input.read_timeout, DEFAULT_READ_TIMEOUT_MS);
        assert!(!input.download);
        assert_eq!(input.headers, RawCollection::Map(Map::new()));
        assert_eq!(input.body, RawBody::Structured(json!({})));
        assert!(input.url.url_value.is_empty());
    }

    #[test]
    fn test_nulls_are_treated_as_missing() {
        let input: StepInput = serde_json::from_value(json!({
            "callbackData": null,
            "headers": null,
            "readTimeout": null,
            "url": {"urlValue": "/a", "paramsValue": null, "method": null}
        }))
        .unwrap();
        assert!(input.callback_data.is_empty());
        assert_eq!(input.read_timeout, 0);
        assert!(input.url.params_value.is_empty());
        assert_eq!(input.url.url_value, "/a");
    }

    #[test]
    fn test_collections_accept_every_shape() {
        let input: StepInput = serde_json::from_value(json!({
            "headers": "a=1,b=2",
            "params": ["x=1", "y=2"],
            "body": "{\"x\":1}"
        }))
        .unwrap();
        assert_eq!(input.headers, RawCollection::Text("a=1,b=2".into()));
        assert_eq!(input.params, RawCollection::List(vec!["x=1".into(), "y=2".into()]));
        assert_eq!(input.body, RawBody::Text("{\"x\":1}".into()));

        let input: StepInput = serde_json::from_value(json!({
            "headers": {"accept": "application/json"},
            "body": {"x": 1}
        }))
        .unwrap();
        assert!(matches!(input.headers, RawCollection::Map(_)));
        assert_eq!(input.body, RawBody::Structured(json!({"x": 1})));
    }

    #[test]
    fn test_path_variables_from_list() {
        let url: UrlConfig = serde_json::from_value(json!({
            "urlValue": "/users/{id}/files/{file}",
            "paramsValue": ["id=7", {"file": "a.pdf"}]
        }))
        .unwrap();
        assert_eq!(url.params_value.get("id"), Some(&json!("7")));
        assert_eq!(url.params_value.get("file"), Some(&json!("a.pdf")));
    }

    #[test]
    fn test_path_variables_reject_scalars() {
        let result: Result<UrlConfig, _> = serde_json::from_value(json!({"paramsValue": 3}));
        assert!(result.is_err());
    }
}
