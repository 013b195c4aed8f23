use serde::Serialize;
use serde_json::{Map, Value};

use super::input::{StepInput, DEFAULT_CONNECTION_TIMEOUT_MS, DEFAULT_READ_TIMEOUT_MS};
use super::normalize::{
    build_callback, normalize_body, normalize_collection, resolve_path, wrap_callback_data,
};
use crate::{
    callback::{CallbackData, CallbackRegistry, CallbackSpec, FILE_DOWNLOADED_EVENT},
    Result,
};

/// Normalized request handed to the transport.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
    pub path: String,
    pub params: Map<String, Value>,
    pub headers: Map<String, Value>,
    pub body: Value,
    pub follow_redirects: bool,
    pub force_download: bool,
    pub download_sync: bool,
    pub file_name: String,
    pub full_response: bool,
    pub connection_timeout: u64,
    pub read_timeout: u64,
    pub default_callback: bool,
}

impl RequestOptions {
    /// Build the options for one invocation, applying every default.
    ///
    /// An `events` value of `fileDownloaded` forces an asynchronous download
    /// regardless of the `download` flag.
    pub fn from_input(input: &StepInput) -> Result<Self> {
        let file_download = input.events == FILE_DOWNLOADED_EVENT;

        Ok(Self {
            path: resolve_path(&input.url.url_value, &input.url.params_value)?,
            params: normalize_collection(&input.params),
            headers: normalize_collection(&input.headers),
            body: normalize_body(&input.body)?,
            follow_redirects: input.follow_redirects,
            force_download: file_download || input.download,
            download_sync: !file_download && input.download,
            file_name: input.file_name.clone(),
            full_response: input.full_response,
            connection_timeout: or_default(input.connection_timeout, DEFAULT_CONNECTION_TIMEOUT_MS),
            read_timeout: or_default(input.read_timeout, DEFAULT_READ_TIMEOUT_MS),
            default_callback: !input.events.is_empty(),
        })
    }
}

fn or_default(value: u64, default: u64) -> u64 {
    if value == 0 {
        default
    } else {
        value
    }
}

/// Everything a dispatch needs, derived once from a [`StepInput`].
#[derive(Debug, Clone)]
pub struct NormalizedStep {
    pub options: RequestOptions,
    pub callback_data: Option<CallbackData>,
    pub callbacks: Option<CallbackSpec>,
}

impl NormalizedStep {
    pub fn from_input(input: &StepInput, registry: &CallbackRegistry) -> Result<Self> {
        let options = RequestOptions::from_input(input)?;
        let callbacks = build_callback(registry, &input.events, &input.callbacks)?;
        Ok(Self {
            options,
            callback_data: wrap_callback_data(&input.callback_data),
            callbacks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::input::{RawBody, RawCollection};
    use crate::Error;
    use serde_json::json;

    fn input(value: Value) -> StepInput {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_defaults() {
        let options = RequestOptions::from_input(&StepInput::default()).unwrap();
        assert_eq!(options.path, "");
        assert!(options.params.is_empty());
        assert!(options.headers.is_empty());
        assert_eq!(options.body, json!({}));
        assert!(!options.follow_redirects);
        assert!(!options.force_download);
        assert!(!options.download_sync);
        assert!(!options.full_response);
        assert!(!options.default_callback);
        assert_eq!(options.connection_timeout, 5000);
        assert_eq!(options.read_timeout, 60000);
    }

    #[test]
    fn test_zero_timeouts_fall_back_to_defaults() {
        let options = RequestOptions::from_input(&input(json!({
            "connectionTimeout": 0,
            "readTimeout": 1500
        })))
        .unwrap();
        assert_eq!(options.connection_timeout, 5000);
        assert_eq!(options.read_timeout, 1500);
    }

    #[test]
    fn test_download_flags() {
        let sync = RequestOptions::from_input(&input(json!({"download": true}))).unwrap();
        assert!(sync.force_download);
        assert!(sync.download_sync);
        assert!(!sync.default_callback);

        let evented = RequestOptions::from_input(&input(json!({
            "download": false,
            "events": "fileDownloaded"
        })))
        .unwrap();
        assert!(evented.force_download);
        assert!(!evented.download_sync);
        assert!(evented.default_callback);

        let plain = RequestOptions::from_input(&input(json!({"events": "httpResponse"}))).unwrap();
        assert!(!plain.force_download);
        assert!(!plain.download_sync);
        assert!(plain.default_callback);
    }

    #[test]
    fn test_normalizes_every_field() {
        let step = StepInput {
            headers: RawCollection::Text("accept=application/json".into()),
            params: RawCollection::Text("page=2".into()),
            body: RawBody::Text(r#"{"name":"invoice"}"#.into()),
            file_name: "out.pdf".into(),
            ..input(json!({
                "url": {"urlValue": "/files/{id}", "paramsValue": {"id": "f-1"}}
            }))
        };
        let options = RequestOptions::from_input(&step).unwrap();
        assert_eq!(options.path, "/files/f-1");
        assert_eq!(Value::Object(options.headers), json!({"accept": "application/json"}));
        assert_eq!(Value::Object(options.params), json!({"page": "2"}));
        assert_eq!(options.body, json!({"name": "invoice"}));
        assert_eq!(options.file_name, "out.pdf");
    }

    #[test]
    fn test_parse_errors_fail_the_step() {
        let step = StepInput {
            body: RawBody::Text("{broken".into()),
            ..StepInput::default()
        };
        assert!(matches!(RequestOptions::from_input(&step), Err(Error::Parse(_))));
    }

    #[test]
    fn test_normalized_step_carries_callbacks() {
        let registry = CallbackRegistry::with_builtins();
        let step = NormalizedStep::from_input(
            &input(json!({"callbackData": "rec-1", "callbacks": "log", "events": "httpResponse"})),
            &registry,
        )
        .unwrap();
        assert_eq!(step.callback_data, Some(CallbackData { record: "rec-1".into() }));
        assert_eq!(step.callbacks.map(|c| c.event), Some("httpResponse".to_string()));

        let bare = NormalizedStep::from_input(&StepInput::default(), &registry).unwrap();
        assert!(bare.callback_data.is_none());
        assert!(bare.callbacks.is_none());
    }
}
