use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use super::{HttpVerb, Transport};
use crate::{
    callback::{
        notify, CallbackData, CallbackEvent, CallbackSpec, FILE_DOWNLOADED_EVENT,
        HTTP_RESPONSE_EVENT,
    },
    config::HttpConfig,
    step::RequestOptions,
    Error, Result,
};

const MAX_REDIRECTS: usize = 10;
const FALLBACK_FILE_NAME: &str = "download";

/// reqwest backed [`Transport`].
///
/// A client is built per request since redirect policy and connect timeout
/// are per-step settings.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: Option<Url>,
    download_dir: PathBuf,
    user_agent: String,
}

impl HttpTransport {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .as_deref()
            .map(|raw| {
                Url::parse(raw).map_err(|e| Error::Config(format!("invalid HTTP base url '{}': {}", raw, e)))
            })
            .transpose()?;

        Ok(Self {
            base_url,
            download_dir: config.download_dir.clone(),
            user_agent: config.user_agent.clone(),
        })
    }

    fn resolve_url(&self, path: &str) -> Result<Url> {
        if let Ok(url) = Url::parse(path) {
            return Ok(url);
        }

        let base = self.base_url.as_ref().ok_or_else(|| {
            Error::Config(format!(
                "'{}' is not an absolute url and no HTTP base url is configured",
                path
            ))
        })?;

        let joined = format!(
            "{}/{}",
            base.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined).map_err(|e| Error::Config(format!("invalid url '{}': {}", joined, e)))
    }

    fn build_client(&self, options: &RequestOptions) -> Result<reqwest::Client> {
        let redirect = if options.follow_redirects {
            Policy::limited(MAX_REDIRECTS)
        } else {
            Policy::none()
        };

        Ok(reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(options.connection_timeout))
            .timeout(Duration::from_millis(options.read_timeout))
            .redirect(redirect)
            .user_agent(self.user_agent.clone())
            .build()?)
    }

    /// Each download lands in its own directory so equal file names never
    /// overwrite each other.
    async fn save_download(&self, url: &Url, options: &RequestOptions, bytes: &[u8]) -> Result<(String, PathBuf)> {
        let file_name = download_file_name(&options.file_name, url);
        let dir = self.download_dir.join(Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(&file_name);
        tokio::fs::write(&path, bytes).await?;
        Ok((file_name, path))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(
        &self,
        verb: HttpVerb,
        options: RequestOptions,
        callback_data: Option<CallbackData>,
        callbacks: Option<CallbackSpec>,
    ) -> Result<Value> {
        let url = self.resolve_url(&options.path)?;
        info!(%verb, %url, "sending request");

        let client = self.build_client(&options)?;
        let mut request = client
            .request(verb.as_method(), url.clone())
            .headers(header_map(&options.headers)?);

        if !options.params.is_empty() {
            request = request.query(&query_pairs(&options.params));
        }
        if has_body(&options.body) {
            request = request.json(&options.body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(%verb, %url, status = status.as_u16(), "request returned an error status");
        }

        if options.force_download {
            let response = response.error_for_status()?;
            let bytes = response.bytes().await?;
            let (file_name, path) = self.save_download(&url, &options, &bytes).await?;
            if options.download_sync {
                info!(path = %path.display(), size = bytes.len(), "download saved");
            } else {
                info!(path = %path.display(), size = bytes.len(), "download saved, notifying fileDownloaded");
            }

            let result = json!({
                "status": status.as_u16(),
                "fileName": file_name,
                "path": path.display().to_string(),
                "size": bytes.len(),
                "sync": options.download_sync,
            });
            notify(
                callbacks.as_ref(),
                &CallbackEvent::new(FILE_DOWNLOADED_EVENT, result.clone()),
                callback_data.as_ref(),
            )?;
            return Ok(result);
        }

        let headers = response_headers(response.headers());
        let text = response.text().await?;
        let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));
        debug!(status = status.as_u16(), "response received");

        let result = if options.full_response {
            json!({
                "status": status.as_u16(),
                "headers": headers,
                "body": body,
            })
        } else {
            body
        };

        notify(
            callbacks.as_ref(),
            &CallbackEvent::new(HTTP_RESPONSE_EVENT, result.clone()),
            callback_data.as_ref(),
        )?;
        Ok(result)
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn header_map(headers: &Map<String, Value>) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (key, value) in headers {
        let name = HeaderName::try_from(key.trim())
            .map_err(|e| Error::Validation(format!("invalid header name '{}': {}", key, e)))?;
        let value = HeaderValue::try_from(value_to_text(value))
            .map_err(|e| Error::Validation(format!("invalid value for header '{}': {}", key, e)))?;
        map.insert(name, value);
    }
    Ok(map)
}

fn query_pairs(params: &Map<String, Value>) -> Vec<(String, String)> {
    params
        .iter()
        .map(|(key, value)| (key.clone(), value_to_text(value)))
        .collect()
}

fn has_body(body: &Value) -> bool {
    match body {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}

fn response_headers(headers: &HeaderMap) -> Map<String, Value> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                Value::String(String::from_utf8_lossy(value.as_bytes()).into_owned()),
            )
        })
        .collect()
}

/// The configured name, or the last url segment, stripped of any directories.
fn download_file_name(configured: &str, url: &Url) -> String {
    let candidate = if configured.trim().is_empty() {
        url.path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .unwrap_or(FALLBACK_FILE_NAME)
            .to_string()
    } else {
        configured.trim().to_string()
    };

    Path::new(&candidate)
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string())
}
