use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use super::{DocumentAction, DocumentEndpoint};
use crate::{
    callback::{notify, CallbackData, CallbackEvent, CallbackSpec, PDF_RESPONSE_EVENT},
    config::DocumentServiceConfig,
    Error, Result,
};

/// Calls the document service over HTTP: `POST <base>/_<action>` with
/// `{"params": <options>, "callbackData": <data>}`.
#[derive(Debug, Clone)]
pub struct HttpDocumentEndpoint {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpDocumentEndpoint {
    pub fn new(config: &DocumentServiceConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            Error::Config(format!(
                "invalid document service url '{}': {}",
                config.base_url, e
            ))
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self { base_url, client })
    }

    fn function_url(&self, action: DocumentAction) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            action.function_name()
        )
    }
}

#[async_trait]
impl DocumentEndpoint for HttpDocumentEndpoint {
    async fn call(
        &self,
        action: DocumentAction,
        options: Value,
        callback_data: Option<CallbackData>,
        callbacks: Option<CallbackSpec>,
    ) -> Result<Value> {
        let url = self.function_url(action);
        debug!(%action, %url, "calling document service");

        let payload = json!({
            "params": options,
            "callbackData": callback_data,
        });
        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        let text = response.text().await?;
        let result = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));

        notify(
            callbacks.as_ref(),
            &CallbackEvent::new(PDF_RESPONSE_EVENT, result.clone()),
            callback_data.as_ref(),
        )?;
        Ok(result)
    }
}
