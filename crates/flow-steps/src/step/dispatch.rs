use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::input::{GeneratePdfInput, StepInput};
use super::normalize::{build_callback, wrap_callback_data};
use super::options::NormalizedStep;
use crate::{
    callback::{CallbackData, CallbackRegistry, CallbackSpec},
    documents::{DocumentAction, PdfGenerator},
    metrics,
    transport::{HttpVerb, Transport},
    Result,
};

/// Where a step invocation was routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Verb(HttpVerb),
    Action(DocumentAction),
}

impl Route {
    /// A recognized verb wins over a configured action.
    pub fn select(input: &StepInput) -> Option<Self> {
        let method = if input.url.method.trim().is_empty() {
            &input.method
        } else {
            &input.url.method
        };

        if let Some(verb) = HttpVerb::from_name(method) {
            if !input.action.trim().is_empty() {
                debug!(%verb, action = %input.action, "verb and action both configured, using verb");
            }
            return Some(Route::Verb(verb));
        }

        DocumentAction::from_identifier(&input.action).map(Route::Action)
    }
}

/// Runs flow steps against the HTTP transport and the document endpoint.
pub struct StepDispatcher {
    transport: Arc<dyn Transport>,
    documents: PdfGenerator,
    callbacks: CallbackRegistry,
}

impl StepDispatcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        documents: PdfGenerator,
        callbacks: CallbackRegistry,
    ) -> Self {
        Self {
            transport,
            documents,
            callbacks,
        }
    }

    /// The generic API call step.
    ///
    /// Returns `None` when neither the verb nor the action is recognized.
    pub async fn api_call(&self, input: &StepInput) -> Result<Option<Value>> {
        let invocation = Uuid::new_v4();
        let span = info_span!("api_call", %invocation);
        async {
            metrics::record_step("api_call");
            let result = self.run_api_call(input).await;
            if result.is_err() {
                metrics::record_failure("api_call");
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_api_call(&self, input: &StepInput) -> Result<Option<Value>> {
        let step = NormalizedStep::from_input(input, &self.callbacks)?;

        match Route::select(input) {
            Some(Route::Verb(verb)) => {
                info!(%verb, path = %step.options.path, "dispatching http request");
                metrics::record_dispatch(verb.as_str());
                let result = self
                    .transport
                    .request(verb, step.options, step.callback_data, step.callbacks)
                    .await?;
                Ok(Some(result))
            }
            Some(Route::Action(action)) => {
                info!(%action, "dispatching document action");
                metrics::record_dispatch(action.name());
                let result = self
                    .dispatch_action(action, &step.options.params, step.callback_data, step.callbacks)
                    .await?;
                Ok(Some(result))
            }
            None => {
                warn!(
                    method = %input.url.method,
                    action = %input.action,
                    "step matched neither a verb nor an action"
                );
                Ok(None)
            }
        }
    }

    /// Pulls the action's named arguments out of `params` and runs it.
    pub async fn dispatch_action(
        &self,
        action: DocumentAction,
        params: &Map<String, Value>,
        callback_data: Option<CallbackData>,
        callbacks: Option<CallbackSpec>,
    ) -> Result<Value> {
        let docs = &self.documents;
        match action {
            DocumentAction::GeneratePdf => {
                let template = match params.get("template") {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Null) | None => String::new(),
                    Some(other) => other.to_string(),
                };
                docs.generate_pdf(
                    &template,
                    structured(params, "data"),
                    structured(params, "settings"),
                    callback_data,
                    callbacks,
                )
                .await
            }
            DocumentAction::MergeDocuments => {
                docs.merge_documents(structured(params, "documents"), callback_data, callbacks)
                    .await
            }
            DocumentAction::SplitDocument => {
                docs.split_document(
                    plain(params, "fileId"),
                    plain(params, "interval"),
                    callback_data,
                    callbacks,
                )
                .await
            }
            DocumentAction::ReplaceHeaderAndFooter => {
                docs.replace_header_and_footer(
                    plain(params, "fileId"),
                    structured(params, "settings"),
                    callback_data,
                    callbacks,
                )
                .await
            }
            DocumentAction::FillForm => {
                docs.fill_form(
                    plain(params, "fileId"),
                    structured(params, "settings"),
                    callback_data,
                    callbacks,
                )
                .await
            }
            DocumentAction::FillFormSync => {
                docs.fill_form_sync(
                    plain(params, "fileId"),
                    structured(params, "settings"),
                    callback_data,
                    callbacks,
                )
                .await
            }
            DocumentAction::ReplaceImages => {
                docs.replace_images(
                    plain(params, "fileId"),
                    structured(params, "settings"),
                    callback_data,
                    callbacks,
                )
                .await
            }
            DocumentAction::AddImages => {
                docs.add_images(
                    plain(params, "fileId"),
                    structured(params, "settings"),
                    callback_data,
                    callbacks,
                )
                .await
            }
            DocumentAction::ConvertPdfToImages => {
                docs.convert_pdf_to_images(
                    structured(params, "fileIds"),
                    plain(params, "dpi"),
                    structured(params, "settings"),
                    callback_data,
                    callbacks,
                )
                .await
            }
        }
    }

    /// The dedicated generate PDF step.
    pub async fn generate_pdf(&self, input: &GeneratePdfInput) -> Result<Value> {
        let invocation = Uuid::new_v4();
        let span = info_span!("generate_pdf", %invocation);
        async {
            metrics::record_step("generate_pdf");
            let result = self.run_generate_pdf(input).await;
            if result.is_err() {
                metrics::record_failure("generate_pdf");
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_generate_pdf(&self, input: &GeneratePdfInput) -> Result<Value> {
        let callbacks = build_callback(&self.callbacks, &input.events, &input.callbacks)?;
        metrics::record_dispatch(DocumentAction::GeneratePdf.name());
        self.documents
            .generate_pdf(
                &input.template,
                input.data.clone(),
                input.settings.clone(),
                wrap_callback_data(&input.callback_data),
                callbacks,
            )
            .await
    }
}

fn plain(params: &Map<String, Value>, key: &str) -> Value {
    params.get(key).cloned().unwrap_or(Value::Null)
}

/// Like [`plain`], but JSON text coming from a `key=value` string is decoded.
fn structured(params: &Map<String, Value>, key: &str) -> Value {
    match params.get(key) {
        Some(Value::String(text)) => {
            serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.clone()))
        }
        Some(value) => value.clone(),
        None => Value::Null,
    }
}
