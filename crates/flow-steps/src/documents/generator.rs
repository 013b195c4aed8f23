use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{error, info};

use super::{DocumentAction, DocumentEndpoint};
use crate::{
    callback::{CallbackData, CallbackSpec},
    Error, Result,
};

const MAX_DPI: i64 = 600;

/// Public API of the PDF generator endpoint.
#[derive(Clone)]
pub struct PdfGenerator {
    endpoint: Arc<dyn DocumentEndpoint>,
}

impl PdfGenerator {
    pub fn new(endpoint: Arc<dyn DocumentEndpoint>) -> Self {
        Self { endpoint }
    }

    async fn forward(
        &self,
        action: DocumentAction,
        options: Value,
        callback_data: Option<CallbackData>,
        callbacks: Option<CallbackSpec>,
    ) -> Result<Value> {
        info!(%action, "forwarding to document endpoint");
        self.endpoint
            .call(action, options, callback_data, callbacks)
            .await
    }

    pub async fn generate_pdf(
        &self,
        template: &str,
        data: Value,
        settings: Value,
        callback_data: Option<CallbackData>,
        callbacks: Option<CallbackSpec>,
    ) -> Result<Value> {
        if template.trim().is_empty() {
            return Err(Error::Validation("Template can not be empty.".to_string()));
        }
        let options = json!({
            "template": template,
            "data": data,
            "settings": settings_or_empty(settings),
        });
        self.forward(DocumentAction::GeneratePdf, options, callback_data, callbacks)
            .await
    }

    /// Fails on the first entry without a file, or whose `start` page comes
    /// after its `end` page, before anything is sent.
    pub async fn merge_documents(
        &self,
        documents: Value,
        callback_data: Option<CallbackData>,
        callbacks: Option<CallbackSpec>,
    ) -> Result<Value> {
        validate_documents(&documents)?;
        let options = json!({ "documents": documents });
        self.forward(DocumentAction::MergeDocuments, options, callback_data, callbacks)
            .await
    }

    pub async fn split_document(
        &self,
        file_id: Value,
        interval: Value,
        callback_data: Option<CallbackData>,
        callbacks: Option<CallbackSpec>,
    ) -> Result<Value> {
        let options = json!({
            "fileId": file_id,
            "interval": interval,
        });
        self.forward(DocumentAction::SplitDocument, options, callback_data, callbacks)
            .await
    }

    pub async fn replace_header_and_footer(
        &self,
        file_id: Value,
        settings: Value,
        callback_data: Option<CallbackData>,
        callbacks: Option<CallbackSpec>,
    ) -> Result<Value> {
        let options = json!({
            "fileId": file_id,
            "settings": settings,
        });
        self.forward(DocumentAction::ReplaceHeaderAndFooter, options, callback_data, callbacks)
            .await
    }

    pub async fn fill_form(
        &self,
        file_id: Value,
        settings: Value,
        callback_data: Option<CallbackData>,
        callbacks: Option<CallbackSpec>,
    ) -> Result<Value> {
        self.file_with_settings(DocumentAction::FillForm, file_id, settings, callback_data, callbacks)
            .await
    }

    pub async fn fill_form_sync(
        &self,
        file_id: Value,
        settings: Value,
        callback_data: Option<CallbackData>,
        callbacks: Option<CallbackSpec>,
    ) -> Result<Value> {
        self.file_with_settings(DocumentAction::FillFormSync, file_id, settings, callback_data, callbacks)
            .await
    }

    pub async fn replace_images(
        &self,
        file_id: Value,
        settings: Value,
        callback_data: Option<CallbackData>,
        callbacks: Option<CallbackSpec>,
    ) -> Result<Value> {
        self.file_with_settings(DocumentAction::ReplaceImages, file_id, settings, callback_data, callbacks)
            .await
    }

    pub async fn add_images(
        &self,
        file_id: Value,
        settings: Value,
        callback_data: Option<CallbackData>,
        callbacks: Option<CallbackSpec>,
    ) -> Result<Value> {
        self.file_with_settings(DocumentAction::AddImages, file_id, settings, callback_data, callbacks)
            .await
    }

    pub async fn convert_pdf_to_images(
        &self,
        file_ids: Value,
        dpi: Value,
        settings: Value,
        callback_data: Option<CallbackData>,
        callbacks: Option<CallbackSpec>,
    ) -> Result<Value> {
        if let Some(dpi) = page_index(&dpi) {
            if dpi > MAX_DPI {
                return Err(Error::Validation(format!(
                    "DPI cannot be greater than {}.",
                    MAX_DPI
                )));
            }
        }
        let options = json!({
            "fileIds": file_ids,
            "dpi": dpi,
            "settings": settings,
        });
        self.forward(DocumentAction::ConvertPdfToImages, options, callback_data, callbacks)
            .await
    }

    async fn file_with_settings(
        &self,
        action: DocumentAction,
        file_id: Value,
        settings: Value,
        callback_data: Option<CallbackData>,
        callbacks: Option<CallbackSpec>,
    ) -> Result<Value> {
        let options = json!({
            "fileId": file_id,
            "settings": settings_or_empty(settings),
        });
        self.forward(action, options, callback_data, callbacks).await
    }
}

fn settings_or_empty(settings: Value) -> Value {
    if settings.is_object() {
        settings
    } else {
        Value::Object(Map::new())
    }
}

fn validate_documents(documents: &Value) -> Result<()> {
    let entries = documents
        .as_array()
        .ok_or_else(|| Error::Validation(format!("documents must be a list, got {}", documents)))?;

    for doc in entries {
        let has_file = doc.get("file").map(is_present).unwrap_or(false);
        let inverted = match (
            doc.get("start").and_then(page_index),
            doc.get("end").and_then(page_index),
        ) {
            (Some(start), Some(end)) => start > end,
            _ => false,
        };
        if !has_file || inverted {
            error!(document = %doc, "invalid document settings");
            return Err(Error::Validation(format!(
                "Invalid document settings for {}",
                doc
            )));
        }
    }
    Ok(())
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Integer value of a number or of the leading digits of a string.
fn page_index(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            let sign_len = usize::from(s.starts_with('-') || s.starts_with('+'));
            let digits = s[sign_len..]
                .find(|c: char| !c.is_ascii_digit())
                .map(|end| sign_len + end)
                .unwrap_or(s.len());
            s[..digits].parse().ok()
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::MockDocumentEndpoint;
    use mockall::predicate::eq;
    use tokio_test::{assert_err, assert_ok};

    fn generator(mock: MockDocumentEndpoint) -> PdfGenerator {
        PdfGenerator::new(Arc::new(mock))
    }

    #[tokio::test]
    async fn test_merge_rejects_inverted_page_range() {
        let mut mock = MockDocumentEndpoint::new();
        mock.expect_call().never();

        let err = generator(mock)
            .merge_documents(json!([{"file": "f1", "start": 5, "end": 2}]), None, None)
            .await
            .unwrap_err();
        match err {
            Error::Validation(msg) => assert!(msg.contains("\"file\":\"f1\"")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_merge_rejects_missing_file_before_any_call() {
        let mut mock = MockDocumentEndpoint::new();
        mock.expect_call().never();

        let result = generator(mock)
            .merge_documents(
                json!([{"file": "f1"}, {"start": 1, "end": 2}, {"file": "f3", "start": 9, "end": 1}]),
                None,
                None,
            )
            .await;
        assert!(matches!(result, Err(Error::Validation(msg)) if msg.contains("\"start\":1")));
    }

    #[tokio::test]
    async fn test_merge_forwards_valid_documents() {
        let mut mock = MockDocumentEndpoint::new();
        mock.expect_call()
            .withf(|action, options, _, _| {
                *action == DocumentAction::MergeDocuments
                    && *options == json!({"documents": [{"file": "f1", "start": 1, "end": 5}]})
            })
            .times(1)
            .returning(|_, _, _, _| Ok(json!({"status": "ok"})));

        let result = generator(mock)
            .merge_documents(json!([{"file": "f1", "start": 1, "end": 5}]), None, None)
            .await
            .unwrap();
        assert_eq!(result, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_merge_compares_pages_numerically() {
        let mut mock = MockDocumentEndpoint::new();
        mock.expect_call().times(1).returning(|_, _, _, _| Ok(json!({})));

        // "10" > "9" as text would fail the range check
        assert_ok!(
            generator(mock)
                .merge_documents(json!([{"file": "f1", "start": "9", "end": "10"}]), None, None)
                .await
        );
    }

    #[tokio::test]
    async fn test_merge_requires_a_list() {
        let mut mock = MockDocumentEndpoint::new();
        mock.expect_call().never();
        let result = generator(mock)
            .merge_documents(json!({"file": "f1"}), None, None)
            .await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_generate_pdf_defaults_settings() {
        let mut mock = MockDocumentEndpoint::new();
        mock.expect_call()
            .with(
                eq(DocumentAction::GeneratePdf),
                eq(json!({"template": "<h1>${title}</h1>", "data": {"title": "Hi"}, "settings": {}})),
                eq(Some(CallbackData { record: "r".into() })),
                mockall::predicate::always(),
            )
            .times(1)
            .returning(|_, _, _, _| Ok(json!({"status": "ok"})));

        generator(mock)
            .generate_pdf(
                "<h1>${title}</h1>",
                json!({"title": "Hi"}),
                json!("landscape"),
                Some(CallbackData { record: "r".into() }),
                None,
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_generate_pdf_requires_template() {
        let mut mock = MockDocumentEndpoint::new();
        mock.expect_call().never();
        let result = generator(mock)
            .generate_pdf("  ", Value::Null, Value::Null, None, None)
            .await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_file_operations_default_settings() {
        let mut mock = MockDocumentEndpoint::new();
        mock.expect_call()
            .withf(|_, options, _, _| options["settings"] == json!({}) && options["fileId"] == json!("f1"))
            .times(4)
            .returning(|action, _, _, _| Ok(json!({"action": action.name()})));
        let generator = generator(mock);

        let filled = generator.fill_form(json!("f1"), Value::Null, None, None).await.unwrap();
        assert_eq!(filled, json!({"action": "fillForm"}));
        generator.fill_form_sync(json!("f1"), json!(3), None, None).await.unwrap();
        generator.replace_images(json!("f1"), Value::Null, None, None).await.unwrap();
        generator.add_images(json!("f1"), json!([1]), None, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_split_and_header_footer_options() {
        let mut mock = MockDocumentEndpoint::new();
        mock.expect_call()
            .with(
                eq(DocumentAction::SplitDocument),
                eq(json!({"fileId": "f1", "interval": 2})),
                eq(None),
                mockall::predicate::always(),
            )
            .times(1)
            .returning(|_, _, _, _| Ok(json!({})));
        mock.expect_call()
            .with(
                eq(DocumentAction::ReplaceHeaderAndFooter),
                eq(json!({"fileId": "f1", "settings": null})),
                eq(None),
                mockall::predicate::always(),
            )
            .times(1)
            .returning(|_, _, _, _| Ok(json!({})));
        let generator = generator(mock);

        generator.split_document(json!("f1"), json!(2), None, None).await.unwrap();
        generator
            .replace_header_and_footer(json!("f1"), Value::Null, None, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_convert_limits_dpi() {
        let mut mock = MockDocumentEndpoint::new();
        mock.expect_call()
            .withf(|action, options, _, _| {
                *action == DocumentAction::ConvertPdfToImages && options["dpi"] == json!(300)
            })
            .times(1)
            .returning(|_, _, _, _| Ok(json!({"status": "ok"})));
        let generator = generator(mock);

        let err = assert_err!(
            generator
                .convert_pdf_to_images(json!(["f1"]), json!(601), Value::Null, None, None)
                .await
        );
        assert!(matches!(err, Error::Validation(_)));

        assert_ok!(
            generator
                .convert_pdf_to_images(json!(["f1"]), json!(300), Value::Null, None, None)
                .await
        );
    }

    #[test]
    fn test_page_index() {
        assert_eq!(page_index(&json!(4)), Some(4));
        assert_eq!(page_index(&json!(4.7)), Some(4));
        assert_eq!(page_index(&json!("12")), Some(12));
        assert_eq!(page_index(&json!("7 pages")), Some(7));
        assert_eq!(page_index(&json!("-3")), Some(-3));
        assert_eq!(page_index(&json!("abc")), None);
        assert_eq!(page_index(&json!("")), None);
        assert_eq!(page_index(&Value::Null), None);
    }
}
