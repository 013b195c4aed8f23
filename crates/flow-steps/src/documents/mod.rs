//! Document processing endpoint
//!
//! [`PdfGenerator`] is the public API steps call. It checks and assembles the
//! options record for each operation and forwards it to a
//! [`DocumentEndpoint`], which does the actual work remotely.

pub mod generator;
pub mod http;

pub use generator::PdfGenerator;
pub use http::HttpDocumentEndpoint;

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    callback::{CallbackData, CallbackSpec},
    Result,
};

const ACTION_PREFIX: &str = "app.endpoints.pdf-generator.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentAction {
    GeneratePdf,
    MergeDocuments,
    SplitDocument,
    ReplaceHeaderAndFooter,
    FillForm,
    FillFormSync,
    ReplaceImages,
    AddImages,
    ConvertPdfToImages,
}

impl DocumentAction {
    pub const ALL: [DocumentAction; 9] = [
        DocumentAction::GeneratePdf,
        DocumentAction::MergeDocuments,
        DocumentAction::SplitDocument,
        DocumentAction::ReplaceHeaderAndFooter,
        DocumentAction::FillForm,
        DocumentAction::FillFormSync,
        DocumentAction::ReplaceImages,
        DocumentAction::AddImages,
        DocumentAction::ConvertPdfToImages,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DocumentAction::GeneratePdf => "generatePdf",
            DocumentAction::MergeDocuments => "mergeDocuments",
            DocumentAction::SplitDocument => "splitDocument",
            DocumentAction::ReplaceHeaderAndFooter => "replaceHeaderAndFooter",
            DocumentAction::FillForm => "fillForm",
            DocumentAction::FillFormSync => "fillFormSync",
            DocumentAction::ReplaceImages => "replaceImages",
            DocumentAction::AddImages => "addImages",
            DocumentAction::ConvertPdfToImages => "convertPdfToImages",
        }
    }

    /// Name of the remote function implementing the action.
    pub fn function_name(&self) -> String {
        format!("_{}", self.name())
    }

    /// Full identifier as offered by the designer's action picker.
    pub fn identifier(&self) -> String {
        let args = match self {
            DocumentAction::GeneratePdf => "template, data, settings",
            DocumentAction::MergeDocuments => "documents",
            DocumentAction::SplitDocument => "fileId, interval",
            DocumentAction::ConvertPdfToImages => "fileIds, dpi, settings",
            _ => "fileId, settings",
        };
        format!("{}{}({}, callbackData, callbacks)", ACTION_PREFIX, self.name(), args)
    }

    /// Accepts either the full identifier or the bare operation name.
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        let trimmed = identifier.trim();
        let name = trimmed.strip_prefix(ACTION_PREFIX).unwrap_or(trimmed);
        let name = name.split('(').next().unwrap_or(name).trim();
        Self::ALL.into_iter().find(|action| action.name() == name)
    }
}

impl fmt::Display for DocumentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Remote document service, one function per [`DocumentAction`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentEndpoint: Send + Sync {
    async fn call(
        &self,
        action: DocumentAction,
        options: Value,
        callback_data: Option<CallbackData>,
        callbacks: Option<CallbackSpec>,
    ) -> Result<Value>;
}
