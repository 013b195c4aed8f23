pub mod callback;
pub mod config;
pub mod documents;
pub mod metrics;
pub mod server;
pub mod step;
pub mod transport;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Callback error: {0}")]
    Callback(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for faults in the step configuration itself, as opposed to
    /// failures talking to a collaborator.
    pub fn is_client_fault(&self) -> bool {
        matches!(
            self,
            Error::Config(_) | Error::Parse(_) | Error::Validation(_) | Error::SerdeJson(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

pub use callback::{CallbackData, CallbackHandler, CallbackRegistry, CallbackSpec};
pub use documents::{DocumentAction, DocumentEndpoint, PdfGenerator};
pub use step::{RequestOptions, StepDispatcher, StepInput};
pub use transport::{HttpVerb, Transport};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_faults_are_classified() {
        assert!(Error::Config("x".into()).is_client_fault());
        assert!(Error::Validation("x".into()).is_client_fault());
        assert!(!Error::Internal("x".into()).is_client_fault());
        assert!(!Error::Callback("x".into()).is_client_fault());
    }
}
