use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pdfgen_flow_steps::{
    callback::CallbackRegistry,
    config::Config,
    documents::{HttpDocumentEndpoint, PdfGenerator},
    server::Server,
    step::StepDispatcher,
    transport::HttpTransport,
    Result,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = Config::load()?;
    info!("Loaded configuration: {:?}", config);

    let transport = Arc::new(HttpTransport::new(&config.http)?);
    let documents = PdfGenerator::new(Arc::new(HttpDocumentEndpoint::new(&config.documents)?));
    let dispatcher = Arc::new(StepDispatcher::new(
        transport,
        documents,
        CallbackRegistry::with_builtins(),
    ));

    let server = Server::new(&config, dispatcher);

    info!("Starting server on {}", config.server.addr);
    server.start(&config.server.addr).await?;

    Ok(())
}
