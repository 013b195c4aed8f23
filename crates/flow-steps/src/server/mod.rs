mod routes;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{config::Config, step::StepDispatcher, Result};

pub use routes::{ApiError, StepResponse};

/// HTTP host through which a workflow engine invokes the flow steps.
pub struct Server {
    dispatcher: Arc<StepDispatcher>,
}

impl Server {
    pub fn new(_config: &Config, dispatcher: Arc<StepDispatcher>) -> Self {
        Self { dispatcher }
    }

    pub fn build_router(self) -> Router {
        Router::new()
            .route("/health", get(routes::health))
            .route("/steps/api-call", post(routes::api_call))
            .route("/steps/generate-pdf", post(routes::generate_pdf))
            .route("/metrics", get(routes::metrics))
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
            .with_state(self.dispatcher)
    }

    pub async fn start(self, addr: &str) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("Listening on {}", listener.local_addr()?);
        axum::serve(listener, self.build_router()).await?;
        Ok(())
    }
}
