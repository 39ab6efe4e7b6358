use async_trait::async_trait;
use mcs_core::{Launch, StatusReport};
use mcs_model::{ExecutionId, ExecutionInfo, ExecutionPage, ExecutionQuery};

use crate::error::ApiError;

/// Server control API handler.
///
/// Abstracts the backend so the HTTP layer can run against the provided
/// [`ControlApiAdapter`](crate::ControlApiAdapter) or a custom handler (auth, rate limits).
#[async_trait]
pub trait ApiHandler: Send + Sync + 'static {
    /// Launch a start run, or join the one in flight.
    async fn start(&self) -> Result<Launch, ApiError>;

    /// Launch a stop run.
    async fn stop(&self) -> Result<Launch, ApiError>;

    /// Current server status.
    async fn status(&self) -> Result<StatusReport, ApiError>;

    /// One run by id.
    async fn execution(&self, id: &ExecutionId) -> Result<Option<ExecutionInfo>, ApiError>;

    /// Recorded runs matching `query`, newest first.
    async fn executions(
        &self,
        query: ExecutionQuery,
    ) -> Result<ExecutionPage<ExecutionInfo>, ApiError>;
}
