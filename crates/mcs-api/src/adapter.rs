use async_trait::async_trait;
use mcs_core::{Launch, StatusReport, WorkflowRunner};
use mcs_model::{ExecutionId, ExecutionInfo, ExecutionPage, ExecutionQuery};

use crate::error::ApiError;
use crate::handler::ApiHandler;

/// Adapter that bridges [`WorkflowRunner`] to [`ApiHandler`].
pub struct ControlApiAdapter {
    runner: WorkflowRunner,
}

impl ControlApiAdapter {
    pub fn new(runner: WorkflowRunner) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &WorkflowRunner {
        &self.runner
    }
}

#[async_trait]
impl ApiHandler for ControlApiAdapter {
    async fn start(&self) -> Result<Launch, ApiError> {
        Ok(self.runner.launch_start())
    }

    async fn stop(&self) -> Result<Launch, ApiError> {
        Ok(self.runner.launch_stop())
    }

    async fn status(&self) -> Result<StatusReport, ApiError> {
        self.runner
            .controller()
            .status()
            .await
            .map_err(ApiError::from)
    }

    async fn execution(&self, id: &ExecutionId) -> Result<Option<ExecutionInfo>, ApiError> {
        Ok(self.runner.state().get(id))
    }

    async fn executions(
        &self,
        query: ExecutionQuery,
    ) -> Result<ExecutionPage<ExecutionInfo>, ApiError> {
        Ok(self.runner.state().query(&query))
    }
}
