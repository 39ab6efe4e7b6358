use std::time::Duration;

use mcs_model::{ExecutionId, ModelError};
use thiserror::Error;

use crate::CloudError;

#[derive(Debug, Clone, Error)]
pub enum CoreError {
    #[error(transparent)]
    Cloud(#[from] CloudError),

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("no public address after {attempts} attempts")]
    AddressTimeout { attempts: u32 },

    #[error("workflow exceeded its timeout of {0:?}")]
    Timeout(Duration),

    #[error("server was stopped while starting")]
    StoppedDuringStart,

    #[error("workflow canceled")]
    Canceled,

    #[error("execution not found: {0}")]
    ExecutionNotFound(ExecutionId),
}

impl CoreError {
    /// Errors that end a start run as timed out rather than failed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, CoreError::AddressTimeout { .. } | CoreError::Timeout(_))
    }
}
