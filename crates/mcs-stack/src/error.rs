use mcs_model::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StackError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("duplicate logical id: {0}")]
    DuplicateResource(String),

    #[error("render failed: {0}")]
    Render(#[from] serde_json::Error),
}
