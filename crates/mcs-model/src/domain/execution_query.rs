use crate::{ExecutionKind, ExecutionStatus};

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 1000;

/// Filter and pagination for listing workflow runs.
#[derive(Debug, Clone)]
pub struct ExecutionQuery {
    pub kind: Option<ExecutionKind>,
    pub status: Option<ExecutionStatus>,
    pub limit: usize,
    pub offset: usize,
}

/// Result of a paginated query. `total` counts matches before pagination.
#[derive(Debug, Clone)]
pub struct ExecutionPage<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl ExecutionQuery {
    pub fn new() -> Self {
        Self {
            kind: None,
            status: None,
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }

    pub fn with_kind(mut self, kind: ExecutionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_status(mut self, status: ExecutionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.min(MAX_LIMIT);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

impl Default for ExecutionQuery {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_capped() {
        assert_eq!(ExecutionQuery::new().limit, 100);
        assert_eq!(ExecutionQuery::new().with_limit(5000).limit, 1000);
    }
}
