use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{any, get},
};
use mcs_core::Launch;
use mcs_model::{ExecutionId, ExecutionInfo, ExecutionKind, ExecutionQuery, ExecutionStatus};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{error::ApiError, handler::ApiHandler};

/// Body text returned for any path outside the control actions.
pub const INVALID_ACTION: &str = "Invalid action. Use /start, /stop, or /status";

/// HTTP API service builder.
pub struct HttpApi<H> {
    handler: Arc<H>,
    #[cfg(feature = "prometheus")]
    metrics: Option<mcs_prometheus::PrometheusMetrics>,
}

impl<H> HttpApi<H>
where
    H: ApiHandler,
{
    pub fn new(handler: Arc<H>) -> Self {
        Self {
            handler,
            #[cfg(feature = "prometheus")]
            metrics: None,
        }
    }

    /// Mount `GET /metrics` serving `metrics` in the text exposition format.
    #[cfg(feature = "prometheus")]
    pub fn with_metrics(mut self, metrics: mcs_prometheus::PrometheusMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build axum router with mounted endpoints.
    ///
    /// Routes:
    /// - GET|POST /start - launch (or join) a start run
    /// - GET|POST /stop - launch a stop run
    /// - GET /status - current server status
    /// - GET /executions/{id} - one run
    /// - GET /executions - list runs (filter by query params)
    /// - GET /metrics - when metrics are mounted
    /// - /{action} - anything else, 400
    pub fn router(self) -> Router {
        let api = Router::new()
            .route("/start", get(start::<H>).post(start::<H>))
            .route("/stop", get(stop::<H>).post(stop::<H>))
            .route("/status", get(status::<H>))
            .route("/executions", get(list_executions::<H>))
            .route("/executions/{id}", get(get_execution::<H>))
            .route("/{action}", any(invalid_action))
            .with_state(self.handler);

        #[cfg(feature = "prometheus")]
        if let Some(metrics) = self.metrics {
            let scrape = Router::new()
                .route("/metrics", get(render_metrics))
                .with_state(metrics);
            return api.merge(scrape);
        }

        api
    }
}

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LaunchResponse {
    message: String,
    execution_id: String,
}

#[derive(Debug, Deserialize)]
struct ListExecutionsParams {
    /// Filter by run kind (start|stop)
    kind: Option<String>,
    /// Filter by run status
    status: Option<String>,
    /// Max items per page (default 100, max 1000)
    limit: Option<usize>,
    /// Offset for pagination (default 0)
    offset: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ListExecutionsResponse {
    executions: Vec<ExecutionInfo>,
    total: usize,
}

fn accepted(launch: Launch, started: &str, joined: &str) -> (StatusCode, Json<LaunchResponse>) {
    let message = match &launch {
        Launch::Started(_) => started,
        Launch::Joined(_) => joined,
    };
    let response = LaunchResponse {
        message: message.to_string(),
        execution_id: launch.id().to_string(),
    };
    (StatusCode::ACCEPTED, Json(response))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET|POST /start
async fn start<H>(State(handler): State<Arc<H>>) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let launch = handler.start().await?;
    debug!(execution = %launch.id(), ?launch, "start requested");
    Ok(accepted(
        launch,
        "Server start initiated",
        "Server start already in progress",
    ))
}

/// GET|POST /stop
async fn stop<H>(State(handler): State<Arc<H>>) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let launch = handler.stop().await?;
    debug!(execution = %launch.id(), "stop requested");
    Ok(accepted(launch, "Server stop initiated", "Server stop initiated"))
}

/// GET /status
async fn status<H>(State(handler): State<Arc<H>>) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let report = handler.status().await?;
    Ok(Json(report))
}

/// GET /executions/{id}
async fn get_execution<H>(
    State(handler): State<Arc<H>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let execution_id = ExecutionId::from(id.as_str());
    debug!(%execution_id, "getting execution");
    match handler.execution(&execution_id).await? {
        Some(info) => Ok(Json(info)),
        None => Err(ApiError::ExecutionNotFound(id)),
    }
}

/// GET /executions
///
/// Query params (all optional, combinable):
/// - ?kind=start
/// - ?status=running
/// - ?limit=50     - max items per page (default 100, max 1000)
/// - ?offset=0     - pagination offset (default 0)
async fn list_executions<H>(
    State(handler): State<Arc<H>>,
    Query(params): Query<ListExecutionsParams>,
) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let mut query = ExecutionQuery::new();

    if let Some(kind) = params.kind {
        let kind: ExecutionKind = kind
            .parse()
            .map_err(|e: mcs_model::ModelError| ApiError::InvalidRequest(e.to_string()))?;
        query = query.with_kind(kind);
    }

    if let Some(status) = params.status {
        let status: ExecutionStatus = status
            .parse()
            .map_err(|e: mcs_model::ModelError| ApiError::InvalidRequest(e.to_string()))?;
        query = query.with_status(status);
    }

    if let Some(limit) = params.limit {
        query = query.with_limit(limit);
    }

    if let Some(offset) = params.offset {
        query = query.with_offset(offset);
    }

    let page = handler.executions(query).await?;
    debug!(count = page.items.len(), total = page.total, "executions listed");

    Ok(Json(ListExecutionsResponse {
        executions: page.items,
        total: page.total,
    }))
}

async fn invalid_action(Path(action): Path<String>) -> ApiError {
    debug!(%action, "unknown action");
    ApiError::UnknownAction(INVALID_ACTION)
}

#[cfg(feature = "prometheus")]
async fn render_metrics(
    State(metrics): State<mcs_prometheus::PrometheusMetrics>,
) -> Result<impl IntoResponse, ApiError> {
    let body = metrics
        .encode()
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok((
        [(axum::http::header::CONTENT_TYPE, metrics.content_type())],
        body,
    ))
}
