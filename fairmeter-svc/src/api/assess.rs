//! Assessment endpoint
//!
//! One POST runs a full assessment session: harvest, merge, evaluate,
//! aggregate. The response carries the ordered per-metric results, the
//! aggregated summary and the session audit log.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fairmeter_common::Error;

use crate::error::{ApiError, ApiResult};
use crate::evaluators;
use crate::harvest::http_collector::HttpCollector;
use crate::harvest::{ServiceEndpoint, ServiceKind};
use crate::helpers::repository::Re3DataRegistry;
use crate::models::{AssessmentSummary, EvaluationResult, LogEntry};
use crate::score::assessment_summary;
use crate::session::{AssessmentSession, SessionOptions};
use crate::AppState;

/// Assessment request
#[derive(Debug, Deserialize)]
pub struct AssessRequest {
    /// Target identifier: DOI or URL
    pub object_identifier: String,
    /// Optional explicit metadata-service endpoint URL
    pub metadata_service_url: Option<String>,
    /// Endpoint type: oai_pmh | ogc_csw | sparql
    pub metadata_service_type: Option<ServiceKind>,
    /// Optional authentication credential
    pub auth_token: Option<String>,
    /// Credential scheme: Basic (default) or Bearer
    pub auth_token_type: Option<String>,
    /// Metric specification version, e.g. "metrics_v0.5"
    pub metric_version: Option<String>,
}

/// Assessment response
#[derive(Debug, Serialize)]
pub struct AssessResponse {
    pub session_id: Uuid,
    pub assessment_id: String,
    pub target: String,
    pub metric_version: String,
    pub results: Vec<EvaluationResult>,
    pub summary: AssessmentSummary,
    pub log: Vec<LogEntry>,
}

/// POST /assess
pub async fn run_assessment(
    State(state): State<AppState>,
    Json(request): Json<AssessRequest>,
) -> ApiResult<Json<AssessResponse>> {
    let endpoint = match (&request.metadata_service_url, request.metadata_service_type) {
        (Some(url), Some(kind)) => Some(ServiceEndpoint {
            url: url.clone(),
            kind,
        }),
        (Some(_), None) => {
            return Err(ApiError::BadRequest(
                "metadata_service_url given without metadata_service_type".to_string(),
            ))
        }
        _ => None,
    };

    let options = SessionOptions {
        metric_version: request.metric_version.clone(),
        endpoint,
        metrics_dir: state.config.metrics_dir.clone(),
        resolve_timeout: Some(state.config.resolve_timeout()),
        data_files_limit: Some(state.config.data_files_limit),
    };

    let mut session =
        AssessmentSession::new(&request.object_identifier, options).map_err(|e| match e {
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::Config(msg) => ApiError::BadRequest(msg),
            other => ApiError::Common(other),
        })?;

    let mut collector = HttpCollector::with_timeout(state.config.request_timeout());
    if let Some(token) = &request.auth_token {
        let scheme = match request.auth_token_type.as_deref() {
            Some("Bearer") => "Bearer",
            _ => "Basic",
        };
        collector = collector.with_auth(scheme, token);
    }

    // harvest failures are soft: the evaluators run against whatever arrived
    if let Err(e) = session.harvest_all_metadata(&collector).await {
        return Err(ApiError::Common(e));
    }
    session
        .harvest_repository_record(&Re3DataRegistry::new())
        .await;

    let results = evaluators::evaluate_all(&session).await;
    let summary = assessment_summary(&results);

    tracing::info!(
        session_id = %session.session_id,
        target = %session.input_id(),
        metrics = results.len(),
        score_percent = summary.score_percent.get("FAIR").copied().unwrap_or(0.0),
        "Assessment complete"
    );

    Ok(Json(AssessResponse {
        session_id: session.session_id,
        assessment_id: session.assessment_id.clone(),
        target: session.input_id().to_string(),
        metric_version: session.metrics().metric_version.clone(),
        results,
        summary,
        log: session.log_messages(),
    }))
}

/// Build assessment routes
pub fn assess_routes() -> Router<AppState> {
    Router::new().route("/assess", post(run_assessment))
}
