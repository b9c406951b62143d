//! HTTP surface for the governance engine.
//!
//! JSON in, JSON out. Escalated comparisons are an outcome, not a
//! transport error, so they come back as 200 with the escalation payload.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::application::LoopGovernor;
use crate::domain::models::{
    Belief, ContradictionResolution, CriteriaWeights, DemotionEvent, EscalationRecord, ExecutionStatus,
    FreezeEvent, LoopState, LoopStatus, Plan, RetractionReason, RetractionRecord, Threshold,
    TrustEvent, TrustMetrics, TrustStatus,
};
use crate::infrastructure::http::error::ApiError;
use crate::services::SelectionOutcome;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub governor: Arc<LoopGovernor>,
}

/// Build the governance router over a governor.
pub fn build_router(governor: Arc<LoopGovernor>) -> Router {
    let state = AppState { governor };
    Router::new()
        .route("/health", get(health))
        .route("/loop/evaluate", post(evaluate_loop))
        .route("/loop/override", post(override_freeze))
        .route("/loop/cancel", post(cancel_loop))
        .route("/loop/complete", post(complete_loop))
        .route("/loop/{loop_id}", get(get_loop))
        .route("/plan/compare", post(compare_plans))
        .route("/reflection/retract", post(retract_reflection))
        .route("/contradiction", post(record_contradiction))
        .route("/contradiction/resolve", post(resolve_contradiction))
        .route("/trust/{agent}", get(get_trust))
        .route("/trust/{agent}/metrics", post(record_trust))
        .route("/escalations", get(list_escalations))
        .route("/thresholds", get(list_thresholds))
        .route("/beliefs", get(list_beliefs))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(governor: Arc<LoopGovernor>, host: &str, port: u16) -> Result<()> {
    let app = build_router(governor);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context(format!("Failed to bind {addr}"))?;

    info!(addr, "governance server listening");
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Loop state as reported by the caller at evaluation time.
#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    /// Omitted on the first evaluation of a new loop.
    pub loop_id: Option<Uuid>,
    pub task_id: Uuid,
    pub agent_id: String,
    pub project_id: Uuid,
    pub confidence_score: f64,
    #[serde(default)]
    pub trust_score: Option<f64>,
    #[serde(default)]
    pub reflection_depth: u32,
    #[serde(default)]
    pub contradictions_unresolved: u32,
    #[serde(default)]
    pub manual_override: bool,
    #[serde(default)]
    pub rerun_count: u32,
}

#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub loop_id: Uuid,
    #[serde(flatten)]
    pub status: ExecutionStatus,
}

async fn evaluate_loop(
    State(state): State<AppState>,
    Json(request): Json<EvaluateRequest>,
) -> Result<Json<EvaluateResponse>, ApiError> {
    // Callers without a trust signal defer to the server projection.
    let projected_trust = state.governor.trust_score(&request.agent_id).await;
    let mut loop_state = LoopState::new(request.task_id, request.agent_id, request.project_id);
    if let Some(loop_id) = request.loop_id {
        loop_state.loop_id = loop_id;
    }
    loop_state.confidence_score = request.confidence_score;
    loop_state.trust_score = request.trust_score.unwrap_or(projected_trust);
    loop_state.reflection_depth = request.reflection_depth;
    loop_state.contradictions_unresolved = request.contradictions_unresolved;
    loop_state.manual_override = request.manual_override;
    loop_state.rerun_count = request.rerun_count;
    loop_state.status = LoopStatus::Looping;
    let loop_id = loop_state.loop_id;

    let status = state.governor.evaluate_loop(loop_state).await?;
    Ok(Json(EvaluateResponse { loop_id, status }))
}

#[derive(Debug, Deserialize)]
pub struct OverrideRequest {
    pub loop_id: Uuid,
    pub actor: String,
}

async fn override_freeze(
    State(state): State<AppState>,
    Json(request): Json<OverrideRequest>,
) -> Result<Json<FreezeEvent>, ApiError> {
    let event = state
        .governor
        .override_freeze(request.loop_id, &request.actor)
        .await?;
    Ok(Json(event))
}

#[derive(Debug, Deserialize)]
pub struct LoopIdRequest {
    pub loop_id: Uuid,
}

async fn cancel_loop(
    State(state): State<AppState>,
    Json(request): Json<LoopIdRequest>,
) -> Result<Json<LoopState>, ApiError> {
    Ok(Json(state.governor.cancel_loop(request.loop_id).await?))
}

async fn complete_loop(
    State(state): State<AppState>,
    Json(request): Json<LoopIdRequest>,
) -> Result<Json<LoopState>, ApiError> {
    Ok(Json(state.governor.complete_loop(request.loop_id).await?))
}

async fn get_loop(
    State(state): State<AppState>,
    Path(loop_id): Path<Uuid>,
) -> Result<Json<LoopState>, ApiError> {
    match state.governor.loop_state(loop_id).await {
        Some(loop_state) => Ok(Json(loop_state)),
        None => Err(crate::domain::ports::GovernanceError::UnknownLoop(loop_id).into()),
    }
}

#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    pub loop_id: Uuid,
    pub decision_point: String,
    pub plans: Vec<Plan>,
    #[serde(default)]
    pub weights: Option<CriteriaWeights>,
}

async fn compare_plans(
    State(state): State<AppState>,
    Json(request): Json<CompareRequest>,
) -> Result<Json<SelectionOutcome>, ApiError> {
    let outcome = state
        .governor
        .compare_plans(request.loop_id, &request.decision_point, request.plans, request.weights)
        .await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct RetractRequest {
    pub loop_id: Uuid,
    pub reflection_ref: String,
    #[serde(default)]
    pub revised_content: String,
    pub reason: RetractionReason,
    #[serde(default)]
    pub flag_as_flawed: bool,
    #[serde(default)]
    pub replan_required: bool,
}

async fn retract_reflection(
    State(state): State<AppState>,
    Json(request): Json<RetractRequest>,
) -> Result<(StatusCode, Json<RetractionRecord>), ApiError> {
    let record = state
        .governor
        .retract_reflection(
            request.loop_id,
            &request.reflection_ref,
            &request.revised_content,
            request.reason,
            request.flag_as_flawed,
            request.replan_required,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[derive(Debug, Deserialize)]
pub struct ContradictionRequest {
    pub loop_id: Uuid,
    pub agent: String,
    pub belief_1: Uuid,
    pub belief_2: Uuid,
    pub kind: String,
    pub score: f64,
}

async fn record_contradiction(
    State(state): State<AppState>,
    Json(request): Json<ContradictionRequest>,
) -> Result<(StatusCode, Json<crate::domain::models::ContradictionRecord>), ApiError> {
    let record = state
        .governor
        .record_contradiction(
            request.loop_id,
            &request.agent,
            request.belief_1,
            request.belief_2,
            &request.kind,
            request.score,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[derive(Debug, Deserialize)]
pub struct ResolveContradictionRequest {
    pub contradiction_id: Uuid,
    pub resolution: ContradictionResolution,
}

async fn resolve_contradiction(
    State(state): State<AppState>,
    Json(request): Json<ResolveContradictionRequest>,
) -> Result<Json<crate::domain::models::ContradictionRecord>, ApiError> {
    let record = state
        .governor
        .resolve_contradiction(request.contradiction_id, request.resolution)
        .await?;
    Ok(Json(record))
}

#[derive(Debug, Serialize)]
pub struct TrustResponse {
    pub agent: String,
    pub trust_score: f64,
    pub status: TrustStatus,
    pub effective_agent: String,
    pub active_demotion: Option<DemotionEvent>,
    pub history: Vec<TrustEvent>,
}

async fn get_trust(
    State(state): State<AppState>,
    Path(agent): Path<String>,
) -> Result<Json<TrustResponse>, ApiError> {
    let trust_score = state.governor.trust_score(&agent).await;
    let status = state.governor.trust_status(&agent).await;
    let effective_agent = state.governor.effective_agent(&agent).await;
    let active_demotion = state.governor.active_demotion(&agent).await;
    let history = state.governor.trust_history(&agent, 20).await?;
    Ok(Json(TrustResponse {
        agent,
        trust_score,
        status,
        effective_agent,
        active_demotion,
        history,
    }))
}

#[derive(Debug, Deserialize)]
pub struct TrustMetricsRequest {
    pub loop_id: Uuid,
    pub metrics: TrustMetrics,
}

async fn record_trust(
    State(state): State<AppState>,
    Path(agent): Path<String>,
    Json(request): Json<TrustMetricsRequest>,
) -> Result<(StatusCode, Json<TrustEvent>), ApiError> {
    let event = state
        .governor
        .record_trust(&agent, request.loop_id, request.metrics)
        .await?;
    Ok((StatusCode::CREATED, Json(event)))
}

#[derive(Debug, Deserialize)]
pub struct EscalationsQuery {
    #[serde(default)]
    pub loop_id: Option<Uuid>,
    #[serde(default)]
    pub limit: Option<usize>,
}

async fn list_escalations(
    State(state): State<AppState>,
    Query(query): Query<EscalationsQuery>,
) -> Result<Json<Vec<EscalationRecord>>, ApiError> {
    let escalations = match query.loop_id {
        Some(loop_id) => state.governor.escalations_for_loop(loop_id, query.limit).await?,
        None => state.governor.all_escalations(query.limit).await?,
    };
    Ok(Json(escalations))
}

async fn list_thresholds(State(state): State<AppState>) -> Json<Vec<Threshold>> {
    Json(state.governor.thresholds())
}

async fn list_beliefs(State(state): State<AppState>) -> Json<Vec<Belief>> {
    Json(state.governor.beliefs())
}
