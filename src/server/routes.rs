//! Axum route handlers for the agent-dao HTTP server.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::controller::{DaoController, DashboardState};
use crate::errors::DaoError;
use crate::registry::{is_valid_agent_id, LoadOutcome, NewAgent};
use crate::views;

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    pub controller: DaoController,
}

impl AppState {
    pub fn new(controller: DaoController) -> Self {
        Self { controller }
    }
}

/// Build the axum router with all routes.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/agents", get(list_agents_handler).post(create_agent_handler))
        .route("/agents/refresh", post(refresh_handler))
        .route("/agents/:id/vote", post(update_vote_handler))
        .route("/agents/:id/toggle", post(toggle_status_handler))
        .route("/agents/:id/decrypt", post(decrypt_handler))
        .route("/registry/prune", post(prune_handler))
        .route("/views/votes", get(vote_distribution_handler))
        .route("/views/performance", get(performance_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Error response: `{"error": "<message>"}` with a status derived from the
/// error kind.
pub struct ApiError(DaoError);

impl From<DaoError> for ApiError {
    fn from(e: DaoError) -> Self {
        Self(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        if self.0.is_user_rejection() {
            return StatusCode::CONFLICT;
        }
        match &self.0 {
            DaoError::WalletNotConnected => StatusCode::UNAUTHORIZED,
            DaoError::NotOwner { .. } => StatusCode::FORBIDDEN,
            DaoError::AgentNotFound { .. } => StatusCode::NOT_FOUND,
            DaoError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            DaoError::ContractUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult = Result<Json<Value>, ApiError>;

fn checked_id(id: String) -> Result<String, ApiError> {
    if is_valid_agent_id(&id) {
        Ok(id)
    } else {
        Err(DaoError::InvalidInput(format!("Invalid agent id: {}", id)).into())
    }
}

#[derive(Debug, Deserialize)]
struct VoteRequest {
    vote: f64,
}

#[derive(Debug, Default, Deserialize)]
struct PruneParams {
    #[serde(default)]
    dry_run: bool,
}

/// GET /health: liveness probe.
async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": crate::VERSION,
        "service": "agent-dao",
    }))
}

/// GET /agents: the current dashboard snapshot.
async fn list_agents_handler(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.controller.snapshot();
    Json(DashboardState::clone(&snapshot))
}

/// POST /agents/refresh: full reload from the contract.
async fn refresh_handler(State(state): State<AppState>) -> ApiResult {
    let outcome = state.controller.load().await?;
    let available = matches!(outcome, LoadOutcome::Loaded(_));
    Ok(Json(json!({
        "available": available,
        "state": *state.controller.snapshot(),
    })))
}

/// POST /agents: body `{"strategy": f64, "initialVote": f64}`.
async fn create_agent_handler(
    State(state): State<AppState>,
    Json(new): Json<NewAgent>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let record = state.controller.create_agent(new).await?;
    Ok((StatusCode::CREATED, Json(json!({ "agent": record }))))
}

/// POST /agents/:id/vote: body `{"vote": f64}`.
async fn update_vote_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<VoteRequest>,
) -> ApiResult {
    let id = checked_id(id)?;
    let record = state.controller.update_vote(&id, request.vote).await?;
    Ok(Json(json!({ "agent": record })))
}

/// POST /agents/:id/toggle
async fn toggle_status_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult {
    let id = checked_id(id)?;
    let status = state.controller.toggle_status(&id).await?;
    Ok(Json(json!({ "id": id, "status": status })))
}

/// POST /agents/:id/decrypt
async fn decrypt_handler(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let id = checked_id(id)?;
    let value = state.controller.decrypt_agent_vote(&id).await?;
    Ok(Json(json!({ "id": id, "vote": value })))
}

/// POST /registry/prune[?dry_run=true]: with `dry_run`, list the dangling
/// entries without writing.
async fn prune_handler(
    State(state): State<AppState>,
    Query(params): Query<PruneParams>,
) -> ApiResult {
    if params.dry_run {
        let dangling = state.controller.dangling_index_entries().await?;
        return Ok(Json(json!({ "dryRun": true, "dangling": dangling })));
    }
    let removed = state.controller.prune_index().await?;
    Ok(Json(json!({ "removed": removed })))
}

/// GET /views/votes
async fn vote_distribution_handler(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.controller.snapshot();
    let shares = views::vote_distribution(&snapshot.agents);
    Json(json!({
        "totalVotes": snapshot.fund_value,
        "activeAgents": snapshot.active_agents,
        "shares": shares,
    }))
}

/// GET /views/performance
async fn performance_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(views::performance_series(&state.controller.snapshot().agents))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
