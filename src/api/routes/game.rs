use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::application::game::{
    now_millis, CreateMatch, CreateMatchInput, GetMatchView, GetMatchViewInput, MatchError,
    MatchView, SubmitAction, SubmitActionInput,
};
use crate::domain::errors::EngineError;
use crate::domain::repositories::RepositoryError;
use crate::domain::services::{Action, SeatConfig};

// ============================================================================
// Request/Response DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMatchRequest {
    pub players: Vec<SeatConfig>,
    pub hand_size: Option<u8>,
    pub seed: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMatchResponse {
    pub success: bool,
    pub match_id: String,
    pub version: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewParams {
    pub player_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitActionRequest {
    pub player_id: String,
    pub action: Action,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map a use-case error onto an HTTP status and error code
pub fn error_response(e: MatchError) -> ApiError {
    let status = match &e {
        MatchError::Engine(engine) => match engine {
            EngineError::NotYourTurn
            | EngineError::ColorChoicePending
            | EngineError::GameAlreadyFinished
            | EngineError::StaleState => StatusCode::CONFLICT,
            EngineError::IllegalCard(_)
            | EngineError::CardNotInHand(_)
            | EngineError::InvalidColorChoice
            | EngineError::UnoNotAllowed
            | EngineError::InvalidSetup(_) => StatusCode::BAD_REQUEST,
            EngineError::UnknownPlayer(_) => StatusCode::NOT_FOUND,
            EngineError::DeckExhausted => StatusCode::INTERNAL_SERVER_ERROR,
        },
        MatchError::Repository(repo) => match repo {
            RepositoryError::NotFound(_) => StatusCode::NOT_FOUND,
            RepositoryError::Conflict { .. } => StatusCode::CONFLICT,
            RepositoryError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        },
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!("Request failed: {}", e);
    }

    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
            code: e.code().to_string(),
        }),
    )
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST /api/matches - Create a match and start driving it
pub async fn create_match(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateMatchRequest>,
) -> Result<(StatusCode, Json<CreateMatchResponse>), ApiError> {
    let use_case = CreateMatch::new(state.match_repo.clone());
    let output = use_case
        .execute(CreateMatchInput {
            seats: body.players,
            settings: state.config.match_settings(body.hand_size),
            seed: body.seed,
            now: now_millis(),
        })
        .await
        .map_err(error_response)?;

    if let Err(e) = state.runtime.watch(&output.match_id).await {
        tracing::error!("Failed to start runtime for match {}: {}", output.match_id, e);
    }

    Ok((
        StatusCode::CREATED,
        Json(CreateMatchResponse {
            success: true,
            match_id: output.match_id,
            version: output.state.version,
        }),
    ))
}

/// GET /api/matches/:matchId - Match as seen by `playerId` (or a spectator)
pub async fn get_match(
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<String>,
    Query(params): Query<ViewParams>,
) -> Result<Json<MatchView>, ApiError> {
    let use_case = GetMatchView::new(state.match_repo.clone());
    let view = use_case
        .execute(GetMatchViewInput {
            match_id,
            player_id: params.player_id,
        })
        .await
        .map_err(error_response)?;

    Ok(Json(view))
}

/// POST /api/matches/:matchId/actions - Apply a player's action
pub async fn submit_action(
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<String>,
    Json(body): Json<SubmitActionRequest>,
) -> Result<Json<MatchView>, ApiError> {
    let use_case = SubmitAction::new(state.match_repo.clone());
    let committed = use_case
        .execute(SubmitActionInput {
            match_id: match_id.clone(),
            player_id: body.player_id.clone(),
            action: body.action,
            now: now_millis(),
        })
        .await
        .map_err(error_response)?;

    let viewer = committed.state.player_index(&body.player_id);
    Ok(Json(MatchView::from_state(&match_id, &committed.state, viewer)))
}
