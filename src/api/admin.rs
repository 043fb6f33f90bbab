//! Administrator endpoints: round creation, transitions, deletion.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::AdminUser;
use crate::error::GameResult;
use crate::state::AppState;
use crate::types::*;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRoundRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub scoring_mode: ScoringMode,
    pub link_mappings: Vec<LinkMapping>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundResponse {
    pub round: Round,
}

pub async fn create_round(
    State(state): State<Arc<AppState>>,
    AdminUser(email): AdminUser,
    Json(req): Json<CreateRoundRequest>,
) -> GameResult<Json<RoundResponse>> {
    let round = state
        .create_round(req.title, req.scoring_mode, req.link_mappings)
        .await?;
    tracing::info!(round_id = %round.id, admin = %email, "Round created");
    Ok(Json(RoundResponse { round }))
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// Explicit status set, including the reset-to-waiting path. The lifecycle
/// table decides whether the jump is legal.
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(round_id): Path<String>,
    _admin: AdminUser,
    Json(req): Json<UpdateStatusRequest>,
) -> GameResult<Json<RoundResponse>> {
    let status: RoundStatus = req.status.parse()?;
    let round = state.transition_round(&round_id, status).await?;
    Ok(Json(RoundResponse { round }))
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

pub async fn delete_round(
    State(state): State<Arc<AppState>>,
    Path(round_id): Path<String>,
    AdminUser(email): AdminUser,
) -> GameResult<Json<DeleteResponse>> {
    state.delete_round(&round_id).await?;
    tracing::info!(round_id = %round_id, admin = %email, "Round deleted");
    Ok(Json(DeleteResponse { success: true }))
}

/// Open the round for play (round1 for two-phase, active for single-phase).
pub async fn start_round_one(
    State(state): State<Arc<AppState>>,
    Path(round_id): Path<String>,
    _admin: AdminUser,
) -> GameResult<Json<RoundResponse>> {
    let round = state.start_round(&round_id).await?;
    Ok(Json(RoundResponse { round }))
}

pub async fn start_round_two(
    State(state): State<Arc<AppState>>,
    Path(round_id): Path<String>,
    _admin: AdminUser,
) -> GameResult<Json<RoundResponse>> {
    let round = state
        .transition_round(&round_id, RoundStatus::Round2)
        .await?;
    Ok(Json(RoundResponse { round }))
}

#[derive(Debug, Clone, Serialize)]
pub struct EndGameResponse {
    pub round: Round,
    pub most_voted_link: Option<LinkId>,
}

/// Close the round: tally, persist the most-voted link, score every guess.
pub async fn end_game(
    State(state): State<Arc<AppState>>,
    Path(round_id): Path<String>,
    AdminUser(email): AdminUser,
) -> GameResult<Json<EndGameResponse>> {
    let round = state
        .transition_round(&round_id, RoundStatus::Ended)
        .await?;
    tracing::info!(round_id = %round.id, admin = %email, "Round ended");

    let most_voted_link = round.most_voted_link;
    Ok(Json(EndGameResponse {
        round,
        most_voted_link,
    }))
}
