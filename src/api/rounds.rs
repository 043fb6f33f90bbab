//! Player-facing round endpoints: browsing, choice submission, results.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::CurrentUser;
use crate::error::{GameError, GameResult};
use crate::state::AppState;
use crate::types::*;

#[derive(Debug, Clone, Serialize)]
pub struct RoundListResponse {
    pub rounds: Vec<Round>,
}

pub async fn list_rounds(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
) -> GameResult<Json<RoundListResponse>> {
    let rounds = state.list_rounds(20).await?;
    Ok(Json(RoundListResponse { rounds }))
}

#[derive(Debug, Clone, Serialize)]
pub struct LobbyPlayer {
    pub email: UserEmail,
    pub choice: Tool,
    pub joined_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LobbyInfo {
    pub count: usize,
    pub players: Vec<LobbyPlayer>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundDetailResponse {
    pub round: Round,
    pub user_guess: Option<Guess>,
    pub lobby: LobbyInfo,
}

/// Round data plus the caller's guess plus who already finished round 1.
pub async fn get_round(
    State(state): State<Arc<AppState>>,
    Path(round_id): Path<String>,
    CurrentUser(email): CurrentUser,
) -> GameResult<Json<RoundDetailResponse>> {
    let round = state.get_round(&round_id).await?;
    let user_guess = state.find_guess(&email, &round_id).await?;

    let players: Vec<LobbyPlayer> = state
        .round_one_lobby(&round_id)
        .await?
        .into_iter()
        .filter_map(|g| {
            g.round1_choice.map(|choice| LobbyPlayer {
                email: g.user_email,
                choice,
                joined_at: g.created_at,
            })
        })
        .collect();

    Ok(Json(RoundDetailResponse {
        round,
        user_guess,
        lobby: LobbyInfo {
            count: players.len(),
            players,
        },
    }))
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceRequest {
    pub choice: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GuessResponse {
    pub guess: Guess,
}

pub async fn submit_round_one(
    State(state): State<Arc<AppState>>,
    Path(round_id): Path<String>,
    CurrentUser(email): CurrentUser,
    Json(req): Json<ChoiceRequest>,
) -> GameResult<Json<GuessResponse>> {
    let choice: Tool = req.choice.parse()?;
    let guess = state
        .submit_round_one_choice(&email, &round_id, choice)
        .await?;
    Ok(Json(GuessResponse { guess }))
}

pub async fn submit_round_two(
    State(state): State<Arc<AppState>>,
    Path(round_id): Path<String>,
    CurrentUser(email): CurrentUser,
    Json(req): Json<ChoiceRequest>,
) -> GameResult<Json<GuessResponse>> {
    let choice: LinkId = req.choice.parse()?;
    let guess = state
        .submit_round_two_choice(&email, &round_id, choice)
        .await?;
    Ok(Json(GuessResponse { guess }))
}

#[derive(Debug, Clone, Serialize)]
pub struct VoteResponse {
    pub vote: Vote,
}

/// Single-phase rounds only; the vote is rewritable until the round closes.
pub async fn submit_vote(
    State(state): State<Arc<AppState>>,
    Path(round_id): Path<String>,
    CurrentUser(email): CurrentUser,
    Json(req): Json<ChoiceRequest>,
) -> GameResult<Json<VoteResponse>> {
    let choice: LinkId = req.choice.parse()?;
    let vote = state.submit_link_vote(&email, &round_id, choice).await?;
    Ok(Json(VoteResponse { vote }))
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundResultEntry {
    pub user_email: UserEmail,
    pub round1_choice: Option<Tool>,
    pub round2_choice: Option<LinkId>,
    pub points_earned: u32,
    pub breakdown: Option<PointsBreakdown>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultsResponse {
    pub round: Round,
    pub leaderboard: Vec<RoundResultEntry>,
    pub vote_distribution: BTreeMap<LinkId, u32>,
    pub total_players: usize,
    pub total_votes: u32,
}

/// Results for an ended round. Backfills the most-voted link if the close
/// didn't persist it, and re-finalizes guesses; both are idempotent so a
/// poll loop can hit this freely.
pub async fn results(
    State(state): State<Arc<AppState>>,
    Path(round_id): Path<String>,
    _user: CurrentUser,
) -> GameResult<Json<ResultsResponse>> {
    let round = state.get_round(&round_id).await?;
    if round.status != RoundStatus::Ended {
        return Err(GameError::PreconditionFailed(
            "results are not available until the round has ended".to_string(),
        ));
    }

    let most_voted = state.ensure_most_voted_link(&round).await?;
    let finalized = state.finalize_round_guesses(&round, most_voted).await?;

    let mut leaderboard: Vec<RoundResultEntry> = finalized
        .into_iter()
        .map(|g| RoundResultEntry {
            user_email: g.user_email,
            round1_choice: g.round1_choice,
            round2_choice: g.round2_choice,
            points_earned: g.points_earned,
            breakdown: g.breakdown,
        })
        .collect();
    leaderboard.sort_by(|a, b| b.points_earned.cmp(&a.points_earned));

    let vote_distribution = state.vote_distribution(&round_id).await?;
    let total_votes = vote_distribution.values().sum();
    let total_players = leaderboard.len();
    let round = state.get_round(&round_id).await?;

    Ok(Json(ResultsResponse {
        round,
        leaderboard,
        vote_distribution,
        total_players,
        total_votes,
    }))
}
