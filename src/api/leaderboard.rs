//! Cross-round leaderboard and per-user history endpoints.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::auth::CurrentUser;
use crate::error::GameResult;
use crate::state::{AppState, GameHistoryEntry, LeaderboardEntry};

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardResponse {
    /// The calling user's own row, unranked when they haven't played.
    pub user_stats: LeaderboardEntry,
    pub global_leaderboard: Vec<LeaderboardEntry>,
    pub total_players: usize,
}

pub async fn global_leaderboard(
    State(state): State<Arc<AppState>>,
    CurrentUser(email): CurrentUser,
) -> GameResult<Json<LeaderboardResponse>> {
    let global = state.global_leaderboard().await?;
    let user_stats = global
        .iter()
        .find(|e| e.user_email == email)
        .cloned()
        .unwrap_or_else(|| LeaderboardEntry {
            user_email: email,
            total_points: 0,
            games_played: 0,
            average_points: 0.0,
            rank: None,
        });

    let total_players = global.len();
    Ok(Json(LeaderboardResponse {
        user_stats,
        global_leaderboard: global,
        total_players,
    }))
}

#[derive(Debug, Clone, Serialize)]
pub struct GameHistoryResponse {
    pub game_history: Vec<GameHistoryEntry>,
    pub total_games_played: usize,
}

pub async fn game_history(
    State(state): State<Arc<AppState>>,
    CurrentUser(email): CurrentUser,
) -> GameResult<Json<GameHistoryResponse>> {
    let game_history = state.game_history(&email, 10).await?;
    let total_games_played = game_history.len();
    Ok(Json(GameHistoryResponse {
        game_history,
        total_games_played,
    }))
}
