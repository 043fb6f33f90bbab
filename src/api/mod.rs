//! HTTP API endpoints.
//!
//! Thin axum glue over the game engine: handlers authenticate, parse, call
//! one engine operation, and serialize the result. The state machine and
//! scoring rules all live under `state/`.

pub mod admin;
pub mod leaderboard;
pub mod rounds;

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::state::AppState;

/// Wire shape of every rejected request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    pub retryable: bool,
}

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        let status = match self {
            GameError::NotFound(_) => StatusCode::NOT_FOUND,
            GameError::Unauthorized => StatusCode::UNAUTHORIZED,
            GameError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            GameError::PreconditionFailed(_) | GameError::Conflict(_) => StatusCode::CONFLICT,
            GameError::RepositoryUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let body = ErrorBody {
            error: self.code().to_string(),
            message: self.to_string(),
            retryable: self.is_retryable(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/rounds", get(rounds::list_rounds))
        .route("/api/rounds/{round_id}", get(rounds::get_round))
        .route("/api/rounds/{round_id}/round1", post(rounds::submit_round_one))
        .route("/api/rounds/{round_id}/round2", post(rounds::submit_round_two))
        .route("/api/rounds/{round_id}/vote", post(rounds::submit_vote))
        .route("/api/rounds/{round_id}/results", get(rounds::results))
        .route("/api/leaderboard", get(leaderboard::global_leaderboard))
        .route("/api/user/game-history", get(leaderboard::game_history))
        .route("/api/admin/rounds", post(admin::create_round))
        .route(
            "/api/admin/rounds/{round_id}",
            patch(admin::update_status).delete(admin::delete_round),
        )
        .route(
            "/api/admin/rounds/{round_id}/start-round1",
            post(admin::start_round_one),
        )
        .route(
            "/api/admin/rounds/{round_id}/start-round2",
            post(admin::start_round_two),
        )
        .route("/api/admin/rounds/{round_id}/end-game", post(admin::end_game))
        .with_state(state)
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub email: String,
}

/// Exchange an email for a bearer session token. Stands in for the external
/// identity provider; everything else resolves identity from the token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, GameError> {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(GameError::InvalidInput("a valid email is required".to_string()));
    }

    let token = state.sessions.issue(&email).await;
    Ok(Json(LoginResponse { token, email }))
}
