use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::GameResult;
use crate::types::*;

/// One row of the cross-round leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_email: UserEmail,
    pub total_points: u32,
    pub games_played: u32,
    /// Rounded to one decimal.
    pub average_points: f64,
    /// 1-based position in the ranked list; `None` for users with no
    /// completed rounds.
    pub rank: Option<u32>,
}

impl LeaderboardEntry {
    fn unranked(user_email: &str) -> Self {
        Self {
            user_email: user_email.to_string(),
            total_points: 0,
            games_played: 0,
            average_points: 0.0,
            rank: None,
        }
    }
}

/// One entry of a user's personal game history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameHistoryEntry {
    pub round_id: RoundId,
    pub round_title: String,
    pub round_status: RoundStatus,
    pub round1_choice: Option<Tool>,
    pub round2_choice: Option<LinkId>,
    pub points_earned: u32,
    pub is_fully_completed: bool,
    pub completed_at: String,
}

impl AppState {
    /// Rank all users by points earned across completed guesses. This is a
    /// pure view over the guesses (not the ledger), so it stays correct
    /// even if the ledger were rebuilt from scratch.
    ///
    /// Users tied on points keep the order their guesses were first seen
    /// in; the sort below is stable, which makes that tie-break hold.
    pub async fn global_leaderboard(&self) -> GameResult<Vec<LeaderboardEntry>> {
        let guesses = self.guesses.list_completed().await?;

        let mut entries: Vec<LeaderboardEntry> = Vec::new();
        let mut index_by_user: HashMap<UserEmail, usize> = HashMap::new();

        for guess in guesses {
            let idx = *index_by_user
                .entry(guess.user_email.clone())
                .or_insert_with(|| {
                    entries.push(LeaderboardEntry::unranked(&guess.user_email));
                    entries.len() - 1
                });
            entries[idx].total_points += guess.points_earned;
            entries[idx].games_played += 1;
        }

        entries.sort_by(|a, b| b.total_points.cmp(&a.total_points));

        for (i, entry) in entries.iter_mut().enumerate() {
            entry.average_points = round_one_decimal(entry.total_points, entry.games_played);
            entry.rank = Some(i as u32 + 1);
        }

        Ok(entries)
    }

    /// A single user's leaderboard row, zero-valued and unranked when the
    /// user has no completed rounds.
    pub async fn user_stats(&self, user_email: &str) -> GameResult<LeaderboardEntry> {
        let leaderboard = self.global_leaderboard().await?;
        Ok(leaderboard
            .into_iter()
            .find(|e| e.user_email == user_email)
            .unwrap_or_else(|| LeaderboardEntry::unranked(user_email)))
    }

    /// The user's last `limit` games, newest first.
    pub async fn game_history(
        &self,
        user_email: &str,
        limit: usize,
    ) -> GameResult<Vec<GameHistoryEntry>> {
        let guesses = self.guesses.list_by_user(user_email).await?;

        let mut history = Vec::new();
        for guess in guesses {
            if guess.round1_choice.is_none() {
                continue;
            }
            // Guesses can outlive a deleted round; skip the orphans.
            let Some(round) = self.rounds.get(&guess.round_id).await? else {
                continue;
            };

            let completed_at = guess
                .round2_completed_at
                .clone()
                .or_else(|| guess.round1_completed_at.clone())
                .unwrap_or_else(|| guess.created_at.clone());

            history.push(GameHistoryEntry {
                round_id: round.id,
                round_title: round.title,
                round_status: round.status,
                round1_choice: guess.round1_choice,
                round2_choice: guess.round2_choice,
                points_earned: guess.points_earned,
                is_fully_completed: guess.is_complete(),
                completed_at,
            });
        }

        history.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        history.truncate(limit);
        Ok(history)
    }
}

fn round_one_decimal(total: u32, games: u32) -> f64 {
    if games == 0 {
        return 0.0;
    }
    (total as f64 / games as f64 * 10.0).round() / 10.0
}
