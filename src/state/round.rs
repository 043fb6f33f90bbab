use std::collections::HashSet;

use super::AppState;
use crate::error::{GameError, GameResult};
use crate::types::*;

impl AppState {
    /// Create a new round in the waiting state. The link mappings must be a
    /// bijection between the four link slots and the four tools.
    pub async fn create_round(
        &self,
        title: Option<String>,
        scoring_mode: ScoringMode,
        link_mappings: Vec<LinkMapping>,
    ) -> GameResult<Round> {
        validate_link_mappings(&link_mappings)?;

        let round = Round {
            id: ulid::Ulid::new().to_string(),
            title: title.unwrap_or_else(|| "VibeBet Game".to_string()),
            scoring_mode,
            link_mappings,
            status: RoundStatus::Waiting,
            most_voted_link: None,
            created_at: chrono::Utc::now().to_rfc3339(),
            ended_at: None,
        };

        self.rounds.create(round).await
    }

    pub async fn get_round(&self, round_id: &str) -> GameResult<Round> {
        self.rounds
            .get(round_id)
            .await?
            .ok_or(GameError::NotFound("round"))
    }

    pub async fn list_rounds(&self, limit: usize) -> GameResult<Vec<Round>> {
        self.rounds.list_recent(limit).await
    }

    pub async fn delete_round(&self, round_id: &str) -> GameResult<()> {
        self.rounds.delete(round_id).await
    }

    /// Check if a status transition is valid for the round's scoring mode
    fn is_valid_status_transition(mode: ScoringMode, from: RoundStatus, to: RoundStatus) -> bool {
        use RoundStatus::*;

        match (mode, from, to) {
            // Two-phase forward flow
            (ScoringMode::TwoPhase, Waiting, Round1) => true,
            (ScoringMode::TwoPhase, Round1, Round2) => true,
            (ScoringMode::TwoPhase, Round2, Ended) => true,

            // Single-phase forward flow
            (ScoringMode::SinglePhase, Waiting, Active) => true,
            (ScoringMode::SinglePhase, Active, Ended) => true,

            // Reset back to waiting, only from open states
            (ScoringMode::TwoPhase, Round1 | Round2, Waiting) => true,
            (ScoringMode::SinglePhase, Active, Waiting) => true,

            _ => false,
        }
    }

    /// Move a round to `next`. Ending a round additionally runs the tally
    /// and finalizes every guess.
    pub async fn transition_round(&self, round_id: &str, next: RoundStatus) -> GameResult<Round> {
        let round = self.get_round(round_id).await?;

        // Terminal state: repeated closes are rejected, not reprocessed.
        if round.status == RoundStatus::Ended {
            return Err(GameError::PreconditionFailed(
                "round already ended".to_string(),
            ));
        }

        if !Self::is_valid_status_transition(round.scoring_mode, round.status, next) {
            return Err(GameError::PreconditionFailed(format!(
                "cannot move round from {:?} to {:?}",
                round.status, next
            )));
        }

        if next == RoundStatus::Ended {
            self.close_round(&round).await
        } else {
            self.rounds
                .update_status(round_id, round.status, next, None)
                .await
        }
    }

    /// Open the round for its first phase (round1 for two-phase rounds,
    /// active for single-phase ones).
    pub async fn start_round(&self, round_id: &str) -> GameResult<Round> {
        let round = self.get_round(round_id).await?;
        let next = match round.scoring_mode {
            ScoringMode::TwoPhase => RoundStatus::Round1,
            ScoringMode::SinglePhase => RoundStatus::Active,
        };
        self.transition_round(round_id, next).await
    }

    /// Close the round: compare-and-set to ended, persist the most-voted
    /// link, then finalize all guesses. The CAS blocks a racing close from
    /// double-running the scoring batch.
    async fn close_round(&self, round: &Round) -> GameResult<Round> {
        let ended_at = chrono::Utc::now().to_rfc3339();
        let closed = self
            .rounds
            .update_status(&round.id, round.status, RoundStatus::Ended, Some(ended_at))
            .await?;

        let most_voted = self.ensure_most_voted_link(&closed).await?;
        self.finalize_round_guesses(&closed, most_voted).await?;

        tracing::info!(
            round_id = %closed.id,
            most_voted = ?most_voted,
            "Round closed and scored"
        );
        self.get_round(&closed.id).await
    }
}

/// Exactly four mappings, each link slot and each tool used exactly once.
fn validate_link_mappings(mappings: &[LinkMapping]) -> GameResult<()> {
    if mappings.len() != 4 {
        return Err(GameError::InvalidInput(
            "must provide exactly 4 link mappings".to_string(),
        ));
    }

    let links: HashSet<LinkId> = mappings.iter().map(|m| m.link_id).collect();
    if links.len() != 4 {
        return Err(GameError::InvalidInput(
            "must provide mappings for LinkA, LinkB, LinkC, LinkD".to_string(),
        ));
    }

    let tools: HashSet<Tool> = mappings.iter().map(|m| m.tool).collect();
    if tools.len() != 4 {
        return Err(GameError::InvalidInput(
            "each tool must be mapped to exactly one link".to_string(),
        ));
    }

    Ok(())
}
