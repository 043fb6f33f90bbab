use super::AppState;
use crate::error::{GameError, GameResult};
use crate::types::*;

impl AppState {
    /// Record a user's round 1 tool choice. Fails when the round isn't open
    /// for round 1 or the user already chose.
    pub async fn submit_round_one_choice(
        &self,
        user_email: &str,
        round_id: &str,
        choice: Tool,
    ) -> GameResult<Guess> {
        let round = self.get_round(round_id).await?;
        if !round.is_open_for_round_one() {
            return Err(GameError::PreconditionFailed(format!(
                "round is not open for a tool choice (status {:?})",
                round.status
            )));
        }

        let now = chrono::Utc::now().to_rfc3339();
        self.guesses
            .record_round_one_choice(user_email, round_id, choice, now)
            .await
    }

    /// Record a user's round 2 link choice. Requires a completed round 1
    /// and, because the tally reads votes, also upserts the user's vote.
    pub async fn submit_round_two_choice(
        &self,
        user_email: &str,
        round_id: &str,
        choice: LinkId,
    ) -> GameResult<Guess> {
        let round = self.get_round(round_id).await?;
        if round.scoring_mode != ScoringMode::TwoPhase {
            return Err(GameError::PreconditionFailed(
                "single-phase rounds take link votes, not round 2 choices".to_string(),
            ));
        }
        if !round.is_open_for_round_two() {
            return Err(GameError::PreconditionFailed(format!(
                "round is not open for a link choice (status {:?})",
                round.status
            )));
        }

        let now = chrono::Utc::now().to_rfc3339();
        let guess = self
            .guesses
            .record_round_two_choice(user_email, round_id, choice, now.clone())
            .await?;
        self.votes
            .upsert(user_email, round_id, choice, now)
            .await?;

        Ok(guess)
    }

    /// Record a link vote for a single-phase round. Votes are last-write-
    /// wins, so re-voting changes the tally but never touches the guess.
    pub async fn submit_link_vote(
        &self,
        user_email: &str,
        round_id: &str,
        choice: LinkId,
    ) -> GameResult<Vote> {
        let round = self.get_round(round_id).await?;
        if round.scoring_mode != ScoringMode::SinglePhase {
            return Err(GameError::PreconditionFailed(
                "two-phase rounds record link choices through round 2".to_string(),
            ));
        }
        if !round.is_open_for_round_two() {
            return Err(GameError::PreconditionFailed(format!(
                "round is not open for voting (status {:?})",
                round.status
            )));
        }

        let now = chrono::Utc::now().to_rfc3339();
        self.votes.upsert(user_email, round_id, choice, now).await
    }

    pub async fn find_guess(&self, user_email: &str, round_id: &str) -> GameResult<Option<Guess>> {
        self.guesses.find(user_email, round_id).await
    }

    /// Users who completed round 1, for the round's lobby view.
    pub async fn round_one_lobby(&self, round_id: &str) -> GameResult<Vec<Guess>> {
        let guesses = self.guesses.list_by_round(round_id).await?;
        Ok(guesses
            .into_iter()
            .filter(|g| g.round1_choice.is_some())
            .collect())
    }
}
