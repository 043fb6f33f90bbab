use super::AppState;
use crate::error::GameResult;
use crate::types::*;

/// Round 2 link resolves to the round 1 tool.
pub const TOOL_MATCH_POINTS: u32 = 30;
/// Tool match plus the round 2 link being the crowd favorite.
pub const MOST_VOTED_BONUS_POINTS: u32 = 100;
/// Single-phase mode: guessed the tool behind the winning link.
pub const WINNER_TOOL_POINTS: u32 = 100;

/// Compute one guess's award from stored facts only. Pure: identical inputs
/// always produce the identical breakdown, so finalization can rerun on
/// every results read.
pub fn score_guess(
    round: &Round,
    most_voted: Option<LinkId>,
    guess: &Guess,
) -> PointsBreakdown {
    match round.scoring_mode {
        ScoringMode::TwoPhase => score_two_phase(round, most_voted, guess),
        ScoringMode::SinglePhase => score_single_phase(round, most_voted, guess),
    }
}

fn score_two_phase(round: &Round, most_voted: Option<LinkId>, guess: &Guess) -> PointsBreakdown {
    let (Some(tool_choice), Some(link_choice)) = (guess.round1_choice, guess.round2_choice) else {
        return PointsBreakdown::ZERO;
    };
    let Some(mapped_tool) = round.tool_for_link(link_choice) else {
        return PointsBreakdown::ZERO;
    };

    if mapped_tool != tool_choice {
        // Wrong tool scores nothing, even when the link is the crowd pick.
        return PointsBreakdown::ZERO;
    }

    let mut breakdown = PointsBreakdown {
        tool_match: true,
        tool_match_points: TOOL_MATCH_POINTS,
        ..PointsBreakdown::ZERO
    };

    // The crowd bonus is conditioned on the tool match above.
    if most_voted == Some(link_choice) {
        breakdown.most_voted_bonus = true;
        breakdown.most_voted_points = MOST_VOTED_BONUS_POINTS;
    }

    breakdown
}

fn score_single_phase(round: &Round, most_voted: Option<LinkId>, guess: &Guess) -> PointsBreakdown {
    let Some(tool_choice) = guess.round1_choice else {
        return PointsBreakdown::ZERO;
    };
    let Some(winner_tool) = most_voted.and_then(|link| round.tool_for_link(link)) else {
        return PointsBreakdown::ZERO;
    };

    if tool_choice != winner_tool {
        return PointsBreakdown::ZERO;
    }

    PointsBreakdown {
        tool_match: true,
        tool_match_points: WINNER_TOOL_POINTS,
        ..PointsBreakdown::ZERO
    }
}

impl AppState {
    /// Finalize every guess of a round: write the computed points back onto
    /// the guess (replace, not increment) and credit the user's running
    /// total at most once per round. One failing guess never blocks the
    /// rest of the batch.
    pub async fn finalize_round_guesses(
        &self,
        round: &Round,
        most_voted: Option<LinkId>,
    ) -> GameResult<Vec<Guess>> {
        let guesses = self.guesses.list_by_round(&round.id).await?;
        let mut finalized = Vec::with_capacity(guesses.len());

        for guess in guesses {
            match self.finalize_guess(round, most_voted, &guess).await {
                Ok(updated) => finalized.push(updated),
                Err(e) => {
                    tracing::warn!(
                        round_id = %round.id,
                        user = %guess.user_email,
                        error = %e,
                        "Failed to finalize guess, continuing with the rest"
                    );
                }
            }
        }

        Ok(finalized)
    }

    async fn finalize_guess(
        &self,
        round: &Round,
        most_voted: Option<LinkId>,
        guess: &Guess,
    ) -> GameResult<Guess> {
        let breakdown = score_guess(round, most_voted, guess);
        let total = breakdown.total();

        self.guesses
            .set_points(&guess.user_email, &round.id, total, breakdown)
            .await?;
        let credited = self
            .ledger
            .add_points_once(&guess.user_email, &round.id, total)
            .await?;

        if credited && total > 0 {
            tracing::debug!(
                round_id = %round.id,
                user = %guess.user_email,
                points = total,
                "Credited points"
            );
        }

        let mut updated = guess.clone();
        updated.points_earned = total;
        updated.breakdown = Some(breakdown);
        Ok(updated)
    }
}
