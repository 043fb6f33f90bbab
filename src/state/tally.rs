use std::collections::BTreeMap;

use super::AppState;
use crate::error::GameResult;
use crate::types::*;

/// Count votes per link. A `BTreeMap` keeps the groups in ascending link
/// order, which the tie-break below depends on.
pub fn count_votes(votes: &[Vote]) -> BTreeMap<LinkId, u32> {
    let mut counts = BTreeMap::new();
    for vote in votes {
        *counts.entry(vote.link_choice).or_insert(0) += 1;
    }
    counts
}

/// The link with the strictly highest vote count. Ties go to the lowest
/// link id (A before B before C before D); zero votes yield `None`.
pub fn most_voted_link(counts: &BTreeMap<LinkId, u32>) -> Option<LinkId> {
    let mut best: Option<(LinkId, u32)> = None;
    for (&link, &count) in counts {
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((link, count)),
        }
    }
    best.map(|(link, _)| link)
}

impl AppState {
    /// Make sure the round's most-voted link is computed and persisted.
    /// Returns the stored value when one already exists, so repeated calls
    /// (round close, every results read) never change the outcome.
    pub async fn ensure_most_voted_link(&self, round: &Round) -> GameResult<Option<LinkId>> {
        if let Some(link) = round.most_voted_link {
            return Ok(Some(link));
        }

        let votes = self.votes.list_by_round(&round.id).await?;
        match most_voted_link(&count_votes(&votes)) {
            Some(link) => {
                let stored = self.rounds.set_most_voted_link(&round.id, link).await?;
                Ok(Some(stored))
            }
            // No votes: majority is undefined and nothing is persisted.
            None => Ok(None),
        }
    }

    /// Vote counts per link for a round's results view.
    pub async fn vote_distribution(&self, round_id: &str) -> GameResult<BTreeMap<LinkId, u32>> {
        let votes = self.votes.list_by_round(round_id).await?;
        Ok(count_votes(&votes))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    fn vote(user: &str, link: LinkId) -> Vote {
        Vote {
            user_email: user.to_string(),
            round_id: "r1".to_string(),
            link_choice: link,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    #[test]
    fn test_empty_tally_has_no_winner() {
        let counts = count_votes(&[]);
        assert!(counts.is_empty());
        assert_eq!(most_voted_link(&counts), None);
    }

    #[test]
    fn test_strict_majority_wins() {
        let votes = vec![
            vote("u1", LinkId::C),
            vote("u2", LinkId::B),
            vote("u3", LinkId::C),
        ];
        let counts = count_votes(&votes);
        assert_eq!(counts.get(&LinkId::C), Some(&2));
        assert_eq!(most_voted_link(&counts), Some(LinkId::C));
    }

    #[test]
    fn test_tie_goes_to_lowest_link_id() {
        // A:3, B:3, C:1 -> A wins the tie
        let votes = vec![
            vote("u1", LinkId::B),
            vote("u2", LinkId::A),
            vote("u3", LinkId::B),
            vote("u4", LinkId::A),
            vote("u5", LinkId::C),
            vote("u6", LinkId::A),
            vote("u7", LinkId::B),
        ];
        assert_eq!(most_voted_link(&count_votes(&votes)), Some(LinkId::A));

        // Same result regardless of vote arrival order
        let mut reversed = votes;
        reversed.reverse();
        assert_eq!(most_voted_link(&count_votes(&reversed)), Some(LinkId::A));
    }

    #[tokio::test]
    async fn test_ensure_most_voted_link_computes_once() {
        let state = test_state();
        let round = state
            .create_round(None, ScoringMode::TwoPhase, standard_mappings())
            .await
            .unwrap();

        let now = chrono::Utc::now().to_rfc3339();
        state
            .votes
            .upsert("u1@example.com", &round.id, LinkId::B, now.clone())
            .await
            .unwrap();

        let round = state.get_round(&round.id).await.unwrap();
        assert_eq!(
            state.ensure_most_voted_link(&round).await.unwrap(),
            Some(LinkId::B)
        );

        // Later votes must not change the persisted result.
        state
            .votes
            .upsert("u2@example.com", &round.id, LinkId::D, now.clone())
            .await
            .unwrap();
        state
            .votes
            .upsert("u3@example.com", &round.id, LinkId::D, now)
            .await
            .unwrap();

        let round = state.get_round(&round.id).await.unwrap();
        assert_eq!(round.most_voted_link, Some(LinkId::B));
        assert_eq!(
            state.ensure_most_voted_link(&round).await.unwrap(),
            Some(LinkId::B)
        );
    }

    #[tokio::test]
    async fn test_ensure_most_voted_link_with_no_votes() {
        let state = test_state();
        let round = state
            .create_round(None, ScoringMode::TwoPhase, standard_mappings())
            .await
            .unwrap();

        assert_eq!(state.ensure_most_voted_link(&round).await.unwrap(), None);
        let round = state.get_round(&round.id).await.unwrap();
        assert_eq!(round.most_voted_link, None);
    }
}
