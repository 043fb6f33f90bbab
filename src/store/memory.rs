//! In-memory store used by the binary and by tests.
//!
//! Every operation takes a single lock acquisition per table, which gives
//! the per-document atomicity the engine relies on: check-and-set decisions
//! happen while holding the write lock.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{GuessStore, RoundStore, UserLedger, VoteStore};
use crate::error::{GameError, GameResult};
use crate::types::*;

#[derive(Default)]
struct GuessTable {
    rows: HashMap<(UserEmail, RoundId), Guess>,
    /// Insertion order of keys, for stable listing.
    order: Vec<(UserEmail, RoundId)>,
}

#[derive(Default)]
struct LedgerEntry {
    points: u32,
    credited_rounds: HashSet<RoundId>,
}

#[derive(Default)]
pub struct MemoryStore {
    rounds: RwLock<HashMap<RoundId, Round>>,
    guesses: RwLock<GuessTable>,
    votes: RwLock<GuessKeyed<Vote>>,
    users: RwLock<HashMap<UserEmail, LedgerEntry>>,
}

/// Votes share the (user, round) keying of guesses.
type GuessKeyed<T> = HashMap<(UserEmail, RoundId), T>;

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn key(user_email: &str, round_id: &str) -> (UserEmail, RoundId) {
    (user_email.to_string(), round_id.to_string())
}

#[async_trait]
impl RoundStore for MemoryStore {
    async fn create(&self, round: Round) -> GameResult<Round> {
        self.rounds
            .write()
            .await
            .insert(round.id.clone(), round.clone());
        Ok(round)
    }

    async fn get(&self, round_id: &str) -> GameResult<Option<Round>> {
        Ok(self.rounds.read().await.get(round_id).cloned())
    }

    async fn list_recent(&self, limit: usize) -> GameResult<Vec<Round>> {
        let rounds = self.rounds.read().await;
        let mut all: Vec<Round> = rounds.values().cloned().collect();
        // Round ids are ulids, so the id is a creation-time tiebreaker.
        all.sort_by(|a, b| (&b.created_at, &b.id).cmp(&(&a.created_at, &a.id)));
        all.truncate(limit);
        Ok(all)
    }

    async fn update_status(
        &self,
        round_id: &str,
        expected: RoundStatus,
        next: RoundStatus,
        ended_at: Option<String>,
    ) -> GameResult<Round> {
        let mut rounds = self.rounds.write().await;
        let round = rounds.get_mut(round_id).ok_or(GameError::NotFound("round"))?;

        if round.status != expected {
            return Err(GameError::Conflict(format!(
                "round status changed (expected {:?}, found {:?})",
                expected, round.status
            )));
        }

        round.status = next;
        if ended_at.is_some() {
            round.ended_at = ended_at;
        }
        Ok(round.clone())
    }

    async fn set_most_voted_link(&self, round_id: &str, link: LinkId) -> GameResult<LinkId> {
        let mut rounds = self.rounds.write().await;
        let round = rounds.get_mut(round_id).ok_or(GameError::NotFound("round"))?;

        match round.most_voted_link {
            Some(existing) => Ok(existing),
            None => {
                round.most_voted_link = Some(link);
                Ok(link)
            }
        }
    }

    async fn delete(&self, round_id: &str) -> GameResult<()> {
        self.rounds
            .write()
            .await
            .remove(round_id)
            .map(|_| ())
            .ok_or(GameError::NotFound("round"))
    }
}

#[async_trait]
impl GuessStore for MemoryStore {
    async fn find(&self, user_email: &str, round_id: &str) -> GameResult<Option<Guess>> {
        Ok(self
            .guesses
            .read()
            .await
            .rows
            .get(&key(user_email, round_id))
            .cloned())
    }

    async fn record_round_one_choice(
        &self,
        user_email: &str,
        round_id: &str,
        choice: Tool,
        at: String,
    ) -> GameResult<Guess> {
        let mut table = self.guesses.write().await;
        let k = key(user_email, round_id);

        match table.rows.get_mut(&k) {
            Some(guess) if guess.round1_choice.is_some() => Err(GameError::PreconditionFailed(
                "round 1 choice already made".to_string(),
            )),
            Some(guess) => {
                guess.round1_choice = Some(choice);
                guess.round1_completed_at = Some(at);
                Ok(guess.clone())
            }
            None => {
                let guess = Guess {
                    user_email: user_email.to_string(),
                    round_id: round_id.to_string(),
                    round1_choice: Some(choice),
                    round1_completed_at: Some(at.clone()),
                    round2_choice: None,
                    round2_completed_at: None,
                    points_earned: 0,
                    breakdown: None,
                    created_at: at,
                };
                table.rows.insert(k.clone(), guess.clone());
                table.order.push(k);
                Ok(guess)
            }
        }
    }

    async fn record_round_two_choice(
        &self,
        user_email: &str,
        round_id: &str,
        choice: LinkId,
        at: String,
    ) -> GameResult<Guess> {
        let mut table = self.guesses.write().await;

        let guess = table
            .rows
            .get_mut(&key(user_email, round_id))
            .filter(|g| g.round1_choice.is_some())
            .ok_or_else(|| {
                GameError::PreconditionFailed("round 1 must be completed first".to_string())
            })?;

        if guess.round2_choice.is_some() {
            return Err(GameError::PreconditionFailed(
                "round 2 choice already made".to_string(),
            ));
        }

        guess.round2_choice = Some(choice);
        guess.round2_completed_at = Some(at);
        Ok(guess.clone())
    }

    async fn set_points(
        &self,
        user_email: &str,
        round_id: &str,
        points: u32,
        breakdown: PointsBreakdown,
    ) -> GameResult<()> {
        let mut table = self.guesses.write().await;
        let guess = table
            .rows
            .get_mut(&key(user_email, round_id))
            .ok_or(GameError::NotFound("guess"))?;

        guess.points_earned = points;
        guess.breakdown = Some(breakdown);
        Ok(())
    }

    async fn list_by_round(&self, round_id: &str) -> GameResult<Vec<Guess>> {
        let table = self.guesses.read().await;
        Ok(table
            .order
            .iter()
            .filter(|(_, r)| r == round_id)
            .filter_map(|k| table.rows.get(k).cloned())
            .collect())
    }

    async fn list_completed(&self) -> GameResult<Vec<Guess>> {
        let table = self.guesses.read().await;
        Ok(table
            .order
            .iter()
            .filter_map(|k| table.rows.get(k))
            .filter(|g| g.is_complete())
            .cloned()
            .collect())
    }

    async fn list_by_user(&self, user_email: &str) -> GameResult<Vec<Guess>> {
        let table = self.guesses.read().await;
        Ok(table
            .order
            .iter()
            .filter(|(u, _)| u == user_email)
            .filter_map(|k| table.rows.get(k).cloned())
            .collect())
    }
}

#[async_trait]
impl VoteStore for MemoryStore {
    async fn upsert(
        &self,
        user_email: &str,
        round_id: &str,
        choice: LinkId,
        at: String,
    ) -> GameResult<Vote> {
        let vote = Vote {
            user_email: user_email.to_string(),
            round_id: round_id.to_string(),
            link_choice: choice,
            created_at: at,
        };
        self.votes
            .write()
            .await
            .insert(key(user_email, round_id), vote.clone());
        Ok(vote)
    }

    async fn list_by_round(&self, round_id: &str) -> GameResult<Vec<Vote>> {
        Ok(self
            .votes
            .read()
            .await
            .values()
            .filter(|v| v.round_id == round_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UserLedger for MemoryStore {
    async fn add_points_once(
        &self,
        user_email: &str,
        round_id: &str,
        amount: u32,
    ) -> GameResult<bool> {
        let mut users = self.users.write().await;
        let entry = users.entry(user_email.to_string()).or_default();

        if !entry.credited_rounds.insert(round_id.to_string()) {
            return Ok(false);
        }
        entry.points += amount;
        Ok(true)
    }

    async fn get(&self, user_email: &str) -> GameResult<UserPoints> {
        let users = self.users.read().await;
        Ok(UserPoints {
            email: user_email.to_string(),
            points: users.get(user_email).map(|e| e.points).unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> String {
        chrono::Utc::now().to_rfc3339()
    }

    #[tokio::test]
    async fn test_round_one_choice_is_write_once() {
        let store = MemoryStore::new();

        let guess = store
            .record_round_one_choice("a@example.com", "r1", Tool::Bolt, now())
            .await
            .unwrap();
        assert_eq!(guess.round1_choice, Some(Tool::Bolt));

        let err = store
            .record_round_one_choice("a@example.com", "r1", Tool::V0, now())
            .await
            .unwrap_err();
        assert!(matches!(err, GameError::PreconditionFailed(_)));

        // The stored choice must still be the first submission.
        let stored = store.find("a@example.com", "r1").await.unwrap().unwrap();
        assert_eq!(stored.round1_choice, Some(Tool::Bolt));
    }

    #[tokio::test]
    async fn test_round_two_requires_round_one() {
        let store = MemoryStore::new();

        let err = store
            .record_round_two_choice("a@example.com", "r1", LinkId::B, now())
            .await
            .unwrap_err();
        assert!(matches!(err, GameError::PreconditionFailed(_)));

        store
            .record_round_one_choice("a@example.com", "r1", Tool::Bolt, now())
            .await
            .unwrap();
        let guess = store
            .record_round_two_choice("a@example.com", "r1", LinkId::B, now())
            .await
            .unwrap();
        assert_eq!(guess.round2_choice, Some(LinkId::B));

        let err = store
            .record_round_two_choice("a@example.com", "r1", LinkId::C, now())
            .await
            .unwrap_err();
        assert!(matches!(err, GameError::PreconditionFailed(_)));
    }

    #[tokio::test]
    async fn test_update_status_is_compare_and_set() {
        let store = MemoryStore::new();
        let round = Round {
            id: "r1".to_string(),
            title: "Test".to_string(),
            scoring_mode: ScoringMode::TwoPhase,
            link_mappings: Vec::new(),
            status: RoundStatus::Waiting,
            most_voted_link: None,
            created_at: now(),
            ended_at: None,
        };
        RoundStore::create(&store, round).await.unwrap();

        let updated = store
            .update_status("r1", RoundStatus::Waiting, RoundStatus::Round1, None)
            .await
            .unwrap();
        assert_eq!(updated.status, RoundStatus::Round1);

        // Stale expectation loses the race and changes nothing.
        let err = store
            .update_status("r1", RoundStatus::Waiting, RoundStatus::Round2, None)
            .await
            .unwrap_err();
        assert!(matches!(err, GameError::Conflict(_)));
        let stored = RoundStore::get(&store, "r1").await.unwrap().unwrap();
        assert_eq!(stored.status, RoundStatus::Round1);
    }

    #[tokio::test]
    async fn test_set_most_voted_link_keeps_first_value() {
        let store = MemoryStore::new();
        let round = Round {
            id: "r1".to_string(),
            title: "Test".to_string(),
            scoring_mode: ScoringMode::TwoPhase,
            link_mappings: Vec::new(),
            status: RoundStatus::Ended,
            most_voted_link: None,
            created_at: now(),
            ended_at: None,
        };
        RoundStore::create(&store, round).await.unwrap();

        assert_eq!(
            store.set_most_voted_link("r1", LinkId::B).await.unwrap(),
            LinkId::B
        );
        assert_eq!(
            store.set_most_voted_link("r1", LinkId::D).await.unwrap(),
            LinkId::B
        );
    }

    #[tokio::test]
    async fn test_vote_upsert_is_last_write_wins() {
        let store = MemoryStore::new();

        store
            .upsert("a@example.com", "r1", LinkId::A, now())
            .await
            .unwrap();
        store
            .upsert("a@example.com", "r1", LinkId::C, now())
            .await
            .unwrap();

        let votes = VoteStore::list_by_round(&store, "r1").await.unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].link_choice, LinkId::C);
    }

    #[tokio::test]
    async fn test_ledger_credits_each_round_once() {
        let store = MemoryStore::new();

        assert!(store
            .add_points_once("a@example.com", "r1", 130)
            .await
            .unwrap());
        assert!(!store
            .add_points_once("a@example.com", "r1", 130)
            .await
            .unwrap());
        assert!(store
            .add_points_once("a@example.com", "r2", 30)
            .await
            .unwrap());

        let points = UserLedger::get(&store, "a@example.com").await.unwrap();
        assert_eq!(points.points, 160);
    }

    #[tokio::test]
    async fn test_completed_guesses_keep_insertion_order() {
        let store = MemoryStore::new();

        for (user, round) in [("b@x.com", "r1"), ("a@x.com", "r1"), ("c@x.com", "r2")] {
            store
                .record_round_one_choice(user, round, Tool::Bolt, now())
                .await
                .unwrap();
            store
                .record_round_two_choice(user, round, LinkId::A, now())
                .await
                .unwrap();
        }

        let completed = store.list_completed().await.unwrap();
        let users: Vec<&str> = completed.iter().map(|g| g.user_email.as_str()).collect();
        assert_eq!(users, vec!["b@x.com", "a@x.com", "c@x.com"]);
    }
}
