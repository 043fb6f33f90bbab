//! Storage seams the game engine depends on.
//!
//! Any store with per-document atomicity can implement these traits; the
//! shipped [`MemoryStore`] backs the binary and the tests. Write-once and
//! compare-and-set semantics live here so two racing requests are decided
//! by the store, not by engine-side locking.

mod memory;

use async_trait::async_trait;

pub use memory::MemoryStore;

use crate::error::GameResult;
use crate::types::*;

#[async_trait]
pub trait RoundStore: Send + Sync {
    async fn create(&self, round: Round) -> GameResult<Round>;

    async fn get(&self, round_id: &str) -> GameResult<Option<Round>>;

    /// Most recently created rounds first.
    async fn list_recent(&self, limit: usize) -> GameResult<Vec<Round>>;

    /// Compare-and-set the status. Fails with `Conflict` when the stored
    /// status no longer matches `expected`, so racing transitions lose
    /// instead of double-running side effects.
    async fn update_status(
        &self,
        round_id: &str,
        expected: RoundStatus,
        next: RoundStatus,
        ended_at: Option<String>,
    ) -> GameResult<Round>;

    /// Persist the tally result. Idempotent: if a most-voted link is already
    /// stored, it is returned unchanged and the new value is ignored.
    async fn set_most_voted_link(&self, round_id: &str, link: LinkId) -> GameResult<LinkId>;

    async fn delete(&self, round_id: &str) -> GameResult<()>;
}

#[async_trait]
pub trait GuessStore: Send + Sync {
    async fn find(&self, user_email: &str, round_id: &str) -> GameResult<Option<Guess>>;

    /// Insert-if-absent plus once-only field write. The second of two racing
    /// submissions observes `PreconditionFailed`, never a silent overwrite.
    async fn record_round_one_choice(
        &self,
        user_email: &str,
        round_id: &str,
        choice: Tool,
        at: String,
    ) -> GameResult<Guess>;

    /// Conditional field update: requires the round-1 choice to be present
    /// and the round-2 choice to be absent.
    async fn record_round_two_choice(
        &self,
        user_email: &str,
        round_id: &str,
        choice: LinkId,
        at: String,
    ) -> GameResult<Guess>;

    /// Replace (not increment) the points on a guess, so finalization can
    /// run any number of times.
    async fn set_points(
        &self,
        user_email: &str,
        round_id: &str,
        points: u32,
        breakdown: PointsBreakdown,
    ) -> GameResult<()>;

    async fn list_by_round(&self, round_id: &str) -> GameResult<Vec<Guess>>;

    /// Guesses with both choices present, across all rounds, in insertion
    /// order. The leaderboard's tie-break depends on this order being stable.
    async fn list_completed(&self) -> GameResult<Vec<Guess>>;

    async fn list_by_user(&self, user_email: &str) -> GameResult<Vec<Guess>>;
}

#[async_trait]
pub trait VoteStore: Send + Sync {
    /// Last write wins, unlike the guess's round-2 field.
    async fn upsert(
        &self,
        user_email: &str,
        round_id: &str,
        choice: LinkId,
        at: String,
    ) -> GameResult<Vote>;

    async fn list_by_round(&self, round_id: &str) -> GameResult<Vec<Vote>>;
}

#[async_trait]
pub trait UserLedger: Send + Sync {
    /// Atomically add `amount` to the user's running total, at most once per
    /// round. Returns `false` (and adds nothing) when the round was already
    /// credited for this user.
    async fn add_points_once(
        &self,
        user_email: &str,
        round_id: &str,
        amount: u32,
    ) -> GameResult<bool>;

    async fn get(&self, user_email: &str) -> GameResult<UserPoints>;
}
