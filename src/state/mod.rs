mod guess;
mod leaderboard;
mod round;
mod score;
mod tally;

use std::sync::Arc;

pub use leaderboard::{GameHistoryEntry, LeaderboardEntry};
pub use score::{score_guess, MOST_VOTED_BONUS_POINTS, TOOL_MATCH_POINTS, WINNER_TOOL_POINTS};
pub use tally::{count_votes, most_voted_link};

use crate::auth::{AuthConfig, SessionStore};
use crate::store::{GuessStore, MemoryStore, RoundStore, UserLedger, VoteStore};

/// Shared application state: the storage seams plus auth/session glue.
#[derive(Clone)]
pub struct AppState {
    pub rounds: Arc<dyn RoundStore>,
    pub guesses: Arc<dyn GuessStore>,
    pub votes: Arc<dyn VoteStore>,
    pub ledger: Arc<dyn UserLedger>,
    pub sessions: SessionStore,
    pub auth: Arc<AuthConfig>,
}

impl AppState {
    /// State backed by the in-memory store.
    pub fn new(auth: AuthConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::with_stores(
            store.clone(),
            store.clone(),
            store.clone(),
            store,
            auth,
        )
    }

    /// Inject specific store implementations (tests, alternative backends).
    pub fn with_stores(
        rounds: Arc<dyn RoundStore>,
        guesses: Arc<dyn GuessStore>,
        votes: Arc<dyn VoteStore>,
        ledger: Arc<dyn UserLedger>,
        auth: AuthConfig,
    ) -> Self {
        Self {
            rounds,
            guesses,
            votes,
            ledger,
            sessions: SessionStore::new(),
            auth: Arc::new(auth),
        }
    }
}
