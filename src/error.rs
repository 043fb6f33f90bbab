/// Result type for game operations
pub type GameResult<T> = Result<T, GameError>;

/// Errors a game operation can reject with. Every variant maps to a stable
/// machine-readable code so callers can tell retryable failures apart from
/// caller mistakes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("unauthorized")]
    Unauthorized,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("repository unavailable: {0}")]
    RepositoryUnavailable(String),
}

impl GameError {
    /// Stable code string used on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            GameError::NotFound(_) => "not_found",
            GameError::Unauthorized => "unauthorized",
            GameError::InvalidInput(_) => "invalid_input",
            GameError::PreconditionFailed(_) => "precondition_failed",
            GameError::Conflict(_) => "conflict",
            GameError::RepositoryUnavailable(_) => "repository_unavailable",
        }
    }

    /// Only transient store failures and lost compare-and-set races are safe
    /// to retry as-is; everything else needs a different request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GameError::Conflict(_) | GameError::RepositoryUnavailable(_)
        )
    }
}
