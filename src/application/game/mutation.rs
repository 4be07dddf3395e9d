use crate::domain::errors::EngineError;
use crate::domain::repositories::{MatchRepository, RepositoryError};
use crate::domain::value_objects::GameState;

/// Conditional writes attempted before a mutation gives up with `StaleState`
pub const MAX_WRITE_ATTEMPTS: usize = 5;

/// Error type shared by the match use cases
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl MatchError {
    pub fn code(&self) -> &'static str {
        match self {
            MatchError::Engine(e) => match e {
                EngineError::IllegalCard(_) => "ILLEGAL_CARD",
                EngineError::CardNotInHand(_) => "CARD_NOT_IN_HAND",
                EngineError::NotYourTurn => "NOT_YOUR_TURN",
                EngineError::GameAlreadyFinished => "GAME_ALREADY_FINISHED",
                EngineError::DeckExhausted => "DECK_EXHAUSTED",
                EngineError::StaleState => "STALE_STATE",
                EngineError::InvalidColorChoice => "INVALID_COLOR_CHOICE",
                EngineError::ColorChoicePending => "COLOR_CHOICE_PENDING",
                EngineError::UnoNotAllowed => "UNO_NOT_ALLOWED",
                EngineError::UnknownPlayer(_) => "UNKNOWN_PLAYER",
                EngineError::InvalidSetup(_) => "INVALID_SETUP",
            },
            MatchError::Repository(e) => match e {
                RepositoryError::NotFound(_) => "NOT_FOUND",
                RepositoryError::Conflict { .. } => "STALE_STATE",
                RepositoryError::Database(_) => "DATABASE_ERROR",
            },
        }
    }
}

/// Result of a committed mutation
#[derive(Debug, Clone)]
pub struct Committed {
    pub state: GameState,
    pub version: u64,
}

/// Read-latest, compute, conditional-write; retried on version conflicts.
///
/// `mutate` sees the latest committed state and returns the next state, or
/// `None` when there is nothing to write. Engine rejections are returned
/// immediately without retrying.
pub async fn mutate_with_retry<R, F>(
    repo: &R,
    match_id: &str,
    mut mutate: F,
) -> Result<Committed, MatchError>
where
    R: MatchRepository + ?Sized,
    F: FnMut(&GameState) -> Result<Option<GameState>, EngineError>,
{
    for attempt in 1..=MAX_WRITE_ATTEMPTS {
        let (state, version) = repo.read_state(match_id).await?;

        let Some(next) = mutate(&state)? else {
            return Ok(Committed { state, version });
        };

        match repo.write_state(match_id, version, &next).await {
            Ok(committed) => {
                let mut state = next;
                state.version = committed;
                return Ok(Committed {
                    state,
                    version: committed,
                });
            }
            Err(RepositoryError::Conflict { expected, actual }) => {
                tracing::debug!(
                    "Match {} write conflict (expected v{}, found v{}), attempt {}/{}",
                    match_id,
                    expected,
                    actual,
                    attempt,
                    MAX_WRITE_ATTEMPTS
                );
            }
            Err(e) => return Err(e.into()),
        }
    }

    tracing::warn!(
        "Match {} still conflicting after {} attempts",
        match_id,
        MAX_WRITE_ATTEMPTS
    );
    Err(EngineError::StaleState.into())
}

/// Current time in epoch milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
