use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::value_objects::GameState;

/// Error type for repository operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Version conflict: expected {expected}, found {actual}")]
    Conflict { expected: u64, actual: u64 },
    #[error("Database error: {0}")]
    Database(String),
}

/// A committed write, delivered to every subscriber of the match
#[derive(Debug, Clone)]
pub struct StateChange {
    pub match_id: String,
    pub version: u64,
    pub state: Arc<GameState>,
}

/// Shared storage for canonical match records.
///
/// Writes are conditional on the version the caller read; the store assigns
/// `expected_version + 1` to the committed state and publishes it to
/// subscribers in commit order.
#[async_trait]
pub trait MatchRepository: Send + Sync {
    /// Store a new match and return its id
    async fn create_match(&self, initial: &GameState) -> Result<String, RepositoryError>;

    /// Latest committed state and its version
    async fn read_state(&self, match_id: &str) -> Result<(GameState, u64), RepositoryError>;

    /// Compare-and-swap write; returns the committed version
    async fn write_state(
        &self,
        match_id: &str,
        expected_version: u64,
        state: &GameState,
    ) -> Result<u64, RepositoryError>;

    /// Receive every change committed after this call. The stream ends once
    /// the match finishes; a finished match yields an already-ended stream.
    async fn subscribe(
        &self,
        match_id: &str,
    ) -> Result<async_broadcast::Receiver<StateChange>, RepositoryError>;

    /// Ids of every match that has not finished
    async fn list_active(&self) -> Result<Vec<String>, RepositoryError>;
}
