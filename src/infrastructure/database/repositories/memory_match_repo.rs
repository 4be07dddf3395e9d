use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::domain::repositories::{MatchRepository, RepositoryError, StateChange};
use crate::domain::value_objects::GameState;
use crate::infrastructure::database::repositories::ChangeFeed;

/// In-process implementation of MatchRepository.
///
/// Each match sits behind its own mutex; the outer map lock is only held to
/// find the slot, so unrelated matches never wait on each other.
#[derive(Default)]
pub struct InMemoryMatchRepository {
    matches: RwLock<HashMap<String, Arc<Mutex<GameState>>>>,
    feed: ChangeFeed,
}

impl InMemoryMatchRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, match_id: &str) -> Result<Arc<Mutex<GameState>>, RepositoryError> {
        let matches = self.matches.read().await;
        matches
            .get(match_id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("match {}", match_id)))
    }
}

#[async_trait]
impl MatchRepository for InMemoryMatchRepository {
    async fn create_match(&self, initial: &GameState) -> Result<String, RepositoryError> {
        let match_id = uuid::Uuid::new_v4().to_string();

        let mut matches = self.matches.write().await;
        matches.insert(match_id.clone(), Arc::new(Mutex::new(initial.clone())));

        tracing::debug!("Stored match {} at v{}", match_id, initial.version);
        Ok(match_id)
    }

    async fn read_state(&self, match_id: &str) -> Result<(GameState, u64), RepositoryError> {
        let slot = self.slot(match_id).await?;
        let state = slot.lock().await.clone();
        let version = state.version;
        Ok((state, version))
    }

    async fn write_state(
        &self,
        match_id: &str,
        expected_version: u64,
        state: &GameState,
    ) -> Result<u64, RepositoryError> {
        let slot = self.slot(match_id).await?;
        let mut current = slot.lock().await;

        if current.version != expected_version {
            return Err(RepositoryError::Conflict {
                expected: expected_version,
                actual: current.version,
            });
        }

        let mut committed = state.clone();
        committed.version = expected_version + 1;
        *current = committed.clone();
        let finished = committed.is_finished();

        // Published under the slot lock so subscribers see commit order
        self.feed
            .publish(StateChange {
                match_id: match_id.to_string(),
                version: committed.version,
                state: Arc::new(committed),
            })
            .await;
        if finished {
            self.feed.close(match_id).await;
        }

        Ok(expected_version + 1)
    }

    async fn subscribe(
        &self,
        match_id: &str,
    ) -> Result<async_broadcast::Receiver<StateChange>, RepositoryError> {
        let slot = self.slot(match_id).await?;
        let current = slot.lock().await;
        if current.is_finished() {
            return Ok(ChangeFeed::ended());
        }
        Ok(self.feed.subscribe(match_id).await)
    }

    async fn list_active(&self) -> Result<Vec<String>, RepositoryError> {
        let slots: Vec<(String, Arc<Mutex<GameState>>)> = {
            let matches = self.matches.read().await;
            matches.iter().map(|(id, slot)| (id.clone(), slot.clone())).collect()
        };

        let mut active = Vec::new();
        for (match_id, slot) in slots {
            if !slot.lock().await.is_finished() {
                active.push(match_id);
            }
        }
        Ok(active)
    }
}
