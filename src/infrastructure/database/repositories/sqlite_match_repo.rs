use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tokio::sync::{Mutex, RwLock};

use crate::domain::repositories::{MatchRepository, RepositoryError, StateChange};
use crate::domain::value_objects::{GameState, Phase};
use crate::infrastructure::database::repositories::ChangeFeed;

/// SQLite implementation of MatchRepository
pub struct SqliteMatchRepository {
    pool: SqlitePool,
    feed: ChangeFeed,
    // Serializes commit + publish per match so subscribers see commit order
    write_gates: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl SqliteMatchRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            feed: ChangeFeed::new(),
            write_gates: RwLock::new(HashMap::new()),
        }
    }

    /// Connect to `database_url` and make sure the schema exists
    pub async fn connect(database_url: &str) -> Result<Self, RepositoryError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| RepositoryError::Database(e.to_string()))?
            .create_if_missing(true);

        // An in-memory database lives and dies with its single connection
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let repo = Self::new(pool);
        repo.ensure_schema().await?;
        Ok(repo)
    }

    async fn ensure_schema(&self) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS matches (
                id TEXT PRIMARY KEY,
                version INTEGER NOT NULL,
                state_json TEXT NOT NULL,
                phase TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(())
    }

    async fn gate(&self, match_id: &str) -> Arc<Mutex<()>> {
        {
            let gates = self.write_gates.read().await;
            if let Some(gate) = gates.get(match_id) {
                return gate.clone();
            }
        }

        let mut gates = self.write_gates.write().await;
        gates.entry(match_id.to_string()).or_default().clone()
    }

    async fn release_gate(&self, match_id: &str) {
        self.write_gates.write().await.remove(match_id);
    }

    async fn stored_phase(&self, match_id: &str) -> Result<Option<String>, RepositoryError> {
        sqlx::query_scalar("SELECT phase FROM matches WHERE id = ?")
            .bind(match_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))
    }

    async fn stored_version(&self, match_id: &str) -> Result<Option<u64>, RepositoryError> {
        let version: Option<i64> = sqlx::query_scalar("SELECT version FROM matches WHERE id = ?")
            .bind(match_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(version.map(|v| v as u64))
    }

    fn encode(state: &GameState) -> Result<String, RepositoryError> {
        serde_json::to_string(state)
            .map_err(|e| RepositoryError::Database(format!("Failed to encode game state: {}", e)))
    }
}

#[async_trait]
impl MatchRepository for SqliteMatchRepository {
    async fn create_match(&self, initial: &GameState) -> Result<String, RepositoryError> {
        let match_id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO matches (id, version, state_json, phase, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&match_id)
        .bind(initial.version as i64)
        .bind(Self::encode(initial)?)
        .bind(initial.phase.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        tracing::debug!("Stored match {} at v{}", match_id, initial.version);
        Ok(match_id)
    }

    async fn read_state(&self, match_id: &str) -> Result<(GameState, u64), RepositoryError> {
        let row: Option<(String, i64)> =
            sqlx::query_as("SELECT state_json, version FROM matches WHERE id = ?")
                .bind(match_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let Some((json, version)) = row else {
            return Err(RepositoryError::NotFound(format!("match {}", match_id)));
        };

        let mut state: GameState = serde_json::from_str(&json).map_err(|e| {
            tracing::error!("Failed to parse game state JSON: {}", e);
            RepositoryError::Database(format!("Invalid game state JSON: {}", e))
        })?;
        state.version = version as u64;

        Ok((state, version as u64))
    }

    async fn write_state(
        &self,
        match_id: &str,
        expected_version: u64,
        state: &GameState,
    ) -> Result<u64, RepositoryError> {
        let gate = self.gate(match_id).await;
        let _guard = gate.lock().await;

        let mut committed = state.clone();
        committed.version = expected_version + 1;
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            UPDATE matches
            SET version = ?, state_json = ?, phase = ?, updated_at = ?
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(committed.version as i64)
        .bind(Self::encode(&committed)?)
        .bind(committed.phase.as_str())
        .bind(now)
        .bind(match_id)
        .bind(expected_version as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return match self.stored_version(match_id).await? {
                Some(actual) => Err(RepositoryError::Conflict {
                    expected: expected_version,
                    actual,
                }),
                None => Err(RepositoryError::NotFound(format!("match {}", match_id))),
            };
        }

        let version = committed.version;
        let finished = committed.is_finished();
        self.feed
            .publish(StateChange {
                match_id: match_id.to_string(),
                version,
                state: Arc::new(committed),
            })
            .await;
        if finished {
            self.feed.close(match_id).await;
            self.release_gate(match_id).await;
        }

        Ok(version)
    }

    async fn subscribe(
        &self,
        match_id: &str,
    ) -> Result<async_broadcast::Receiver<StateChange>, RepositoryError> {
        // Under the write gate so a finishing write cannot slip in between
        let gate = self.gate(match_id).await;
        let _guard = gate.lock().await;

        match self.stored_phase(match_id).await? {
            None => {
                self.release_gate(match_id).await;
                Err(RepositoryError::NotFound(format!("match {}", match_id)))
            }
            Some(phase) if phase == Phase::Finished.as_str() => {
                self.release_gate(match_id).await;
                Ok(ChangeFeed::ended())
            }
            Some(_) => Ok(self.feed.subscribe(match_id).await),
        }
    }

    async fn list_active(&self) -> Result<Vec<String>, RepositoryError> {
        sqlx::query_scalar("SELECT id FROM matches WHERE phase != ? ORDER BY created_at")
            .bind(Phase::Finished.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))
    }
}
