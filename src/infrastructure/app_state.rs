use std::sync::Arc;

use crate::domain::repositories::MatchRepository;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::database::repositories::{InMemoryMatchRepository, SqliteMatchRepository};
use crate::infrastructure::services::MatchRuntime;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,

    /// Canonical match records
    pub match_repo: Arc<dyn MatchRepository>,

    /// Bot and timer scheduler
    pub runtime: MatchRuntime,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        Self::from_config(AppConfig::from_env()).await
    }

    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let match_repo: Arc<dyn MatchRepository> = match &config.database_url {
            Some(url) => {
                tracing::info!("Connecting to database: {}", url);
                Arc::new(SqliteMatchRepository::connect(url).await?)
            }
            None => {
                tracing::info!("DATABASE_URL not set, keeping matches in memory");
                Arc::new(InMemoryMatchRepository::new())
            }
        };

        let runtime = MatchRuntime::new(match_repo.clone());
        runtime.resume_active().await?;

        Ok(Self {
            config,
            match_repo,
            runtime,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::game::{now_millis, CreateMatch, CreateMatchInput};
    use crate::domain::services::SeatConfig;
    use std::time::Duration;

    #[tokio::test]
    async fn test_restart_resumes_stored_matches() {
        let path = std::env::temp_dir().join(format!("uno-{}.db", uuid::Uuid::new_v4()));
        let config = AppConfig {
            database_url: Some(format!("sqlite:{}", path.display())),
            bot_think_ms: 0,
            ..AppConfig::default()
        };

        // A bot match left behind by a previous process
        let (match_id, created) = {
            let url = config.database_url.clone().unwrap();
            let repo = Arc::new(SqliteMatchRepository::connect(&url).await.unwrap());
            let output = CreateMatch::new(repo)
                .execute(CreateMatchInput {
                    seats: vec![SeatConfig::bot("b1"), SeatConfig::bot("b2")],
                    settings: config.match_settings(None),
                    seed: Some(4),
                    now: now_millis(),
                })
                .await
                .unwrap();
            (output.match_id, output.state.version)
        };

        let state = AppState::from_config(config).await.unwrap();

        let mut progressed = false;
        for _ in 0..500 {
            let (_, version) = state.match_repo.read_state(&match_id).await.unwrap();
            if version > created {
                progressed = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(progressed, "stored match was not resumed");

        let _ = std::fs::remove_file(&path);
    }
}
