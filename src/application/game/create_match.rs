use std::sync::Arc;

use crate::application::game::MatchError;
use crate::domain::repositories::MatchRepository;
use crate::domain::services::{create_game, tick, SeatConfig};
use crate::domain::value_objects::{GameState, MatchSettings};

/// Create match input
pub struct CreateMatchInput {
    pub seats: Vec<SeatConfig>,
    pub settings: MatchSettings,
    pub seed: Option<u64>,
    /// Epoch milliseconds used to arm the timers
    pub now: i64,
}

/// Create match output
pub struct CreateMatchOutput {
    pub match_id: String,
    pub state: GameState,
}

/// Create match use case
pub struct CreateMatch<R: MatchRepository + ?Sized> {
    match_repo: Arc<R>,
}

impl<R: MatchRepository + ?Sized> CreateMatch<R> {
    pub fn new(match_repo: Arc<R>) -> Self {
        Self { match_repo }
    }

    pub async fn execute(&self, input: CreateMatchInput) -> Result<CreateMatchOutput, MatchError> {
        let state = create_game(&input.seats, input.settings, input.seed)?;
        let state = tick(&state, input.now);

        let match_id = self.match_repo.create_match(&state).await?;

        tracing::info!(
            "Match {} created with {} players ({} bots)",
            match_id,
            state.player_count(),
            state.players.iter().filter(|p| p.is_bot).count()
        );

        Ok(CreateMatchOutput { match_id, state })
    }
}
