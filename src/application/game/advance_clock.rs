use std::sync::Arc;

use crate::application::game::{mutate_with_retry, Committed, MatchError};
use crate::domain::repositories::MatchRepository;
use crate::domain::services::{is_timer_current, tick};

/// Advance clock input
pub struct AdvanceClockInput {
    pub match_id: String,
    pub now: i64,
    /// Turn the caller's timer was scheduled for; a newer turn makes it a no-op
    pub expected_generation: Option<u64>,
}

/// Advance clock use case, run by timers when a deadline falls due
pub struct AdvanceClock<R: MatchRepository + ?Sized> {
    match_repo: Arc<R>,
}

impl<R: MatchRepository + ?Sized> AdvanceClock<R> {
    pub fn new(match_repo: Arc<R>) -> Self {
        Self { match_repo }
    }

    pub async fn execute(&self, input: AdvanceClockInput) -> Result<Committed, MatchError> {
        mutate_with_retry(self.match_repo.as_ref(), &input.match_id, |state| {
            if let Some(generation) = input.expected_generation {
                // The match deadline still applies to a stale turn timer
                let match_due = state.match_deadline.is_some_and(|d| input.now >= d);
                if !is_timer_current(state, generation) && !match_due {
                    tracing::debug!(
                        "Timer for turn {} is stale (now turn {})",
                        generation,
                        state.turn_generation
                    );
                    return Ok(None);
                }
            }

            let next = tick(state, input.now);
            Ok((next != *state).then_some(next))
        })
        .await
    }
}
