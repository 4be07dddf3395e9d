use std::sync::Arc;

use crate::application::game::{mutate_with_retry, Committed, MatchError};
use crate::domain::repositories::MatchRepository;
use crate::domain::services::{apply_action, tick, Action};

/// Submit action input
pub struct SubmitActionInput {
    pub match_id: String,
    pub player_id: String,
    pub action: Action,
    /// Epoch milliseconds, used to re-arm the turn timer after the action
    pub now: i64,
}

/// Submit action use case
pub struct SubmitAction<R: MatchRepository + ?Sized> {
    match_repo: Arc<R>,
}

impl<R: MatchRepository + ?Sized> SubmitAction<R> {
    pub fn new(match_repo: Arc<R>) -> Self {
        Self { match_repo }
    }

    pub async fn execute(&self, input: SubmitActionInput) -> Result<Committed, MatchError> {
        let committed = mutate_with_retry(self.match_repo.as_ref(), &input.match_id, |state| {
            let next = apply_action(state, &input.player_id, &input.action)?;
            Ok(Some(tick(&next, input.now)))
        })
        .await;

        match &committed {
            Ok(c) => tracing::debug!(
                "Match {} v{}: {} by {}",
                input.match_id,
                c.version,
                input.action.as_str(),
                input.player_id
            ),
            Err(e) => tracing::debug!(
                "Match {}: {} by {} rejected: {}",
                input.match_id,
                input.action.as_str(),
                input.player_id,
                e
            ),
        }

        committed
    }
}
